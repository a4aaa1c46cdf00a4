//! compression/encode.rs
//! Write-path decoration: a buffered raw stream in, a compressing `Write` out.

use std::io::{self, Write};

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use snap::write::FrameEncoder;

use crate::compression::parallel::ParallelGzEncoder;
use crate::compression::types::{CodecError, CompressionKind, GzipConcurrency};

/// A writer decorated with the requested compressor.
///
/// `finish` writes codec trailers into the next layer without flushing or
/// closing it; the owner then flushes and closes the lower layers itself.
pub enum EncodeStream<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
    ParallelGzip(ParallelGzEncoder<W>),
    Zlib(ZlibEncoder<W>),
    Snappy(FrameEncoder<W>),
}

impl<W: Write> EncodeStream<W> {
    pub fn kind(&self) -> CompressionKind {
        match self {
            EncodeStream::Plain(_) => CompressionKind::None,
            EncodeStream::Gzip(_) | EncodeStream::ParallelGzip(_) => CompressionKind::Gzip,
            EncodeStream::Zlib(_) => CompressionKind::Zlib,
            EncodeStream::Snappy(_) => CompressionKind::Snappy,
        }
    }

    pub fn get_mut(&mut self) -> &mut W {
        match self {
            EncodeStream::Plain(w) => w,
            EncodeStream::Gzip(e) => e.get_mut(),
            EncodeStream::ParallelGzip(e) => e.get_mut(),
            EncodeStream::Zlib(e) => e.get_mut(),
            EncodeStream::Snappy(e) => e.get_mut(),
        }
    }

    /// Pushes every pending compressed byte and trailer into the next layer.
    /// Idempotent; a no-op for `Plain`.
    pub fn finish(&mut self) -> io::Result<()> {
        match self {
            EncodeStream::Plain(_) => Ok(()),
            EncodeStream::Gzip(e) => e.try_finish(),
            EncodeStream::ParallelGzip(e) => e.try_finish(),
            EncodeStream::Zlib(e) => e.try_finish(),
            // Framing format has no trailer: emitting the buffered chunk is enough.
            EncodeStream::Snappy(e) => e.flush(),
        }
    }
}

impl<W: Write> Write for EncodeStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            EncodeStream::Plain(w) => w.write(buf),
            EncodeStream::Gzip(e) => e.write(buf),
            EncodeStream::ParallelGzip(e) => e.write(buf),
            EncodeStream::Zlib(e) => e.write(buf),
            EncodeStream::Snappy(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            EncodeStream::Plain(w) => w.flush(),
            EncodeStream::Gzip(e) => e.flush(),
            EncodeStream::ParallelGzip(e) => e.flush(),
            EncodeStream::Zlib(e) => e.flush(),
            EncodeStream::Snappy(e) => e.flush(),
        }
    }
}

/// Layers a compressor of `kind` over `w`.
///
/// `concurrency` only affects gzip; `None` selects the serial encoder whose
/// output is byte-for-byte reproducible.
pub fn encoder<W: Write>(
    w: W,
    kind: CompressionKind,
    concurrency: Option<GzipConcurrency>,
) -> Result<EncodeStream<W>, CodecError> {
    encoder_for(w, kind, concurrency).map_err(|(e, _)| e)
}

/// Same as [`encoder`] but returns `w` alongside the error so the caller can
/// release it.
pub fn encoder_for<W: Write>(
    w: W,
    kind: CompressionKind,
    concurrency: Option<GzipConcurrency>,
) -> Result<EncodeStream<W>, (CodecError, W)> {
    let level = Compression::default();
    Ok(match kind {
        CompressionKind::None => EncodeStream::Plain(w),
        CompressionKind::Gzip => match concurrency {
            Some(cfg) => EncodeStream::ParallelGzip(ParallelGzEncoder::try_new(w, cfg)?),
            None => EncodeStream::Gzip(GzEncoder::new(w, level)),
        },
        CompressionKind::Zlib => EncodeStream::Zlib(ZlibEncoder::new(w, level)),
        CompressionKind::Snappy => EncodeStream::Snappy(FrameEncoder::new(w)),
    })
}

/// Compresses a whole buffer in memory.
pub fn compress_bytes(
    data: &[u8],
    kind: CompressionKind,
    concurrency: Option<GzipConcurrency>,
) -> Result<Vec<u8>, CodecError> {
    let io_err = |e| CodecError::Io { kind, source: e };
    let mut enc = encoder(Vec::new(), kind, concurrency)?;
    enc.write_all(data).map_err(io_err)?;
    enc.finish().map_err(io_err)?;
    Ok(std::mem::take(enc.get_mut()))
}

/// Decompresses a whole buffer in memory.
pub fn decompress_bytes(data: &[u8], kind: CompressionKind) -> Result<Vec<u8>, CodecError> {
    use std::io::Read;

    let mut dec = crate::compression::decode::decoder(data, kind)?;
    let mut out = Vec::new();
    dec.read_to_end(&mut out).map_err(|e| CodecError::Io { kind, source: e })?;
    Ok(out)
}
