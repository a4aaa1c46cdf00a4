//! compression/decode.rs
//! Read-path decoration: a raw stream in, a decompressing `Read` out.
//!
//! Headers are validated eagerly so that `FileReader::open` can tell a
//! corrupt or empty object apart from a transient I/O failure instead of
//! discovering it on the first `read`.

use std::io::{self, Read};

use flate2::read::{MultiGzDecoder, ZlibDecoder};
use snap::read::FrameDecoder;

use crate::compression::types::{CodecError, CompressionKind};
use crate::constants::{GZIP_MAGIC, ZLIB_CM_DEFLATE};

/// Stream identifier chunk every snappy framed stream starts with.
const SNAPPY_STREAM_IDENT: [u8; 10] = [0xff, 0x06, 0x00, 0x00, b's', b'N', b'a', b'P', b'p', b'Y'];

/// Bytes consumed while validating the header, replayed before the rest of
/// the inner stream.
#[derive(Debug)]
pub struct Peeked<R> {
    head: Vec<u8>,
    pos: usize,
    inner: R,
}

impl<R: Read> Peeked<R> {
    fn new(mut inner: R, want: usize) -> Result<Self, (io::Error, R)> {
        let mut head = vec![0u8; want];
        let mut filled = 0;
        while filled < want {
            match inner.read(&mut head[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err((e, inner)),
            }
        }
        head.truncate(filled);
        Ok(Self { head, pos: 0, inner })
    }

    fn head(&self) -> &[u8] {
        &self.head
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Peeked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.head.len() {
            let n = (self.head.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.head[self.pos..self.pos + n]);
            self.pos += n;
            return Ok(n);
        }
        self.inner.read(buf)
    }
}

/// A raw stream decorated with the requested decompressor.
pub enum DecodeStream<R: Read> {
    Plain(R),
    Gzip(MultiGzDecoder<Peeked<R>>),
    Zlib(ZlibDecoder<Peeked<R>>),
    Snappy(FrameDecoder<Peeked<R>>),
}

impl<R: Read> DecodeStream<R> {
    pub fn kind(&self) -> CompressionKind {
        match self {
            DecodeStream::Plain(_) => CompressionKind::None,
            DecodeStream::Gzip(_) => CompressionKind::Gzip,
            DecodeStream::Zlib(_) => CompressionKind::Zlib,
            DecodeStream::Snappy(_) => CompressionKind::Snappy,
        }
    }

    /// The raw stream below the codec.
    pub fn get_mut(&mut self) -> &mut R {
        match self {
            DecodeStream::Plain(r) => r,
            DecodeStream::Gzip(d) => d.get_mut().get_mut(),
            DecodeStream::Zlib(d) => d.get_mut().get_mut(),
            DecodeStream::Snappy(d) => d.get_mut().get_mut(),
        }
    }
}

impl<R: Read> Read for DecodeStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            DecodeStream::Plain(r) => r.read(buf),
            DecodeStream::Gzip(d) => d.read(buf),
            DecodeStream::Zlib(d) => d.read(buf),
            DecodeStream::Snappy(d) => d.read(buf),
        }
    }
}

/// Layers a decompressor of `kind` over `raw`.
///
/// On error `raw` is dropped; callers that must close it explicitly use
/// [`decoder_for`] instead.
pub fn decoder<R: Read>(raw: R, kind: CompressionKind) -> Result<DecodeStream<R>, CodecError> {
    decoder_for(raw, kind).map_err(|(e, _)| e)
}

/// Like [`decoder`] but hands `raw` back on failure so it can be released.
pub fn decoder_for<R: Read>(raw: R, kind: CompressionKind) -> Result<DecodeStream<R>, (CodecError, Option<R>)> {
    let want = match kind {
        CompressionKind::None => return Ok(DecodeStream::Plain(raw)),
        CompressionKind::Gzip => GZIP_MAGIC.len(),
        CompressionKind::Zlib => 2,
        CompressionKind::Snappy => SNAPPY_STREAM_IDENT.len(),
    };

    let peeked = Peeked::new(raw, want).map_err(|(e, r)| (CodecError::Io { kind, source: e }, Some(r)))?;
    if let Err(e) = check_header(kind, peeked.head()) {
        return Err((e, Some(peeked.into_inner())));
    }

    Ok(match kind {
        CompressionKind::Gzip => DecodeStream::Gzip(MultiGzDecoder::new(peeked)),
        CompressionKind::Zlib => DecodeStream::Zlib(ZlibDecoder::new(peeked)),
        CompressionKind::Snappy => DecodeStream::Snappy(FrameDecoder::new(peeked)),
        CompressionKind::None => DecodeStream::Plain(peeked.into_inner()),
    })
}

fn check_header(kind: CompressionKind, head: &[u8]) -> Result<(), CodecError> {
    match (kind, head) {
        (CompressionKind::None, _) => Ok(()),
        // An encoder that saw no input emits nothing at all, so empty is valid here.
        (CompressionKind::Snappy, []) => Ok(()),
        (CompressionKind::Snappy, h) if h == SNAPPY_STREAM_IDENT => Ok(()),
        (_, []) => Err(CodecError::EmptyStream { kind }),
        (CompressionKind::Gzip, h) if h == GZIP_MAGIC => Ok(()),
        (CompressionKind::Zlib, &[cmf, flg]) if valid_zlib_header(cmf, flg) => Ok(()),
        _ => Err(CodecError::MalformedHeader { kind }),
    }
}

/// RFC 1950: deflate method, window <= 32K, FCHECK makes CMF*256+FLG a multiple of 31.
fn valid_zlib_header(cmf: u8, flg: u8) -> bool {
    cmf & 0x0f == ZLIB_CM_DEFLATE && (cmf >> 4) <= 7 && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0
}
