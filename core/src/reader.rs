//! reader.rs
//! Pooled file reader: backend read handle + decompressing stream.
//!
//! Layering (top to bottom):
//!
//! ```text
//!   FileReader ── Read / read_line
//!     └─ BufReader        (only once read_line was called)
//!         └─ DecodeStream (gzip | zlib | snappy | plain)
//!             └─ Box<dyn ReadStream> from FsOpen::open
//! ```
//!
//! Teardown releases the scanner and codec layers, then closes the raw
//! handle. The reusable part of the reader (path,
//! line buffer, flags) goes back to its pool afterwards.

use std::io::{self, BufRead, BufReader, Read};
use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use crate::compression::{decoder_for, CompressionKind, DecodeStream};
use crate::fs::{FsOpen, ReadStream};
use crate::pool::{Pool, Reset};
use crate::types::{FileOpError, Layer};

pub type ReaderPool = Pool<Box<ReaderState>>;

/// Process-wide reader pool used by [`FileReader::open`].
pub fn default_reader_pool() -> &'static Arc<ReaderPool> {
    static POOL: OnceLock<Arc<ReaderPool>> = OnceLock::new();
    POOL.get_or_init(|| Arc::new(Pool::with_config(&Default::default())))
}

/// Reusable part of a reader.
#[derive(Debug, Default)]
pub struct ReaderState {
    path: String,
    line: Vec<u8>,
    eof: bool,
}

impl Reset for ReaderState {
    fn reset(&mut self) {
        self.path.clear();
        self.line.clear();
        self.eof = false;
    }
}

type RawDecoder = DecodeStream<Box<dyn ReadStream>>;

enum Source {
    Direct(RawDecoder),
    Scanning(BufReader<RawDecoder>),
}

impl Source {
    fn into_decoder(self) -> RawDecoder {
        match self {
            Source::Direct(d) => d,
            Source::Scanning(b) => b.into_inner(),
        }
    }
}

pub struct FileReader {
    state: Option<Box<ReaderState>>,
    source: Option<Source>,
    kind: CompressionKind,
    pool: Arc<ReaderPool>,
}

impl FileReader {
    /// Opens `path` on `backend` and layers the `kind` decompressor on it.
    ///
    /// Use [`crate::is_unhandled_error`] to tell errors a retry cannot fix
    /// (missing path, empty or corrupt compressed header) from transient ones.
    pub fn open<B>(backend: &B, path: &str, kind: CompressionKind) -> Result<Self, FileOpError>
    where
        B: FsOpen + ?Sized,
    {
        Self::open_with(default_reader_pool(), backend, path, kind)
    }

    /// Same as [`FileReader::open`] with an explicit pool.
    pub fn open_with<B>(
        pool: &Arc<ReaderPool>,
        backend: &B,
        path: &str,
        kind: CompressionKind,
    ) -> Result<Self, FileOpError>
    where
        B: FsOpen + ?Sized,
    {
        let raw = backend
            .open(path)
            .map_err(|source| FileOpError::Open { path: path.to_string(), source })?;

        let stream = match decoder_for(raw, kind) {
            Ok(stream) => stream,
            Err((source, raw)) => {
                let cleanup = raw.and_then(|mut raw| raw.close().err());
                if let Some(e) = &cleanup {
                    warn!("close raw handle of {path} after codec failure: {e}");
                }
                return Err(FileOpError::Codec { path: path.to_string(), source, cleanup });
            }
        };

        let mut state = pool.acquire();
        state.path.push_str(path);
        debug!("reader open {path} ({kind})");

        Ok(Self {
            state: Some(state),
            source: Some(Source::Direct(stream)),
            kind,
            pool: Arc::clone(pool),
        })
    }

    pub fn path(&self) -> &str {
        self.state.as_ref().map_or("", |s| s.path.as_str())
    }

    pub fn kind(&self) -> CompressionKind {
        self.kind
    }

    /// True once `read_line` has observed end-of-stream.
    pub fn is_eof(&self) -> bool {
        self.state.as_ref().map_or(true, |s| s.eof)
    }

    /// Next line without its `\n` (and a `\r` before it), `None` at
    /// end-of-stream. Once `None` has been returned every later call returns
    /// `None` again without touching the stream.
    ///
    /// The line scanner is built on first use; mixing `read` and `read_line`
    /// is fine, both go through it afterwards.
    pub fn read_line(&mut self) -> Result<Option<&[u8]>, FileOpError> {
        let Some(state) = self.state.as_mut() else {
            return Ok(None);
        };
        if state.eof {
            return Ok(None);
        }

        if let Some(Source::Direct(_)) = self.source {
            if let Some(source) = self.source.take() {
                self.source = Some(Source::Scanning(BufReader::new(source.into_decoder())));
            }
        }
        let Some(Source::Scanning(scanner)) = self.source.as_mut() else {
            state.eof = true;
            return Ok(None);
        };

        state.line.clear();
        let n = scanner
            .read_until(b'\n', &mut state.line)
            .map_err(|source| FileOpError::Scan { path: state.path.clone(), source })?;
        if n == 0 {
            state.eof = true;
            return Ok(None);
        }

        if state.line.last() == Some(&b'\n') {
            state.line.pop();
            if state.line.last() == Some(&b'\r') {
                state.line.pop();
            }
        }
        Ok(Some(&state.line))
    }

    /// Closes the codec layer, then the raw handle, and recycles the reader.
    pub fn close(mut self) -> Result<(), FileOpError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), FileOpError> {
        let Some(state) = self.state.take() else {
            return Ok(());
        };

        let mut first_err = None;
        if let Some(source) = self.source.take() {
            // Dropping the line scanner releases the buffered look-ahead first.
            // Decoders own nothing but buffers, so the raw close is the only
            // fallible step.
            let mut stream = source.into_decoder();
            if let Err(source) = stream.get_mut().close() {
                first_err = Some(FileOpError::Close { path: state.path.clone(), layer: Layer::Raw, source });
            }
        }

        debug!("reader close {}", state.path);
        self.pool.release(state);
        first_err.map_or(Ok(()), Err)
    }
}

impl Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.source.as_mut() {
            Some(Source::Direct(s)) => s.read(buf),
            Some(Source::Scanning(s)) => s.read(buf),
            None => Err(io::Error::new(io::ErrorKind::Other, "read on closed reader")),
        }
    }
}

impl ReadStream for FileReader {
    fn close(&mut self) -> io::Result<()> {
        self.teardown().map_err(io::Error::from)
    }
}

impl Drop for FileReader {
    fn drop(&mut self) {
        if self.state.is_some() {
            let path = self.path().to_string();
            if let Err(e) = self.teardown() {
                warn!("reader {path} dropped without close: {e}");
            }
        }
    }
}

impl std::fmt::Debug for FileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileReader")
            .field("path", &self.path())
            .field("kind", &self.kind)
            .field("eof", &self.is_eof())
            .finish()
    }
}
