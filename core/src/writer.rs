//! writer.rs
//! Pooled file writer: backend write handle + buffer + compressing stream.
//!
//! ```text
//!   FileWriter ── Write / write_line
//!     └─ EncodeStream (gzip | parallel gzip | zlib | snappy | plain)
//!         └─ BufWriter (buffer_size, DEFAULT_BUFFER_SIZE when 0)
//!             └─ Box<dyn WriteStream> from FsCreate::create
//! ```
//!
//! Close order is codec finish, buffer flush, raw close. Each step runs even
//! when an earlier one failed; the first failure is reported.

use std::io::{self, BufWriter, Write};
use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use crate::compression::{encoder_for, CompressionKind, EncodeStream};
use crate::config::WriterOptions;
use crate::constants::DEFAULT_DIR_PERM;
use crate::fs::{parent_dir, WriteStream, WriterBackend};
use crate::pool::{Pool, Reset};
use crate::types::{FileOpError, Layer};

pub type WriterPool = Pool<Box<WriterState>>;

/// Process-wide writer pool used by [`FileWriter::open`] and
/// [`FileWriter::open_with_options`].
pub fn default_writer_pool() -> &'static Arc<WriterPool> {
    static POOL: OnceLock<Arc<WriterPool>> = OnceLock::new();
    POOL.get_or_init(|| Arc::new(Pool::with_config(&Default::default())))
}

/// Reusable part of a writer: the path and the `write_line` scratch buffer.
#[derive(Debug, Default)]
pub struct WriterState {
    path: String,
    scratch: Vec<u8>,
}

impl Reset for WriterState {
    fn reset(&mut self) {
        self.path.clear();
        self.scratch.clear();
    }
}

type Stack = EncodeStream<BufWriter<Box<dyn WriteStream>>>;

pub struct FileWriter {
    state: Option<Box<WriterState>>,
    stream: Option<Stack>,
    kind: CompressionKind,
    pool: Arc<WriterPool>,
}

impl FileWriter {
    /// Creates `path` (and its missing parents) on `backend` and layers a
    /// `buffer_size` buffer plus the `kind` compressor on the new handle.
    pub fn open<B>(
        backend: &B,
        path: &str,
        buffer_size: usize,
        kind: CompressionKind,
    ) -> Result<Self, FileOpError>
    where
        B: WriterBackend + ?Sized,
    {
        Self::open_in(default_writer_pool(), backend, path, &WriterOptions::new(buffer_size, kind))
    }

    pub fn open_with_options<B>(backend: &B, path: &str, opts: &WriterOptions) -> Result<Self, FileOpError>
    where
        B: WriterBackend + ?Sized,
    {
        Self::open_in(default_writer_pool(), backend, path, opts)
    }

    /// Same as [`FileWriter::open_with_options`] with an explicit pool.
    pub fn open_in<B>(
        pool: &Arc<WriterPool>,
        backend: &B,
        path: &str,
        opts: &WriterOptions,
    ) -> Result<Self, FileOpError>
    where
        B: WriterBackend + ?Sized,
    {
        let dir = parent_dir(path);
        backend.mkdir_all(dir, DEFAULT_DIR_PERM).map_err(|source| FileOpError::Mkdir {
            path: path.to_string(),
            dir: dir.to_string(),
            source,
        })?;

        let raw = backend
            .create(path)
            .map_err(|source| FileOpError::Create { path: path.to_string(), source })?;

        let kind = opts.compression;
        let buffered = BufWriter::with_capacity(opts.effective_buffer_size(), raw);
        let stream = match encoder_for(buffered, kind, opts.codec_concurrency()) {
            Ok(stream) => stream,
            Err((source, buffered)) => {
                // Nothing went through the buffer yet; only the raw handle
                // needs releasing.
                let (mut raw, _) = buffered.into_parts();
                let cleanup = raw.close().err();
                if let Some(e) = &cleanup {
                    warn!("close raw handle of {path} after codec failure: {e}");
                }
                return Err(FileOpError::Codec { path: path.to_string(), source, cleanup });
            }
        };

        let mut state = pool.acquire();
        state.path.push_str(path);
        debug!("writer open {path} ({kind}, buffer {})", opts.effective_buffer_size());

        Ok(Self {
            state: Some(state),
            stream: Some(stream),
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

    /// Writes `bytes` followed by `\n` as a single write. Empty input writes
    /// nothing and returns `Ok(0)`.
    pub fn write_line(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }
        let (Some(state), Some(stream)) = (self.state.as_mut(), self.stream.as_mut()) else {
            return Err(closed_error());
        };
        state.scratch.clear();
        state.scratch.reserve(bytes.len() + 1);
        state.scratch.extend_from_slice(bytes);
        state.scratch.push(b'\n');
        stream.write_all(&state.scratch)?;
        Ok(state.scratch.len())
    }

    /// Finishes the codec, flushes the buffer, closes the raw handle and
    /// recycles the writer.
    pub fn close(mut self) -> Result<(), FileOpError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), FileOpError> {
        let Some(state) = self.state.take() else {
            return Ok(());
        };

        let mut first_err: Option<FileOpError> = None;
        let mut record = |layer: Layer, source: io::Error| {
            let err = FileOpError::Close { path: state.path.clone(), layer, source };
            first_err.get_or_insert(err);
        };

        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.finish() {
                record(Layer::Codec, e);
            }
            if let Err(e) = stream.get_mut().flush() {
                record(Layer::Buffer, e);
            }
            // Dropping the codec and buffer layers may retry their trailers;
            // after a failure that must not reach the handle being closed.
            let mut raw = std::mem::replace(stream.get_mut().get_mut(), Box::new(Detached));
            drop(stream);
            if let Err(e) = raw.close() {
                record(Layer::Raw, e);
            }
        }

        debug!("writer close {}", state.path);
        self.pool.release(state);
        first_err.map_or(Ok(()), Err)
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "write on closed writer")
}

/// Takes the raw handle's place while the upper layers are dropped.
struct Detached;

impl Write for Detached {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteStream for Detached {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.as_mut().ok_or_else(closed_error)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.as_mut().ok_or_else(closed_error)?.flush()
    }
}

impl WriteStream for FileWriter {
    fn close(&mut self) -> io::Result<()> {
        self.teardown().map_err(io::Error::from)
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        if self.state.is_some() {
            let path = self.path().to_string();
            if let Err(e) = self.teardown() {
                warn!("writer {path} dropped without close: {e}");
            }
        }
    }
}

impl std::fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("path", &self.path())
            .field("kind", &self.kind)
            .field("open", &self.stream.is_some())
            .finish()
    }
}
