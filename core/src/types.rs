use std::fmt;
use std::io;

use thiserror::Error;

use crate::compression::CodecError;

/// Which layer of a reader/writer stack an error came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Layer {
    /// Compression / decompression stream.
    Codec,
    /// Write buffer between codec and raw handle.
    Buffer,
    /// Backend-provided handle.
    Raw,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Layer::Codec => "codec",
            Layer::Buffer => "buffer",
            Layer::Raw => "raw",
        })
    }
}

/// Unified error for pooled readers and writers.
/// - Every variant carries the path so a log line alone is enough to diagnose.
/// - `Close` names the failing layer.
#[derive(Debug, Error)]
pub enum FileOpError {
    #[error("open file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("mkdir {dir} for {path}: {source}")]
    Mkdir {
        path: String,
        dir: String,
        #[source]
        source: io::Error,
    },

    #[error("create dst {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: io::Error,
    },

    /// `cleanup` holds the failure of closing the raw handle afterwards.
    #[error(
        "compress stream {path}: {source}{}",
        .cleanup.as_ref().map(|e| format!(" (close after failure: {e})")).unwrap_or_default()
    )]
    Codec {
        path: String,
        #[source]
        source: CodecError,
        cleanup: Option<io::Error>,
    },

    #[error("read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("scan {path}: {source}")]
    Scan {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("close {layer} of {path}: {source}")]
    Close {
        path: String,
        layer: Layer,
        #[source]
        source: io::Error,
    },
}

impl FileOpError {
    pub fn path(&self) -> &str {
        match self {
            FileOpError::Open { path, .. }
            | FileOpError::Mkdir { path, .. }
            | FileOpError::Create { path, .. }
            | FileOpError::Codec { path, .. }
            | FileOpError::Read { path, .. }
            | FileOpError::Write { path, .. }
            | FileOpError::Scan { path, .. }
            | FileOpError::Close { path, .. } => path,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            FileOpError::Open { source, .. } | FileOpError::Create { source, .. } => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

impl From<FileOpError> for io::Error {
    fn from(e: FileOpError) -> Self {
        let kind = match &e {
            FileOpError::Open { source, .. }
            | FileOpError::Mkdir { source, .. }
            | FileOpError::Create { source, .. }
            | FileOpError::Read { source, .. }
            | FileOpError::Write { source, .. }
            | FileOpError::Scan { source, .. }
            | FileOpError::Close { source, .. } => source.kind(),
            FileOpError::Codec { source, .. } => match source {
                CodecError::MalformedHeader { .. } => io::ErrorKind::InvalidData,
                CodecError::EmptyStream { .. } => io::ErrorKind::UnexpectedEof,
                CodecError::Io { source, .. } => source.kind(),
                _ => io::ErrorKind::InvalidInput,
            },
        };
        io::Error::new(kind, e)
    }
}

/// Reports whether `err` cannot be fixed by retrying: end-of-stream, a
/// missing path or a malformed compressed header. Anything else may be
/// transient.
pub fn is_unhandled_error(err: &FileOpError) -> bool {
    match err {
        FileOpError::Codec { source, .. } => source.is_unhandled(),
        FileOpError::Open { source, .. } | FileOpError::Read { source, .. } | FileOpError::Scan { source, .. } => {
            is_unhandled_io_error(source)
        }
        _ => false,
    }
}

/// `io::Error` flavour of [`is_unhandled_error`], for errors surfaced by
/// `Read::read` on an open reader. Only end of stream, a missing path and a
/// bad codec header count; other `InvalidData`, such as corruption found
/// mid-stream, is left to the caller.
pub fn is_unhandled_io_error(err: &io::Error) -> bool {
    if let Some(inner) = err.get_ref() {
        if let Some(op) = inner.downcast_ref::<FileOpError>() {
            return is_unhandled_error(op);
        }
        if let Some(codec) = inner.downcast_ref::<CodecError>() {
            return codec.is_unhandled();
        }
    }
    matches!(err.kind(), io::ErrorKind::UnexpectedEof | io::ErrorKind::NotFound)
}
