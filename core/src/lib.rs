//! fileop-core
//!
//! Storage-agnostic pooled streaming file I/O.
//! Backends are reached only through the capability traits in [`fs`].

#![forbid(unsafe_code)]

// Shared and top level
pub mod config;
pub mod constants;
pub mod types;

// Capabilities and codecs
pub mod compression;
pub mod fs;
pub mod pool;

// Pooled streams
pub mod reader;
pub mod writer;
pub mod rrwriter;

// Adapters and helpers
pub mod backend;
pub mod fileutil;

pub use compression::{CodecError, CompressionKind, GzipConcurrency};
pub use config::{PoolConfig, WriterOptions};
pub use reader::FileReader;
pub use rrwriter::{RoundRobinError, RoundRobinWriter};
pub use types::{is_unhandled_error, is_unhandled_io_error, FileOpError, Layer};
pub use writer::FileWriter;

// -----------------------------------------------------------------------------
// Prelude
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::backend::{LocalFs, MemFs};
    pub use crate::compression::{CompressionKind, GzipConcurrency};
    pub use crate::config::{PoolConfig, WriterOptions};
    pub use crate::fs::{
        FileInfo, FileSystem, FsClose, FsCreate, FsDirReader, FsMkdir, FsOpen, FsRemove, FsRename, FsStat, FsWalk,
        ReadStream, SourceReader, WriteStream, WriterBackend,
    };
    pub use crate::reader::FileReader;
    pub use crate::rrwriter::{RoundRobinError, RoundRobinWriter};
    pub use crate::types::{is_unhandled_error, is_unhandled_io_error, FileOpError};
    pub use crate::writer::FileWriter;
}
