//! backend/mod.rs
//! Reference adapters for the capability traits in [`crate::fs`].
//!
//! - `MemFs`: concurrency-safe in-memory tree, the scratch store for tests.
//! - `LocalFs`: local disk through `std::fs`, optionally rooted at a
//!   directory.
//!
//! Remote stores (HDFS, S3-style object stores) plug in by implementing the
//! same traits outside this crate.

pub mod local;
pub mod memory;

pub use local::LocalFs;
pub use memory::MemFs;

use std::io;

pub(crate) fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path}: no such file or directory"))
}

pub(crate) fn not_a_dir(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{path}: not a directory"))
}

pub(crate) fn is_a_dir(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{path}: is a directory"))
}
