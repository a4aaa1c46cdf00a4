//! fs/types.rs
//! Handle traits and file metadata shared by every backend.

use std::io::{self, Read, Write};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// A readable stream handed out by a backend's `open`.
///
/// `close` releases backend resources (sockets, leases, descriptors). The
/// default is a no-op for handles that release everything on drop.
pub trait ReadStream: Read + Send {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A writable stream handed out by a backend's `create`.
///
/// For object stores `close` is usually the commit point, so its error must
/// be surfaced rather than left to `Drop`.
pub trait WriteStream: Write + Send {
    fn close(&mut self) -> io::Result<()>;
}

impl ReadStream for Box<dyn ReadStream> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl WriteStream for Box<dyn WriteStream> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl ReadStream for io::Cursor<Vec<u8>> {}

impl ReadStream for std::fs::File {}

impl WriteStream for std::fs::File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

/// File metadata consumed by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
    pub is_dir: bool,
    pub mode: u32,
}

impl FileInfo {
    pub fn file(name: impl Into<String>, size: u64, modified: SystemTime, mode: u32) -> Self {
        Self { name: name.into(), size, modified, is_dir: false, mode }
    }

    pub fn dir(name: impl Into<String>, modified: SystemTime, mode: u32) -> Self {
        Self { name: name.into(), size: 0, modified, is_dir: true, mode }
    }

    /// Object stores have no real directories: a key ending in `/` is one.
    /// `name` becomes the last path segment of the key.
    pub fn from_object_key(key: &str, size: u64, modified: SystemTime) -> Self {
        let is_dir = key.ends_with('/');
        let trimmed = key.trim_end_matches('/');
        let name = trimmed.rsplit('/').next().unwrap_or(trimmed).to_string();
        Self {
            name,
            size: if is_dir { 0 } else { size },
            modified,
            is_dir,
            mode: if is_dir { crate::constants::DEFAULT_DIR_PERM } else { crate::constants::DEFAULT_FILE_PERM },
        }
    }
}

impl From<&std::fs::Metadata> for FileInfo {
    fn from(md: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            md.permissions().mode() & 0o7777
        };
        #[cfg(not(unix))]
        let mode = if md.permissions().readonly() { 0o444 } else { 0o644 };

        Self {
            name: String::new(),
            size: md.len(),
            modified: md.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_dir: md.is_dir(),
            mode,
        }
    }
}

/// Visitor passed to `FsWalk::walk`: receives the full path and its info.
/// Returning an error aborts the walk with that error.
pub type WalkFn<'a> = dyn FnMut(&str, &FileInfo) -> io::Result<()> + 'a;
