//! fs/mod.rs
//! Capability traits every backend adapter implements a subset of.
//!
//! The core never names a concrete backend: readers only need `FsOpen`,
//! writers need `FsMkdir + FsCreate`, listing helpers need `FsDirReader`.
//! Paths are `/`-separated strings so object-store keys and local paths go
//! through the same surface.

pub mod types;

pub use types::*;

use std::io;

pub trait FsOpen {
    /// Fails with `io::ErrorKind::NotFound` when nothing lives at `path`.
    fn open(&self, path: &str) -> io::Result<Box<dyn ReadStream>>;
}

pub trait FsCreate {
    /// Creates or truncates `path`. The parent directory must exist.
    fn create(&self, path: &str) -> io::Result<Box<dyn WriteStream>>;
}

pub trait FsMkdir {
    fn mkdir(&self, path: &str, perm: u32) -> io::Result<()>;
    /// Idempotent when the whole tree already exists.
    fn mkdir_all(&self, path: &str, perm: u32) -> io::Result<()>;
}

pub trait FsDirReader {
    /// `limit <= 0` returns every entry.
    fn readdir(&self, path: &str, limit: i32) -> io::Result<Vec<FileInfo>>;
    fn readdirnames(&self, path: &str, limit: i32) -> io::Result<Vec<String>>;
}

pub trait FsStat {
    fn stat(&self, path: &str) -> io::Result<FileInfo>;
}

pub trait FsRemove {
    fn remove(&self, path: &str) -> io::Result<()>;
    fn remove_all(&self, path: &str) -> io::Result<()>;
}

pub trait FsRename {
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;
}

pub trait FsWalk {
    /// Visits `root` and everything below it, parents before children,
    /// siblings in lexical order.
    fn walk(&self, root: &str, visit: &mut WalkFn<'_>) -> io::Result<()>;
}

pub trait FsClose {
    fn close(&self) -> io::Result<()>;
}

/// What `FileWriter` needs from a backend.
pub trait WriterBackend: FsMkdir + FsCreate {}
impl<T: FsMkdir + FsCreate + ?Sized> WriterBackend for T {}

/// Read-only source: open + list + close.
pub trait SourceReader: FsOpen + FsDirReader + FsClose {}
impl<T: FsOpen + FsDirReader + FsClose + ?Sized> SourceReader for T {}

/// Every capability at once.
pub trait FileSystem:
    FsOpen + FsCreate + FsMkdir + FsDirReader + FsStat + FsRemove + FsRename + FsWalk + FsClose
{
}
impl<T> FileSystem for T where
    T: FsOpen + FsCreate + FsMkdir + FsDirReader + FsStat + FsRemove + FsRename + FsWalk + FsClose + ?Sized
{
}

/// Parent directory of a `/`-separated path, `"."` for a bare name.
pub fn parent_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => "/",
        Some(idx) => &trimmed[..idx],
        None => ".",
    }
}

/// Applies the `limit <= 0` means unlimited convention.
pub fn apply_limit<T>(mut items: Vec<T>, limit: i32) -> Vec<T> {
    if limit > 0 {
        items.truncate(limit as usize);
    }
    items
}

// Forwarding impls so `&B`, `Arc<B>` and `Box<B>` can stand in for a backend.
macro_rules! forward_fs {
    ($($ptr:ty),*) => {$(
        impl<B: FsOpen + ?Sized> FsOpen for $ptr {
            fn open(&self, path: &str) -> io::Result<Box<dyn ReadStream>> { (**self).open(path) }
        }
        impl<B: FsCreate + ?Sized> FsCreate for $ptr {
            fn create(&self, path: &str) -> io::Result<Box<dyn WriteStream>> { (**self).create(path) }
        }
        impl<B: FsMkdir + ?Sized> FsMkdir for $ptr {
            fn mkdir(&self, path: &str, perm: u32) -> io::Result<()> { (**self).mkdir(path, perm) }
            fn mkdir_all(&self, path: &str, perm: u32) -> io::Result<()> { (**self).mkdir_all(path, perm) }
        }
        impl<B: FsDirReader + ?Sized> FsDirReader for $ptr {
            fn readdir(&self, path: &str, limit: i32) -> io::Result<Vec<FileInfo>> { (**self).readdir(path, limit) }
            fn readdirnames(&self, path: &str, limit: i32) -> io::Result<Vec<String>> { (**self).readdirnames(path, limit) }
        }
        impl<B: FsStat + ?Sized> FsStat for $ptr {
            fn stat(&self, path: &str) -> io::Result<FileInfo> { (**self).stat(path) }
        }
        impl<B: FsRemove + ?Sized> FsRemove for $ptr {
            fn remove(&self, path: &str) -> io::Result<()> { (**self).remove(path) }
            fn remove_all(&self, path: &str) -> io::Result<()> { (**self).remove_all(path) }
        }
        impl<B: FsRename + ?Sized> FsRename for $ptr {
            fn rename(&self, from: &str, to: &str) -> io::Result<()> { (**self).rename(from, to) }
        }
        impl<B: FsWalk + ?Sized> FsWalk for $ptr {
            fn walk(&self, root: &str, visit: &mut WalkFn<'_>) -> io::Result<()> { (**self).walk(root, visit) }
        }
        impl<B: FsClose + ?Sized> FsClose for $ptr {
            fn close(&self) -> io::Result<()> { (**self).close() }
        }
    )*};
}

forward_fs!(&B, std::sync::Arc<B>, Box<B>);
