//! fileutil.rs
//! One-shot helpers over [`FileReader`] and [`FileWriter`]: whole-file
//! read/write, copying between backends, existence checks.
//!
//! All helpers move raw bytes (`CompressionKind::None`) unless told
//! otherwise.

use std::io::{self, Read};

use log::warn;

use crate::compression::CompressionKind;
use crate::fs::{FsOpen, FsStat, WriterBackend};
use crate::reader::FileReader;
use crate::types::FileOpError;
use crate::writer::FileWriter;

/// Streams `content` into a new file at `path`, creating parent directories.
/// Returns the number of bytes copied.
pub fn write_file<B, R>(backend: &B, path: &str, content: R) -> Result<u64, FileOpError>
where
    B: WriterBackend + ?Sized,
    R: Read,
{
    write_file_as(backend, path, content, CompressionKind::None)
}

/// [`write_file`] with the content compressed as `kind`.
pub fn write_file_as<B, R>(backend: &B, path: &str, mut content: R, kind: CompressionKind) -> Result<u64, FileOpError>
where
    B: WriterBackend + ?Sized,
    R: Read,
{
    let mut writer = FileWriter::open(backend, path, 0, kind)?;
    match io::copy(&mut content, &mut writer) {
        Ok(n) => {
            writer.close()?;
            Ok(n)
        }
        Err(source) => {
            if let Err(e) = writer.close() {
                warn!("close {path} after failed write: {e}");
            }
            Err(FileOpError::Write { path: path.to_string(), source })
        }
    }
}

/// Reads the whole file at `path`.
pub fn read_file<B>(backend: &B, path: &str) -> Result<Vec<u8>, FileOpError>
where
    B: FsOpen + ?Sized,
{
    read_file_as(backend, path, CompressionKind::None)
}

/// [`read_file`] decompressing `kind` on the way.
pub fn read_file_as<B>(backend: &B, path: &str, kind: CompressionKind) -> Result<Vec<u8>, FileOpError>
where
    B: FsOpen + ?Sized,
{
    let mut reader = FileReader::open(backend, path, kind)?;
    let mut out = Vec::new();
    let read = reader.read_to_end(&mut out);
    let closed = reader.close();
    read.map_err(|source| FileOpError::Read { path: path.to_string(), source })?;
    closed?;
    Ok(out)
}

/// Copies `src` on `source` to `dst` on `target` byte for byte, e.g. a local
/// file up to an object store. Returns the number of bytes copied.
pub fn copy_file<S, T>(source: &S, src: &str, target: &T, dst: &str) -> Result<u64, FileOpError>
where
    S: FsOpen + ?Sized,
    T: WriterBackend + ?Sized,
{
    let mut reader = FileReader::open(source, src, CompressionKind::None)?;
    let copied = write_file(target, dst, &mut reader);
    let closed = reader.close();
    let n = copied?;
    closed?;
    Ok(n)
}

/// True when `stat` succeeds for `path`.
pub fn exists<B>(backend: &B, path: &str) -> bool
where
    B: FsStat + ?Sized,
{
    backend.stat(path).is_ok()
}
