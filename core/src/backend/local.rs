//! backend/local.rs
//! Local-disk backend over `std::fs`.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::fs::{
    apply_limit, FileInfo, FsClose, FsCreate, FsDirReader, FsMkdir, FsOpen, FsRemove, FsRename, FsStat, FsWalk,
    ReadStream, WalkFn, WriteStream,
};

/// Local filesystem. Without a root, paths are used as given; with one,
/// every path is resolved below it (a leading `/` is ignored).
#[derive(Debug, Clone, Default)]
pub struct LocalFs {
    root: Option<PathBuf>,
}

impl LocalFs {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path.trim_start_matches('/')),
            None => PathBuf::from(path),
        }
    }
}

fn info_for(name: String, md: &fs::Metadata) -> FileInfo {
    FileInfo { name, ..FileInfo::from(md) }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Entries of `dir` sorted by name.
fn sorted_entries(dir: &Path) -> io::Result<Vec<(String, fs::Metadata)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, entry.metadata()?));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn walk_dir(dir: &Path, shown: &str, visit: &mut WalkFn<'_>) -> io::Result<()> {
    for (name, md) in sorted_entries(dir)? {
        let child_shown = if shown.is_empty() || shown.ends_with('/') {
            format!("{shown}{name}")
        } else {
            format!("{shown}/{name}")
        };
        visit(&child_shown, &info_for(name.clone(), &md))?;
        if md.is_dir() {
            walk_dir(&dir.join(&name), &child_shown, visit)?;
        }
    }
    Ok(())
}

impl FsOpen for LocalFs {
    fn open(&self, path: &str) -> io::Result<Box<dyn ReadStream>> {
        Ok(Box::new(File::open(self.resolve(path))?))
    }
}

impl FsCreate for LocalFs {
    fn create(&self, path: &str) -> io::Result<Box<dyn WriteStream>> {
        Ok(Box::new(File::create(self.resolve(path))?))
    }
}

impl FsMkdir for LocalFs {
    fn mkdir(&self, path: &str, perm: u32) -> io::Result<()> {
        dir_builder(perm, false).create(self.resolve(path))
    }

    fn mkdir_all(&self, path: &str, perm: u32) -> io::Result<()> {
        dir_builder(perm, true).create(self.resolve(path))
    }
}

fn dir_builder(perm: u32, recursive: bool) -> fs::DirBuilder {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(perm);
    }
    #[cfg(not(unix))]
    let _ = perm;
    builder
}

impl FsDirReader for LocalFs {
    fn readdir(&self, path: &str, limit: i32) -> io::Result<Vec<FileInfo>> {
        let infos = sorted_entries(&self.resolve(path))?
            .into_iter()
            .map(|(name, md)| info_for(name, &md))
            .collect();
        Ok(apply_limit(infos, limit))
    }

    fn readdirnames(&self, path: &str, limit: i32) -> io::Result<Vec<String>> {
        let names = sorted_entries(&self.resolve(path))?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        Ok(apply_limit(names, limit))
    }
}

impl FsStat for LocalFs {
    fn stat(&self, path: &str) -> io::Result<FileInfo> {
        let full = self.resolve(path);
        let md = fs::metadata(&full)?;
        Ok(info_for(file_name(&full), &md))
    }
}

impl FsRemove for LocalFs {
    fn remove(&self, path: &str) -> io::Result<()> {
        let full = self.resolve(path);
        if fs::symlink_metadata(&full)?.is_dir() {
            fs::remove_dir(full)
        } else {
            fs::remove_file(full)
        }
    }

    fn remove_all(&self, path: &str) -> io::Result<()> {
        let full = self.resolve(path);
        let md = match fs::symlink_metadata(&full) {
            Ok(md) => md,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if md.is_dir() {
            fs::remove_dir_all(full)
        } else {
            fs::remove_file(full)
        }
    }
}

impl FsRename for LocalFs {
    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.resolve(from), self.resolve(to))
    }
}

impl FsWalk for LocalFs {
    fn walk(&self, root: &str, visit: &mut WalkFn<'_>) -> io::Result<()> {
        let full = self.resolve(root);
        let md = fs::metadata(&full)?;
        visit(root, &info_for(file_name(&full), &md))?;
        if md.is_dir() {
            walk_dir(&full, root, visit)?;
        }
        Ok(())
    }
}

impl FsClose for LocalFs {
    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooted_paths_ignore_leading_slash() {
        let fs = LocalFs::with_root("/srv/data");
        assert_eq!(fs.resolve("/a/b.txt"), PathBuf::from("/srv/data/a/b.txt"));
        assert_eq!(LocalFs::new().resolve("/a/b.txt"), PathBuf::from("/a/b.txt"));
    }
}
