//! backend/memory.rs
//! In-memory backend.
//!
//! One `BTreeMap` keyed by normalized path (`a/b/c`, root is `""`) behind a
//! `parking_lot::RwLock`. Directories are explicit entries: `create` needs an
//! existing parent, the same contract a disk gives. File contents sit behind
//! their own mutex so open write handles never hold the tree lock.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Write};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};

use super::{is_a_dir, not_a_dir, not_found};
use crate::constants::{DEFAULT_DIR_PERM, DEFAULT_FILE_PERM};
use crate::fs::{
    apply_limit, FileInfo, FsClose, FsCreate, FsDirReader, FsMkdir, FsOpen, FsRemove, FsRename, FsStat, FsWalk,
    ReadStream, WalkFn, WriteStream,
};

#[derive(Debug)]
struct FileData {
    bytes: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Clone)]
enum Node {
    Dir { mode: u32, modified: SystemTime },
    File { mode: u32, data: Arc<Mutex<FileData>> },
}

impl Node {
    fn info(&self, name: &str) -> FileInfo {
        match self {
            Node::Dir { mode, modified } => FileInfo::dir(name, *modified, *mode),
            Node::File { mode, data } => {
                let data = data.lock();
                FileInfo::file(name, data.bytes.len() as u64, data.modified, *mode)
            }
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, Node::Dir { .. })
    }
}

type Tree = BTreeMap<String, Node>;

fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn parent_key(key: &str) -> &str {
    key.rfind('/').map_or("", |idx| &key[..idx])
}

fn base_name(key: &str) -> &str {
    if key.is_empty() {
        "/"
    } else {
        key.rsplit('/').next().unwrap_or(key)
    }
}

fn child_prefix(key: &str) -> String {
    if key.is_empty() {
        String::new()
    } else {
        format!("{key}/")
    }
}

/// Direct children of `key`, in lexical order.
fn children<'a>(tree: &'a Tree, key: &str) -> Vec<(&'a String, &'a Node)> {
    let prefix = child_prefix(key);
    tree.range(prefix.clone()..)
        .take_while(|(k, _)| k.starts_with(&prefix))
        .filter(|(k, _)| {
            let rest = &k[prefix.len()..];
            !rest.is_empty() && !rest.contains('/')
        })
        .collect()
}

fn has_children(tree: &Tree, key: &str) -> bool {
    let prefix = child_prefix(key);
    tree.range(prefix.clone()..)
        .take_while(|(k, _)| k.starts_with(&prefix))
        .any(|(k, _)| k.len() > prefix.len())
}

fn require_dir(tree: &Tree, key: &str, shown: &str) -> io::Result<()> {
    match tree.get(key) {
        Some(node) if node.is_dir() => Ok(()),
        Some(_) => Err(not_a_dir(shown)),
        None => Err(not_found(shown)),
    }
}

/// Depth-first, parents before children, siblings in lexical order.
fn collect_walk(tree: &Tree, key: &str, rel: &str, out: &mut Vec<(String, FileInfo)>) {
    for (child, node) in children(tree, key) {
        let name = base_name(child);
        let child_rel = if rel.is_empty() { name.to_string() } else { format!("{rel}/{name}") };
        out.push((child_rel.clone(), node.info(name)));
        if node.is_dir() {
            collect_walk(tree, child, &child_rel, out);
        }
    }
}

fn join_display(root: &str, rel: &str) -> String {
    if rel.is_empty() {
        return root.to_string();
    }
    let base = root.trim_end_matches('/');
    if base.is_empty() && root.starts_with('/') {
        format!("/{rel}")
    } else if base.is_empty() || base == "." {
        rel.to_string()
    } else {
        format!("{base}/{rel}")
    }
}

/// Concurrency-safe in-memory filesystem. Clones share the same tree.
#[derive(Debug, Clone)]
pub struct MemFs {
    tree: Arc<RwLock<Tree>>,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFs {
    pub fn new() -> Self {
        let mut tree = Tree::new();
        tree.insert(String::new(), Node::Dir { mode: DEFAULT_DIR_PERM, modified: SystemTime::now() });
        Self { tree: Arc::new(RwLock::new(tree)) }
    }

    /// Number of files and directories, the root excluded.
    pub fn len(&self) -> usize {
        self.tree.read().len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FsOpen for MemFs {
    fn open(&self, path: &str) -> io::Result<Box<dyn ReadStream>> {
        let key = normalize(path);
        let tree = self.tree.read();
        match tree.get(&key) {
            Some(Node::File { data, .. }) => Ok(Box::new(Cursor::new(data.lock().bytes.clone()))),
            Some(Node::Dir { .. }) => Err(is_a_dir(path)),
            None => Err(not_found(path)),
        }
    }
}

impl FsCreate for MemFs {
    fn create(&self, path: &str) -> io::Result<Box<dyn WriteStream>> {
        let key = normalize(path);
        if key.is_empty() {
            return Err(is_a_dir(path));
        }
        let mut tree = self.tree.write();
        require_dir(&tree, parent_key(&key), path)?;
        if matches!(tree.get(&key), Some(node) if node.is_dir()) {
            return Err(is_a_dir(path));
        }

        let data = Arc::new(Mutex::new(FileData { bytes: Vec::new(), modified: SystemTime::now() }));
        tree.insert(key, Node::File { mode: DEFAULT_FILE_PERM, data: Arc::clone(&data) });
        Ok(Box::new(MemWriter { path: path.to_string(), data, closed: false }))
    }
}

impl FsMkdir for MemFs {
    fn mkdir(&self, path: &str, perm: u32) -> io::Result<()> {
        let key = normalize(path);
        let mut tree = self.tree.write();
        if tree.contains_key(&key) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, format!("{path}: file exists")));
        }
        require_dir(&tree, parent_key(&key), path)?;
        tree.insert(key, Node::Dir { mode: perm, modified: SystemTime::now() });
        Ok(())
    }

    fn mkdir_all(&self, path: &str, perm: u32) -> io::Result<()> {
        let key = normalize(path);
        let mut tree = self.tree.write();
        let mut end = 0;
        while end < key.len() {
            end = key[end..].find('/').map_or(key.len(), |idx| end + idx);
            let prefix = &key[..end];
            match tree.get(prefix) {
                Some(node) if node.is_dir() => {}
                Some(_) => return Err(not_a_dir(prefix)),
                None => {
                    tree.insert(prefix.to_string(), Node::Dir { mode: perm, modified: SystemTime::now() });
                }
            }
            end += 1;
        }
        Ok(())
    }
}

impl FsDirReader for MemFs {
    fn readdir(&self, path: &str, limit: i32) -> io::Result<Vec<FileInfo>> {
        let key = normalize(path);
        let tree = self.tree.read();
        require_dir(&tree, &key, path)?;
        let infos = children(&tree, &key)
            .into_iter()
            .map(|(k, node)| node.info(base_name(k)))
            .collect();
        Ok(apply_limit(infos, limit))
    }

    fn readdirnames(&self, path: &str, limit: i32) -> io::Result<Vec<String>> {
        let key = normalize(path);
        let tree = self.tree.read();
        require_dir(&tree, &key, path)?;
        let names = children(&tree, &key)
            .into_iter()
            .map(|(k, _)| base_name(k).to_string())
            .collect();
        Ok(apply_limit(names, limit))
    }
}

impl FsStat for MemFs {
    fn stat(&self, path: &str) -> io::Result<FileInfo> {
        let key = normalize(path);
        let tree = self.tree.read();
        tree.get(&key)
            .map(|node| node.info(base_name(&key)))
            .ok_or_else(|| not_found(path))
    }
}

impl FsRemove for MemFs {
    fn remove(&self, path: &str) -> io::Result<()> {
        let key = normalize(path);
        if key.is_empty() {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "cannot remove root"));
        }
        let mut tree = self.tree.write();
        match tree.get(&key) {
            None => return Err(not_found(path)),
            Some(node) if node.is_dir() && has_children(&tree, &key) => {
                return Err(io::Error::new(io::ErrorKind::Other, format!("{path}: directory not empty")));
            }
            Some(_) => {}
        }
        tree.remove(&key);
        Ok(())
    }

    fn remove_all(&self, path: &str) -> io::Result<()> {
        let key = normalize(path);
        let prefix = child_prefix(&key);
        let mut tree = self.tree.write();
        if key.is_empty() {
            tree.retain(|k, _| k.is_empty());
        } else {
            tree.retain(|k, _| *k != key && !k.starts_with(&prefix));
        }
        Ok(())
    }
}

impl FsRename for MemFs {
    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let src = normalize(from);
        let dst = normalize(to);
        if src == dst {
            return Ok(());
        }
        if src.is_empty() || dst.starts_with(&child_prefix(&src)) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("rename {from} to {to}: invalid destination"),
            ));
        }

        let mut tree = self.tree.write();
        if !tree.contains_key(&src) {
            return Err(not_found(from));
        }
        require_dir(&tree, parent_key(&dst), to)?;
        if let Some(existing) = tree.get(&dst) {
            if existing.is_dir() {
                return Err(is_a_dir(to));
            }
        }

        let src_prefix = child_prefix(&src);
        let moved: Vec<String> = tree
            .keys()
            .filter(|k| **k == src || k.starts_with(&src_prefix))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = tree.remove(&old) {
                let new_key = format!("{dst}{}", &old[src.len()..]);
                tree.insert(new_key, node);
            }
        }
        Ok(())
    }
}

impl FsWalk for MemFs {
    /// Paths handed to `visit` are `root` joined with the relative path.
    /// The tree is snapshotted first, so `visit` may call back into the
    /// filesystem.
    fn walk(&self, root: &str, visit: &mut WalkFn<'_>) -> io::Result<()> {
        let key = normalize(root);
        let entries = {
            let tree = self.tree.read();
            let node = tree.get(&key).ok_or_else(|| not_found(root))?;
            let mut entries = vec![(String::new(), node.info(base_name(&key)))];
            if node.is_dir() {
                collect_walk(&tree, &key, "", &mut entries);
            }
            entries
        };

        for (rel, info) in entries {
            visit(&join_display(root, &rel), &info)?;
        }
        Ok(())
    }
}

impl FsClose for MemFs {
    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Write handle: appends straight into the shared file contents.
struct MemWriter {
    path: String,
    data: Arc<Mutex<FileData>>,
    closed: bool,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::Other, format!("{}: file already closed", self.path)));
        }
        let mut data = self.data.lock();
        data.bytes.extend_from_slice(buf);
        data.modified = SystemTime::now();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteStream for MemWriter {
    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::Other, format!("{}: file already closed", self.path)));
        }
        self.closed = true;
        Ok(())
    }
}
