//! Abstracted hierarchical storage.
//!
//! Every node lives at an absolute [`NodePath`] and owns a small set of
//! named files (record, navigation, overlays). The trait keeps the upward
//! inheritance walks independent of the filesystem so they can run against
//! an in-memory tree in tests.

use std::io;
use std::path::PathBuf;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::NodePath;

/// Hierarchical file storage keyed by node path + file name.
pub trait Hierarchy: Send + Sync {
    /// Read a node-local file. `Ok(None)` means the file is absent;
    /// `Err` is a real storage failure.
    fn read(&self, path: &NodePath, file: &str) -> io::Result<Option<Vec<u8>>>;

    /// Write a node-local file, creating the node's location if missing.
    fn write(&self, path: &NodePath, file: &str, content: &[u8]) -> io::Result<()>;

    /// Delete the entire subtree rooted at `path`. Absent subtrees are fine.
    fn remove_subtree(&self, path: &NodePath) -> io::Result<()>;
}

// ============================================================================
// Filesystem hierarchy
// ============================================================================

/// Filesystem-backed hierarchy: one directory per node under `root`.
#[derive(Debug)]
pub struct FsHierarchy {
    root: PathBuf,
}

impl FsHierarchy {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn node_dir(&self, path: &NodePath) -> PathBuf {
        self.root.join(path.as_rel_path())
    }
}

impl Hierarchy for FsHierarchy {
    fn read(&self, path: &NodePath, file: &str) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.node_dir(path).join(file)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, path: &NodePath, file: &str, content: &[u8]) -> io::Result<()> {
        let dir = self.node_dir(path);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(file), content)
    }

    fn remove_subtree(&self, path: &NodePath) -> io::Result<()> {
        match std::fs::remove_dir_all(self.node_dir(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// In-memory hierarchy
// ============================================================================

/// In-memory hierarchy for tests and tooling.
#[derive(Debug, Default)]
pub struct MemHierarchy {
    files: RwLock<FxHashMap<(NodePath, String), Vec<u8>>>,
}

impl MemHierarchy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Hierarchy for MemHierarchy {
    fn read(&self, path: &NodePath, file: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self
            .files
            .read()
            .get(&(path.clone(), file.to_string()))
            .cloned())
    }

    fn write(&self, path: &NodePath, file: &str, content: &[u8]) -> io::Result<()> {
        self.files
            .write()
            .insert((path.clone(), file.to_string()), content.to_vec());
        Ok(())
    }

    fn remove_subtree(&self, path: &NodePath) -> io::Result<()> {
        let prefix = if path.is_root() {
            "/".to_string()
        } else {
            format!("{}/", path.as_str())
        };
        self.files.write().retain(|(p, _), _| {
            !(p == path || p.as_str().starts_with(prefix.as_str()))
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_read_absent_is_none() {
        let temp = TempDir::new().unwrap();
        let fs = FsHierarchy::new(temp.path().to_path_buf());
        assert!(fs.read(&NodePath::new("/a"), "node.toml").unwrap().is_none());
    }

    #[test]
    fn test_fs_write_creates_directories() {
        let temp = TempDir::new().unwrap();
        let fs = FsHierarchy::new(temp.path().to_path_buf());
        let path = NodePath::new("/a/b/c");

        fs.write(&path, "node.toml", b"title = \"x\"").unwrap();
        assert_eq!(
            fs.read(&path, "node.toml").unwrap().unwrap(),
            b"title = \"x\""
        );

        // Writing again over an existing location is fine
        fs.write(&path, "node.toml", b"title = \"y\"").unwrap();
    }

    #[test]
    fn test_fs_remove_subtree() {
        let temp = TempDir::new().unwrap();
        let fs = FsHierarchy::new(temp.path().to_path_buf());
        fs.write(&NodePath::new("/a"), "node.toml", b"a").unwrap();
        fs.write(&NodePath::new("/a/b"), "node.toml", b"b").unwrap();

        fs.remove_subtree(&NodePath::new("/a")).unwrap();
        assert!(fs.read(&NodePath::new("/a"), "node.toml").unwrap().is_none());
        assert!(fs.read(&NodePath::new("/a/b"), "node.toml").unwrap().is_none());

        // Removing an absent subtree is a no-op
        fs.remove_subtree(&NodePath::new("/gone")).unwrap();
    }

    #[test]
    fn test_mem_remove_subtree_keeps_siblings() {
        let mem = MemHierarchy::new();
        mem.write(&NodePath::new("/a"), "node.toml", b"a").unwrap();
        mem.write(&NodePath::new("/a/b"), "node.toml", b"b").unwrap();
        mem.write(&NodePath::new("/ab"), "node.toml", b"ab").unwrap();

        mem.remove_subtree(&NodePath::new("/a")).unwrap();
        assert!(mem.read(&NodePath::new("/a"), "node.toml").unwrap().is_none());
        assert!(mem.read(&NodePath::new("/a/b"), "node.toml").unwrap().is_none());
        // `/ab` shares the `/a` prefix but is not inside the subtree
        assert!(mem.read(&NodePath::new("/ab"), "node.toml").unwrap().is_some());
    }
}
