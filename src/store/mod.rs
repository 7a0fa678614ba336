//! Content tree storage.
//!
//! # Module Structure
//!
//! - `hierarchy` - Abstracted hierarchical file storage (fs + in-memory)
//! - `record` - `ContentItem` records
//! - `navigation` - Navigation menus with upward resolution
//! - `inherit` - Upward search for attribute overlays

pub mod hierarchy;
mod inherit;
mod navigation;
mod record;

pub use hierarchy::{FsHierarchy, Hierarchy, MemHierarchy};
pub use inherit::{BELOW_HEADER_FILE, FOOTER_FILE, SIDEBAR_FILE};
pub use navigation::{NavEntry, NavLookup, Navigation};
pub use record::{ContentItem, Stamp};

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::NodePath;
use crate::debug;

/// Record file name inside each node directory.
pub const RECORD_FILE: &str = "node.toml";
/// Navigation file name inside each node directory.
pub const NAVIGATION_FILE: &str = "navigation.toml";

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no content item at {0}")]
    NotFound(NodePath),

    #[error("storage failure at {0}")]
    Storage(NodePath, #[source] std::io::Error),

    #[error("could not serialize record for {0}")]
    Serialize(NodePath, #[source] toml::ser::Error),

    #[error("corrupt file at {0}")]
    Corrupt(NodePath, #[source] toml::de::Error),
}

/// Content store over an abstracted hierarchy.
#[derive(Clone)]
pub struct ContentStore {
    hierarchy: Arc<dyn Hierarchy>,
}

impl ContentStore {
    /// Open a filesystem-backed store rooted at `root`.
    pub fn open(root: PathBuf) -> Self {
        Self {
            hierarchy: Arc::new(FsHierarchy::new(root)),
        }
    }

    /// Build a store over any hierarchy (in-memory in tests).
    pub fn with_hierarchy(hierarchy: Arc<dyn Hierarchy>) -> Self {
        Self { hierarchy }
    }

    /// Read the record stored at `path`.
    ///
    /// The returned item's path is set from the argument, never from the
    /// persisted payload. Absent or unparsable records are `NotFound`.
    pub fn lookup(&self, path: &NodePath) -> Result<ContentItem, StoreError> {
        let content = self
            .hierarchy
            .read(path, RECORD_FILE)
            .map_err(|e| StoreError::Storage(path.clone(), e))?
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;

        let raw = String::from_utf8_lossy(&content);
        let mut item: ContentItem = match toml::from_str(&raw) {
            Ok(item) => item,
            Err(e) => {
                debug!("store"; "unparsable record at {}: {}", path, e);
                return Err(StoreError::NotFound(path.clone()));
            }
        };
        item.path = path.clone();
        Ok(item)
    }

    /// Persist `item` at its path, creating the location if missing.
    pub fn write(&self, item: &ContentItem) -> Result<(), StoreError> {
        let content = toml::to_string(item)
            .map_err(|e| StoreError::Serialize(item.path.clone(), e))?;
        self.hierarchy
            .write(&item.path, RECORD_FILE, content.as_bytes())
            .map_err(|e| StoreError::Storage(item.path.clone(), e))
    }

    /// Delete the subtree rooted at `path`.
    ///
    /// The parent's navigation entry is the caller's concern: removal is a
    /// cross-cutting step performed at the serve edge, not here.
    pub fn remove(&self, path: &NodePath) -> Result<(), StoreError> {
        self.hierarchy
            .remove_subtree(path)
            .map_err(|e| StoreError::Storage(path.clone(), e))
    }

    /// Resolve an attribute overlay by upward search from `path`.
    pub fn resolve_inherited(
        &self,
        path: &NodePath,
        file: &str,
    ) -> Result<Option<String>, StoreError> {
        inherit::resolve_inherited(self.hierarchy.as_ref(), path, file)
    }

    /// Load the navigation for `path`; see [`navigation`] for semantics.
    pub fn navigation(
        &self,
        path: &NodePath,
        active_target: &str,
        recursive: bool,
    ) -> Result<NavLookup, StoreError> {
        navigation::resolve(self.hierarchy.as_ref(), path, active_target, recursive)
    }

    /// Write the navigation of `path` with active flags cleared.
    pub fn write_navigation(
        &self,
        nav: &Navigation,
        path: &NodePath,
    ) -> Result<(), StoreError> {
        navigation::persist(self.hierarchy.as_ref(), nav, path)
    }

    /// Write a worker-supplied data file into a node's directory and stamp
    /// the record as updated by `actor`.
    ///
    /// The file name must stay inside the node's directory.
    pub fn write_node_data(
        &self,
        path: &NodePath,
        file: &str,
        content: &[u8],
        actor: &str,
    ) -> Result<(), StoreError> {
        if file.is_empty() || file.contains('/') || file.contains("..") {
            return Err(StoreError::Storage(
                path.clone(),
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid node data file name {:?}", file),
                ),
            ));
        }
        let mut node = self.lookup(path)?;
        self.hierarchy
            .write(path, file, content)
            .map_err(|e| StoreError::Storage(path.clone(), e))?;
        node.touch(actor);
        self.write(&node)
    }
}

/// Content stores of every configured site, keyed by site name.
#[derive(Clone, Default)]
pub struct SiteStores {
    stores: FxHashMap<String, ContentStore>,
}

impl SiteStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, site: impl Into<String>, store: ContentStore) {
        self.stores.insert(site.into(), store);
    }

    pub fn get(&self, site: &str) -> Option<&ContentStore> {
        self.stores.get(site)
    }

    /// [`ContentStore::write_node_data`] routed by site name.
    pub fn write_node_data(
        &self,
        site: &str,
        path: &NodePath,
        file: &str,
        content: &[u8],
        actor: &str,
    ) -> Result<(), StoreError> {
        let store = self.get(site).ok_or_else(|| {
            StoreError::Storage(
                path.clone(),
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("no such site {:?}", site),
                ),
            )
        })?;
        store.write_node_data(path, file, content, actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_store() -> ContentStore {
        ContentStore::with_hierarchy(Arc::new(MemHierarchy::new()))
    }

    #[test]
    fn test_write_then_lookup_round_trips() {
        let store = mem_store();
        let item = ContentItem::new(NodePath::new("/docs/intro"), "document", "Intro", "admin");

        store.write(&item).unwrap();
        let loaded = store.lookup(&NodePath::new("/docs/intro")).unwrap();

        assert_eq!(loaded, item);
        assert_eq!(loaded.path, NodePath::new("/docs/intro"));
    }

    #[test]
    fn test_lookup_absent_is_not_found() {
        let store = mem_store();
        assert!(matches!(
            store.lookup(&NodePath::new("/nope")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_lookup_unparsable_is_not_found() {
        let hierarchy = Arc::new(MemHierarchy::new());
        hierarchy
            .write(&NodePath::new("/bad"), RECORD_FILE, b"not really toml {{")
            .unwrap();
        let store = ContentStore::with_hierarchy(hierarchy);

        assert!(matches!(
            store.lookup(&NodePath::new("/bad")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_deletes_subtree() {
        let store = mem_store();
        let parent = ContentItem::new(NodePath::new("/a"), "document", "A", "admin");
        let child = ContentItem::new(NodePath::new("/a/b"), "document", "B", "admin");
        store.write(&parent).unwrap();
        store.write(&child).unwrap();

        store.remove(&NodePath::new("/a")).unwrap();
        assert!(store.lookup(&NodePath::new("/a")).is_err());
        assert!(store.lookup(&NodePath::new("/a/b")).is_err());
    }

    #[test]
    fn test_write_node_data_stamps_record() {
        let store = mem_store();
        let path = NodePath::new("/foo");
        let item = ContentItem::new(path.clone(), "document", "FooNode", "foo-user");
        store.write(&item).unwrap();

        store
            .write_node_data(&path, "test.txt", b"Hey World!", "bar-user")
            .unwrap();

        let node = store.lookup(&path).unwrap();
        assert_eq!(node.created.as_ref().unwrap().by, "foo-user");
        assert_eq!(node.updated.as_ref().unwrap().by, "bar-user");
    }

    #[test]
    fn test_write_node_data_rejects_escaping_names() {
        let store = mem_store();
        let path = NodePath::new("/foo");
        store
            .write(&ContentItem::new(path.clone(), "document", "Foo", "a"))
            .unwrap();

        assert!(store.write_node_data(&path, "../up.txt", b"x", "a").is_err());
        assert!(store.write_node_data(&path, "a/b.txt", b"x", "a").is_err());
        assert!(store.write_node_data(&path, "", b"x", "a").is_err());
    }

    #[test]
    fn test_site_stores_routes_by_name() {
        let store = mem_store();
        store
            .write(&ContentItem::new(NodePath::new("/"), "document", "Home", "a"))
            .unwrap();

        let mut sites = SiteStores::new();
        sites.insert("main", store);

        sites
            .write_node_data("main", &NodePath::new("/"), "blob.txt", b"x", "a")
            .unwrap();
        assert!(
            sites
                .write_node_data("other", &NodePath::new("/"), "blob.txt", b"x", "a")
                .is_err()
        );
    }

    #[test]
    fn test_resolve_inherited_walks_up() {
        let hierarchy = Arc::new(MemHierarchy::new());
        hierarchy
            .write(&NodePath::new("/"), SIDEBAR_FILE, b"<p>root sidebar</p>")
            .unwrap();
        let store = ContentStore::with_hierarchy(hierarchy);

        let sidebar = store
            .resolve_inherited(&NodePath::new("/a/b/c"), SIDEBAR_FILE)
            .unwrap();
        assert_eq!(sidebar.as_deref(), Some("<p>root sidebar</p>"));

        let below = store
            .resolve_inherited(&NodePath::new("/a/b/c"), BELOW_HEADER_FILE)
            .unwrap();
        assert!(below.is_none());
    }
}
