//! Navigation menus.
//!
//! Each node may carry a `navigation.toml` with an ordered list of
//! entries. Resolution can search upward through the ancestors; the path
//! the menu was actually found at is reported so link targets can be
//! absolutized against it.

use serde::{Deserialize, Serialize};

use crate::core::NodePath;

use super::hierarchy::Hierarchy;
use super::{NAVIGATION_FILE, StoreError};

/// A link in the navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavEntry {
    pub name: String,
    pub target: String,
    /// Computed per request; never persisted as true.
    #[serde(default, skip_serializing_if = "is_false")]
    pub active: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl NavEntry {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            active: false,
        }
    }
}

/// Ordered navigation menu of one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Navigation {
    entries: Vec<NavEntry>,
}

/// On-disk shape: `[[entry]]` array of tables.
#[derive(Debug, Default, Serialize, Deserialize)]
struct NavigationFile {
    #[serde(default, rename = "entry")]
    entries: Vec<NavEntry>,
}

impl Navigation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[NavEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a link. Duplicate targets are allowed.
    pub fn add(&mut self, name: impl Into<String>, target: impl Into<String>) {
        self.entries.push(NavEntry::new(name, target));
    }

    /// Remove all links with the given target, preserving the order of the
    /// remainder. Absent targets are a no-op.
    pub fn remove(&mut self, target: &str) {
        self.entries.retain(|entry| entry.target != target);
    }

    /// Convert relative targets to absolute ones by joining the given base
    /// path. Already-absolute targets are untouched, so applying this twice
    /// is a no-op.
    pub fn make_absolute(&mut self, base: &NodePath) {
        for entry in &mut self.entries {
            if !entry.target.starts_with('/') {
                entry.target = base.join(&entry.target).as_str().to_string();
            }
        }
    }

    /// Mark the first entry whose target equals `target` as active.
    /// Later entries with the same target stay unmarked.
    pub fn mark_active(&mut self, target: &str) {
        for entry in &mut self.entries {
            if entry.target == target {
                entry.active = true;
                break;
            }
        }
    }

    fn clear_active(&mut self) {
        for entry in &mut self.entries {
            entry.active = false;
        }
    }

    fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let file: NavigationFile = toml::from_str(content)?;
        Ok(Self {
            entries: file.entries,
        })
    }

    fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(&NavigationFile {
            entries: self.entries.clone(),
        })
    }
}

impl FromIterator<NavEntry> for Navigation {
    fn from_iter<T: IntoIterator<Item = NavEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Resolution & persistence
// ============================================================================

/// Result of a navigation lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum NavLookup {
    /// No navigation file anywhere along the searched paths. Distinct from
    /// a file that parses to zero entries, which is `Found` with an empty
    /// menu.
    Missing,
    /// A navigation file was found at `root` (equal to the queried path
    /// when the node defines its own menu).
    Found { nav: Navigation, root: NodePath },
}

/// Load the navigation for `path`.
///
/// The first entry whose target equals `active_target` is marked active.
/// With `recursive`, ancestors are searched upward when the node has no
/// menu of its own; the walk never re-searches past into the root, so a
/// root menu is only found when the root is the starting path.
pub(super) fn resolve(
    hierarchy: &dyn Hierarchy,
    path: &NodePath,
    active_target: &str,
    recursive: bool,
) -> Result<NavLookup, StoreError> {
    let mut current = path.clone();
    loop {
        let content = hierarchy
            .read(&current, NAVIGATION_FILE)
            .map_err(|e| StoreError::Storage(current.clone(), e))?;
        if let Some(content) = content {
            let raw = String::from_utf8_lossy(&content);
            let mut nav = Navigation::from_toml(&raw)
                .map_err(|e| StoreError::Corrupt(current.clone(), e))?;
            nav.mark_active(active_target);
            return Ok(NavLookup::Found { nav, root: current });
        }
        if !recursive {
            return Ok(NavLookup::Missing);
        }
        match current.parent() {
            Some(parent) if !parent.is_root() => current = parent,
            _ => return Ok(NavLookup::Missing),
        }
    }
}

/// Write the navigation of `path`, clearing every active flag first
/// (active is never durable).
pub(super) fn persist(
    hierarchy: &dyn Hierarchy,
    nav: &Navigation,
    path: &NodePath,
) -> Result<(), StoreError> {
    let mut clean = nav.clone();
    clean.clear_active();
    let content = clean
        .to_toml()
        .map_err(|e| StoreError::Serialize(path.clone(), e))?;
    hierarchy
        .write(path, NAVIGATION_FILE, content.as_bytes())
        .map_err(|e| StoreError::Storage(path.clone(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::hierarchy::MemHierarchy;

    fn sample() -> Navigation {
        let mut nav = Navigation::new();
        nav.add("Home", "home");
        nav.add("About", "about");
        nav
    }

    #[test]
    fn test_add_then_remove_restores() {
        let original = sample();
        let mut nav = original.clone();
        nav.add("Contact", "contact");
        nav.remove("contact");
        assert_eq!(nav, original);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut nav = sample();
        nav.remove("nope");
        assert_eq!(nav, sample());
    }

    #[test]
    fn test_remove_drops_all_matches() {
        let mut nav = sample();
        nav.add("Also Home", "home");
        nav.remove("home");
        assert_eq!(nav.len(), 1);
        assert_eq!(nav.entries()[0].target, "about");
    }

    #[test]
    fn test_mark_active_first_match_only() {
        let mut nav = sample();
        nav.add("Home Again", "home");
        nav.mark_active("home");
        let active: Vec<_> = nav.entries().iter().map(|e| e.active).collect();
        assert_eq!(active, vec![true, false, false]);
    }

    #[test]
    fn test_make_absolute_is_idempotent() {
        let base = NodePath::new("/site");
        let mut nav = sample();
        nav.add("External", "/already/absolute");

        nav.make_absolute(&base);
        let once = nav.clone();
        nav.make_absolute(&base);
        assert_eq!(nav, once);

        assert_eq!(nav.entries()[0].target, "/site/home");
        assert_eq!(nav.entries()[2].target, "/already/absolute");
    }

    #[test]
    fn test_resolve_local() {
        let mem = MemHierarchy::new();
        persist(&mem, &sample(), &NodePath::new("/a")).unwrap();

        let lookup = resolve(&mem, &NodePath::new("/a"), "home", false).unwrap();
        let NavLookup::Found { nav, root } = lookup else {
            panic!("expected navigation");
        };
        assert_eq!(root, NodePath::new("/a"));
        assert!(nav.entries()[0].active);
        assert!(!nav.entries()[1].active);
    }

    #[test]
    fn test_resolve_missing_without_recursion() {
        let mem = MemHierarchy::new();
        persist(&mem, &sample(), &NodePath::new("/a")).unwrap();

        let lookup = resolve(&mem, &NodePath::new("/a/b"), "", false).unwrap();
        assert_eq!(lookup, NavLookup::Missing);
    }

    #[test]
    fn test_resolve_recursive_reports_root() {
        let mem = MemHierarchy::new();
        persist(&mem, &sample(), &NodePath::new("/a")).unwrap();

        let lookup = resolve(&mem, &NodePath::new("/a/b/c"), "", true).unwrap();
        let NavLookup::Found { root, .. } = lookup else {
            panic!("expected navigation");
        };
        assert_eq!(root, NodePath::new("/a"));
    }

    #[test]
    fn test_resolve_recursive_skips_root_menu() {
        let mem = MemHierarchy::new();
        persist(&mem, &sample(), &NodePath::new("/")).unwrap();

        // The recursive walk stops before re-searching the root...
        let lookup = resolve(&mem, &NodePath::new("/a/b"), "", true).unwrap();
        assert_eq!(lookup, NavLookup::Missing);

        // ...but the root's own menu is found when starting there.
        let lookup = resolve(&mem, &NodePath::new("/"), "", true).unwrap();
        assert!(matches!(lookup, NavLookup::Found { .. }));
    }

    #[test]
    fn test_empty_file_is_empty_not_missing() {
        let mem = MemHierarchy::new();
        mem.write(&NodePath::new("/a"), NAVIGATION_FILE, b"").unwrap();

        let lookup = resolve(&mem, &NodePath::new("/a"), "", false).unwrap();
        let NavLookup::Found { nav, .. } = lookup else {
            panic!("an empty navigation file is still a navigation");
        };
        assert!(nav.is_empty());
    }

    #[test]
    fn test_persist_clears_active() {
        let mem = MemHierarchy::new();
        let mut nav = sample();
        nav.mark_active("home");
        persist(&mem, &nav, &NodePath::new("/a")).unwrap();

        let raw = mem
            .read(&NodePath::new("/a"), NAVIGATION_FILE)
            .unwrap()
            .unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(!text.contains("active"));

        let lookup = resolve(&mem, &NodePath::new("/a"), "", false).unwrap();
        let NavLookup::Found { nav, .. } = lookup else {
            panic!("expected navigation");
        };
        assert!(nav.entries().iter().all(|e| !e.active));
    }

    #[test]
    fn test_corrupt_navigation_is_storage_failure() {
        let mem = MemHierarchy::new();
        mem.write(&NodePath::new("/a"), NAVIGATION_FILE, b"entry = 3")
            .unwrap();

        let result = resolve(&mem, &NodePath::new("/a"), "", false);
        assert!(matches!(result, Err(StoreError::Corrupt(_, _))));
    }
}
