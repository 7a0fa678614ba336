//! Upward search for inherited attribute overlays.

use crate::core::NodePath;

use super::hierarchy::Hierarchy;
use super::StoreError;

/// Sidebar overlay file name.
pub const SIDEBAR_FILE: &str = "sidebar.html";
/// Below-header overlay file name.
pub const BELOW_HEADER_FILE: &str = "below_header.html";
/// Footer overlay file name.
pub const FOOTER_FILE: &str = "footer.html";

/// Resolve an overlay by walking from `path` up to the root.
///
/// The first node with a locally-defined overlay file wins. Returns `None`
/// after the root has been checked without a match. No caching; every call
/// re-walks.
pub(super) fn resolve_inherited(
    hierarchy: &dyn Hierarchy,
    path: &NodePath,
    file: &str,
) -> Result<Option<String>, StoreError> {
    let mut current = path.clone();
    loop {
        let content = hierarchy
            .read(&current, file)
            .map_err(|e| StoreError::Storage(current.clone(), e))?;
        if let Some(content) = content {
            return Ok(Some(String::from_utf8_lossy(&content).into_owned()));
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return Ok(None),
        }
    }
}
