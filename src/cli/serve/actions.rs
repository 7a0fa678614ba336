//! Node add/remove actions handled at the serve edge.
//!
//! These mutate the content tree directly instead of dispatching to a
//! worker. Form rendering belongs to the external page-assembly layer;
//! the placeholders here only carry the field names the POST contract
//! expects.

use crate::config::WorkersConfig;
use crate::render::escape;
use crate::store::{ContentItem, ContentStore, NavLookup, Navigation, StoreError};
use crate::worker::{RequestSnapshot, SessionSnapshot};

/// What the edge should do after an action.
#[derive(Debug, PartialEq)]
pub enum ActionOutcome {
    Redirect(String),
    /// Embeddable body for the page frame.
    Page(Vec<u8>),
    BadRequest(String),
}

/// Create a child node under `node` and link it from the parent's menu.
pub fn add(
    store: &ContentStore,
    node: &ContentItem,
    snapshot: &RequestSnapshot,
    session: &SessionSnapshot,
    workers: &WorkersConfig,
) -> Result<ActionOutcome, StoreError> {
    if snapshot.method != "POST" {
        return Ok(ActionOutcome::Page(add_form(node)));
    }

    let kind = snapshot.get("type").unwrap_or_default();
    if !workers.is_declared(kind) {
        return Ok(ActionOutcome::BadRequest(format!(
            "cannot add content of type {:?}",
            kind
        )));
    }
    let name = snapshot.get("name").unwrap_or_default().to_lowercase();
    if !is_valid_name(&name) {
        return Ok(ActionOutcome::BadRequest(
            "name must be non-empty and contain only letters, digits, - and _".to_string(),
        ));
    }
    let title = snapshot.get("title").unwrap_or_default().trim().to_string();
    if title.is_empty() {
        return Ok(ActionOutcome::BadRequest("title is required".to_string()));
    }

    let child_path = node.path.join(&name);
    let child = ContentItem::new(child_path.clone(), kind, title.clone(), session.actor());
    store.write(&child)?;

    // Link the new node from its parent's menu, creating one if absent.
    let mut nav = match store.navigation(&node.path, "", false)? {
        NavLookup::Found { nav, .. } => nav,
        NavLookup::Missing => Navigation::new(),
    };
    nav.add(title, name);
    store.write_navigation(&nav, &node.path)?;

    Ok(ActionOutcome::Redirect(format!(
        "{}/@@edit",
        child_path.to_encoded()
    )))
}

/// Remove the subtree at `node` and drop its entry from the parent menu.
pub fn remove(
    store: &ContentStore,
    node: &ContentItem,
    snapshot: &RequestSnapshot,
) -> Result<ActionOutcome, StoreError> {
    if snapshot.method != "POST" || snapshot.get("confirm").is_none() {
        return Ok(ActionOutcome::Page(remove_form(node)));
    }

    // Parent navigation cleanup is this caller's step, not the store's.
    let parent = node.path.parent();
    if let Some(parent) = &parent
        && let NavLookup::Found { mut nav, .. } = store.navigation(parent, "", false)?
    {
        nav.remove(node.path.name());
        store.write_navigation(&nav, parent)?;
    }

    store.remove(&node.path)?;

    let target = parent.map_or_else(|| "/".to_string(), |p| p.to_encoded());
    Ok(ActionOutcome::Redirect(target))
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn add_form(node: &ContentItem) -> Vec<u8> {
    format!(
        "<h1>Add content below {}</h1>\n\
         <form method=\"post\">\n\
         <label>Type <input name=\"type\"></label>\n\
         <label>Name <input name=\"name\"></label>\n\
         <label>Title <input name=\"title\"></label>\n\
         <button>Add</button>\n</form>\n",
        escape(node.path.as_str())
    )
    .into_bytes()
}

fn remove_form(node: &ContentItem) -> Vec<u8> {
    format!(
        "<h1>Remove \"{}\"?</h1>\n\
         <form method=\"post\">\n\
         <input type=\"hidden\" name=\"confirm\" value=\"1\">\n\
         <button>Remove</button>\n</form>\n",
        escape(&node.title)
    )
    .into_bytes()
}
