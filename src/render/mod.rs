//! Rendering context assembly.
//!
//! The serve edge hands the page-assembly layer everything a master
//! template needs: the resolved node, its navigation (absolutized and
//! active-marked), the inherited overlays, and the worker's body. The
//! frame here is a small built-in stand-in for that layer; the template
//! language itself lives outside this server.

use crate::config::SiteSection;
use crate::store::{
    BELOW_HEADER_FILE, ContentItem, ContentStore, FOOTER_FILE, NavLookup, Navigation,
    SIDEBAR_FILE, StoreError,
};

/// Everything the page-assembly layer needs for one request.
#[derive(Debug)]
pub struct RenderContext {
    pub node: ContentItem,
    /// Navigation with absolute targets and the active entry marked, or
    /// `None` when no menu exists along the node's ancestry.
    pub navigation: Option<Navigation>,
    pub sidebar: Option<String>,
    pub below_header: Option<String>,
    pub footer: Option<String>,
    /// Embeddable body produced by the worker.
    pub body: Vec<u8>,
}

impl RenderContext {
    /// Resolve navigation and overlays for `node` around the given body.
    pub fn assemble(
        store: &ContentStore,
        node: ContentItem,
        body: Vec<u8>,
    ) -> Result<Self, StoreError> {
        let navigation = match store.navigation(&node.path, node.path.name(), true)? {
            NavLookup::Found { mut nav, root } => {
                nav.make_absolute(&root);
                Some(nav)
            }
            NavLookup::Missing => None,
        };

        let sidebar = store.resolve_inherited(&node.path, SIDEBAR_FILE)?;
        let below_header = store.resolve_inherited(&node.path, BELOW_HEADER_FILE)?;
        let footer = store.resolve_inherited(&node.path, FOOTER_FILE)?;

        Ok(Self {
            node,
            navigation,
            sidebar,
            below_header,
            footer,
            body,
        })
    }

    /// Compose the final page around the embeddable body.
    pub fn into_page(self, site: &SiteSection) -> String {
        let mut page = String::with_capacity(self.body.len() + 512);
        page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        page.push_str(&format!(
            "<title>{} - {}</title>\n</head>\n<body>\n",
            escape(&self.node.title),
            escape(&site.title)
        ));

        if let Some(nav) = &self.navigation {
            page.push_str("<nav>\n<ul>\n");
            for entry in nav.entries() {
                let class = if entry.active { " class=\"active\"" } else { "" };
                page.push_str(&format!(
                    "<li{}><a href=\"{}\">{}</a></li>\n",
                    class,
                    escape(&entry.target),
                    escape(&entry.name)
                ));
            }
            page.push_str("</ul>\n</nav>\n");
        }

        if let Some(below_header) = &self.below_header {
            page.push_str(&format!("<div class=\"below-header\">{below_header}</div>\n"));
        }
        if let Some(sidebar) = &self.sidebar {
            page.push_str(&format!("<aside>{sidebar}</aside>\n"));
        }

        page.push_str("<main>\n");
        page.push_str(&String::from_utf8_lossy(&self.body));
        page.push_str("\n</main>\n");

        if let Some(footer) = &self.footer {
            page.push_str(&format!("<footer>{footer}</footer>\n"));
        }

        page.push_str("</body>\n</html>\n");
        page
    }
}

/// Escape text for safe HTML interpolation.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
