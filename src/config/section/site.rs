//! `[[site]]` section configuration.
//!
//! One entry per hosted site; a request's Host header selects the site.
//!
//! # Example
//!
//! ```toml
//! [[site]]
//! name = "main"
//! title = "My Site"
//! hosts = ["example.com", "www.example.com"]
//! data = "data/main"
//! locale = "en"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single hosted site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    /// Site identifier, passed to workers with every ticket.
    pub name: String,

    /// Site title, shown in the page frame.
    pub title: String,

    /// Host names (without port) served by this site.
    pub hosts: Vec<String>,

    /// Content data directory (relative to the config file).
    pub data: PathBuf,

    /// Default locale for session snapshots.
    pub locale: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            name: String::new(),
            title: String::new(),
            hosts: Vec::new(),
            data: PathBuf::from("data"),
            locale: "en".to_string(),
        }
    }
}
