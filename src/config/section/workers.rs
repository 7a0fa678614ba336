//! `[workers]` section configuration.
//!
//! Declares the content types served by this deployment. Every type gets
//! one long-lived handler process named `<handler_prefix><type>`, resolved
//! on PATH at startup.
//!
//! # Example
//!
//! ```toml
//! [workers]
//! types = ["document", "image"]
//! handler_prefix = "arbor-"
//! restart_backoff_secs = 5
//! ```

use serde::{Deserialize, Serialize};

/// Worker process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Declared content types. A node whose type is not listed here can
    /// never be dispatched.
    pub types: Vec<String>,

    /// Prefix for handler binary names (`arbor-` + type).
    pub handler_prefix: String,

    /// Seconds to wait before relaunching a crashed handler.
    pub restart_backoff_secs: u64,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            types: vec!["document".to_string()],
            handler_prefix: "arbor-".to_string(),
            restart_backoff_secs: 5,
        }
    }
}

impl WorkersConfig {
    /// Handler binary name for a content type.
    pub fn handler_binary(&self, kind: &str) -> String {
        format!("{}{}", self.handler_prefix, kind)
    }

    /// Check whether a content type is declared.
    pub fn is_declared(&self, kind: &str) -> bool {
        self.types.iter().any(|t| t == kind)
    }
}
