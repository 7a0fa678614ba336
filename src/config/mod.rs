//! Server configuration management for `arbor.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── serve      # [serve]
//! │   ├── site       # [[site]]
//! │   └── workers    # [workers]
//! ├── error.rs       # ConfigError
//! ├── handle.rs      # Global config handle
//! ├── registry.rs    # Host → site registry
//! └── mod.rs         # SiteConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[serve]`   | HTTP server (interface, port)                    |
//! | `[[site]]`  | Hosted sites (hosts, data directory, locale)     |
//! | `[workers]` | Declared content types and handler processes     |

mod error;
mod handle;
mod registry;
pub mod section;

pub use error::ConfigError;
pub use handle::{cfg, init_config};
pub use registry::SiteRegistry;
pub use section::{ServeConfig, SiteSection, WorkersConfig};

use crate::log;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing arbor.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// HTTP server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Hosted sites
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteSection>,

    /// Worker process settings
    #[serde(default)]
    pub workers: WorkersConfig,
}

impl SiteConfig {
    /// Load and validate the configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        let mut config = Self::parse(&content)?;
        config.config_path = path.to_path_buf();
        config.root = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        config.validate()?;
        Ok(config)
    }

    /// Parse config content, warning about unknown keys.
    fn parse(content: &str) -> Result<Self, ConfigError> {
        let de = toml::de::Deserializer::new(content);
        let config = serde_ignored::deserialize(de, |unknown| {
            log!("config"; "unknown key `{}` ignored", unknown);
        })?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::Validation(
                "no [[site]] configured".to_string(),
            ));
        }
        if self.workers.types.is_empty() {
            return Err(ConfigError::Validation(
                "[workers] declares no content types".to_string(),
            ));
        }

        let mut seen_hosts = std::collections::BTreeSet::new();
        for site in &self.sites {
            if site.name.is_empty() {
                return Err(ConfigError::Validation(
                    "a [[site]] entry has no name".to_string(),
                ));
            }
            if site.hosts.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "site {:?} has no hosts",
                    site.name
                )));
            }
            for host in &site.hosts {
                if !seen_hosts.insert(host.to_ascii_lowercase()) {
                    return Err(ConfigError::Validation(format!(
                        "host {:?} is claimed by more than one site",
                        host
                    )));
                }
            }
        }
        Ok(())
    }

    /// A site's data directory, resolved against the project root.
    pub fn data_dir(&self, site: &SiteSection) -> PathBuf {
        if site.data.is_absolute() {
            site.data.clone()
        } else {
            self.root.join(&site.data)
        }
    }
}

/// Parse config content for section tests.
#[cfg(test)]
pub(crate) fn test_parse_config(content: &str) -> SiteConfig {
    SiteConfig::parse(content).expect("test config should parse")
}
