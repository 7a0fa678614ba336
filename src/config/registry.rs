//! Host → site registry.
//!
//! Built once from the config at startup and shared read-only. Replaces
//! any notion of a global mutable host table: the registry is an explicit
//! value handed to the serve layer.

use rustc_hash::FxHashMap;

use crate::config::{SiteConfig, SiteSection};

/// Immutable lookup from request host to site configuration.
#[derive(Debug, Default)]
pub struct SiteRegistry {
    by_host: FxHashMap<String, usize>,
    sites: Vec<SiteSection>,
}

impl SiteRegistry {
    pub fn from_config(config: &SiteConfig) -> Self {
        let sites = config.sites.clone();
        let mut by_host = FxHashMap::default();
        for (idx, site) in sites.iter().enumerate() {
            for host in &site.hosts {
                by_host.insert(host.to_ascii_lowercase(), idx);
            }
        }
        Self { by_host, sites }
    }

    /// Look up the site for a request Host header (port stripped).
    pub fn site_for_host(&self, host: &str) -> Option<&SiteSection> {
        let bare = host.rsplit_once(':').map_or(host, |(h, _)| h);
        self.by_host
            .get(&bare.to_ascii_lowercase())
            .map(|&idx| &self.sites[idx])
    }

    pub fn sites(&self) -> &[SiteSection] {
        &self.sites
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
