//! Site scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::config::{SiteConfig, SiteSection};
use crate::core::NodePath;
use crate::log;
use crate::store::{ContentItem, ContentStore, Navigation};

/// Create a new site directory: config file, data root, welcome node.
pub fn new_site(name: Option<&Path>) -> Result<()> {
    let root = name.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root)
        .with_context(|| format!("could not create {}", root.display()))?;

    let config_path = root.join("arbor.toml");
    if config_path.exists() {
        bail!("{} already exists", config_path.display());
    }

    let config = SiteConfig {
        sites: vec![SiteSection {
            name: "main".to_string(),
            title: "New Site".to_string(),
            hosts: vec!["localhost".to_string()],
            data: "data/main".into(),
            ..SiteSection::default()
        }],
        ..SiteConfig::default()
    };
    let content = toml::to_string_pretty(&config).context("could not serialize config")?;
    fs::write(&config_path, content)
        .with_context(|| format!("could not write {}", config_path.display()))?;

    let store = ContentStore::open(root.join("data/main"));
    let welcome = ContentItem::new(NodePath::new("/"), "document", "Welcome", "init");
    store.write(&welcome).context("could not write root node")?;

    let mut nav = Navigation::new();
    nav.add("Home", "/");
    store
        .write_navigation(&nav, &NodePath::new("/"))
        .context("could not write root navigation")?;

    log!("init"; "created site in {}", root.display());
    log!("init"; "edit arbor.toml, install an arbor-document handler, then run `arbor serve`");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_site_scaffolds() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("mysite");

        new_site(Some(&root)).unwrap();

        let config = SiteConfig::load(&root.join("arbor.toml")).unwrap();
        assert_eq!(config.sites[0].name, "main");

        let store = ContentStore::open(root.join("data/main"));
        let welcome = store.lookup(&NodePath::new("/")).unwrap();
        assert_eq!(welcome.title, "Welcome");
        assert_eq!(welcome.kind, "document");
    }

    #[test]
    fn test_new_site_refuses_existing_config() {
        let temp = TempDir::new().unwrap();
        new_site(Some(temp.path())).unwrap();
        assert!(new_site(Some(temp.path())).is_err());
    }
}
