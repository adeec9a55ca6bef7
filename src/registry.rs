//! In-process store of per-host site configs.

use ahash::AHashMap;
use arc_swap::ArcSwap;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::gate::normalize_host;
use crate::site::SiteAccessConfig;

/// Source of site config snapshots, keyed by normalized hostname.
///
/// Implementations only hand out snapshots; the gate never writes back.
pub trait SiteConfigProvider: Send + Sync {
    fn site_config(&self, hostname: &str) -> Option<Arc<SiteAccessConfig>>;
}

type SiteMap = AHashMap<String, Arc<SiteAccessConfig>>;

/// Hostname → config map that can be replaced while requests are served.
///
/// Readers take a snapshot of the whole map; writers build a new map and
/// swap it in, so a request never observes a half-applied update.
///
/// # Example
///
/// ```
/// use sitegate::{FilterMode, SiteAccessConfig, SiteConfigProvider, SiteRegistry};
///
/// let registry = SiteRegistry::new();
/// registry.insert("Shop.Example.com", SiteAccessConfig::new("shop", FilterMode::Ip));
/// assert!(registry.site_config("shop.example.com").is_some());
/// ```
pub struct SiteRegistry {
    sites: ArcSwap<SiteMap>,
}

/// Layout of a sites file.
#[derive(Debug, Deserialize)]
struct SitesFile {
    #[serde(default)]
    sites: Vec<SiteEntry>,
}

#[derive(Debug, Deserialize)]
struct SiteEntry {
    hostname: String,
    #[serde(flatten)]
    config: SiteAccessConfig,
}

impl SiteRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sites: ArcSwap::from_pointee(SiteMap::new()),
        }
    }

    /// Load a registry from a sites file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let registry = Self::new();
        registry.reload(path)?;
        Ok(registry)
    }

    /// Parse a registry from YAML.
    ///
    /// ```yaml
    /// sites:
    ///   - hostname: shop.example.com
    ///     site_id: shop
    ///     filter_mode: ip
    ///     ip_rules:
    ///       - { cidr: 10.0.0.0/8, action: allow }
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let registry = Self::new();
        registry.replace_all(parse_sites(yaml)?);
        Ok(registry)
    }

    /// Replace every site with the contents of a sites file.
    ///
    /// On error the current sites stay in place.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let sites = parse_sites(&content)?;
        log::info!("Loaded {} site(s) from {:?}", sites.len(), path);
        self.replace_all(sites);
        Ok(())
    }

    /// Replace every site at once.
    pub fn replace_all(&self, sites: impl IntoIterator<Item = (String, SiteAccessConfig)>) {
        let map: SiteMap = sites
            .into_iter()
            .filter_map(|(host, config)| {
                let host = normalize_host(&host)?;
                Some((host, Arc::new(config)))
            })
            .collect();
        self.sites.store(Arc::new(map));
    }

    /// Add or replace one site.
    pub fn insert(&self, hostname: &str, config: SiteAccessConfig) {
        let Some(host) = normalize_host(hostname) else {
            log::warn!("Ignoring site config with empty hostname");
            return;
        };
        let config = Arc::new(config);
        self.sites.rcu(|current| {
            let mut next = SiteMap::clone(current);
            next.insert(host.clone(), config.clone());
            next
        });
    }

    /// Remove one site, returning its last snapshot.
    pub fn remove(&self, hostname: &str) -> Option<Arc<SiteAccessConfig>> {
        let host = normalize_host(hostname)?;
        let previous = self.sites.load().get(&host).cloned();
        self.sites.rcu(|current| {
            let mut next = SiteMap::clone(current);
            next.remove(&host);
            next
        });
        previous
    }

    pub fn clear(&self) {
        self.sites.store(Arc::new(SiteMap::new()));
    }

    pub fn len(&self) -> usize {
        self.sites.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hostnames currently registered, sorted.
    pub fn hostnames(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.sites.load().keys().cloned().collect();
        hosts.sort();
        hosts
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteConfigProvider for SiteRegistry {
    fn site_config(&self, hostname: &str) -> Option<Arc<SiteAccessConfig>> {
        self.sites.load().get(hostname).cloned()
    }
}

fn parse_sites(yaml: &str) -> Result<Vec<(String, SiteAccessConfig)>> {
    let file: SitesFile = serde_yaml::from_str(yaml)?;
    Ok(file
        .sites
        .into_iter()
        .map(|entry| {
            let mut config = entry.config;
            if config.site_id.is_empty() {
                config.site_id = entry.hostname.clone();
            }
            (entry.hostname, config)
        })
        .collect())
}
