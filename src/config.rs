//! Gate configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Engine settings, usually loaded from a YAML file.
///
/// ```yaml
/// geo_cache_ttl_secs: 3600
/// provider_timeout_ms: 2000
/// store_timeout_ms: 500
/// geoip_database: /var/lib/GeoIP/GeoLite2-City.mmdb
/// sites_file: /etc/sitegate/sites.yaml
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Lifetime of in-memory geo cache entries
    pub geo_cache_ttl_secs: u64,
    /// Bound on one geo provider lookup
    pub provider_timeout_ms: u64,
    /// Bound on one persistent geo cache call
    pub store_timeout_ms: u64,
    /// MaxMind database used as the geo provider
    pub geoip_database: Option<PathBuf>,
    /// YAML file with per-host site configs
    pub sites_file: Option<PathBuf>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            geo_cache_ttl_secs: 3600,
            provider_timeout_ms: 2000,
            store_timeout_ms: 500,
            geoip_database: None,
            sites_file: None,
        }
    }
}

impl GateConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a YAML config.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the engine unusable.
    pub fn validate(&self) -> Result<()> {
        if self.geo_cache_ttl_secs == 0 {
            return Err(Error::Config("geo_cache_ttl_secs must be positive".to_string()));
        }
        if self.provider_timeout_ms == 0 {
            return Err(Error::Config("provider_timeout_ms must be positive".to_string()));
        }
        if self.store_timeout_ms == 0 {
            return Err(Error::Config("store_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn geo_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.geo_cache_ttl_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Sites file to load: `explicit` when given, otherwise `sites_file`.
    pub fn sites_path(&self, explicit: Option<PathBuf>) -> Result<PathBuf> {
        explicit
            .or_else(|| self.sites_file.clone())
            .ok_or_else(|| Error::Config("no sites file configured".to_string()))
    }
}
