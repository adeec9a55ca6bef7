//! Per-site access configuration snapshots.

use serde::{Deserialize, Serialize};

use crate::geofence::Geofence;
use crate::rule::IpRuleSpec;
use crate::FilterMode;

/// Title used when a site does not configure one.
pub const DEFAULT_BLOCK_TITLE: &str = "Access denied";

/// Message used when a site does not configure one.
pub const DEFAULT_BLOCK_MESSAGE: &str =
    "Access to this site is not permitted from your network or location.";

/// Text shown on the 403 page of a blocked request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockPage {
    pub title: String,
    pub message: String,
}

impl Default for BlockPage {
    fn default() -> Self {
        Self {
            title: DEFAULT_BLOCK_TITLE.to_string(),
            message: DEFAULT_BLOCK_MESSAGE.to_string(),
        }
    }
}

/// Everything the gate needs to decide on a request for one site.
///
/// Snapshots are read-only: the configuration layer replaces a site's
/// snapshot wholesale and requests already in flight keep the one they read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteAccessConfig {
    /// Identifier recorded in audit events
    #[serde(default)]
    pub site_id: String,
    #[serde(default)]
    pub filter_mode: FilterMode,
    #[serde(default)]
    pub ip_rules: Vec<IpRuleSpec>,
    /// Geo verdict computed ahead of time; skips resolution when set
    #[serde(default)]
    pub geo_allowed: Option<bool>,
    #[serde(default)]
    pub geofence: Option<Geofence>,
    #[serde(default)]
    pub block_page: BlockPage,
}

impl SiteAccessConfig {
    /// Create a config with no rules, no fence and the default block page.
    pub fn new(site_id: impl Into<String>, filter_mode: FilterMode) -> Self {
        Self {
            site_id: site_id.into(),
            filter_mode,
            ip_rules: Vec::new(),
            geo_allowed: None,
            geofence: None,
            block_page: BlockPage::default(),
        }
    }

    pub fn with_ip_rule(mut self, cidr: impl Into<String>, action: impl Into<String>) -> Self {
        self.ip_rules.push(IpRuleSpec::new(cidr, action));
        self
    }

    pub fn with_geofence(mut self, fence: Geofence) -> Self {
        self.geofence = Some(fence);
        self
    }

    pub fn with_geo_allowed(mut self, allowed: bool) -> Self {
        self.geo_allowed = Some(allowed);
        self
    }

    pub fn with_block_page(mut self, title: impl Into<String>, message: impl Into<String>) -> Self {
        self.block_page = BlockPage {
            title: title.into(),
            message: message.into(),
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geofence::Point;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config: SiteAccessConfig = serde_yaml::from_str("site_id: shop").unwrap();
        assert_eq!(config.filter_mode, FilterMode::Disabled);
        assert!(config.ip_rules.is_empty());
        assert_eq!(config.geo_allowed, None);
        assert_eq!(config.block_page, BlockPage::default());
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
site_id: 6f1c
filter_mode: ip_and_geo
ip_rules:
  - cidr: 10.0.0.0/8
    action: allow
geofence:
  center: [13.4, 52.5]
  radius_meters: 1500
block_page:
  title: Closed
"#;
        let config: SiteAccessConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.filter_mode, FilterMode::IpAndGeo);
        assert_eq!(config.ip_rules, vec![IpRuleSpec::new("10.0.0.0/8", "allow")]);
        assert!(config
            .geofence
            .as_ref()
            .unwrap()
            .contains(Point::new(13.4, 52.5)));
        assert_eq!(config.block_page.title, "Closed");
        assert_eq!(config.block_page.message, DEFAULT_BLOCK_MESSAGE);
    }

    #[test]
    fn test_invalid_geofence_rejected() {
        let yaml = "site_id: x\ngeofence:\n  center: [0, 0]\n  radius_meters: -5\n";
        assert!(serde_yaml::from_str::<SiteAccessConfig>(yaml).is_err());
    }
}
