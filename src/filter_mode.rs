//! Site filter mode definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// FilterMode selects which evaluators run for a site and how their
/// verdicts combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Gate is off: every request passes, nothing is evaluated
    #[default]
    Disabled,
    /// Only IP rules decide
    Ip,
    /// Only the geofence decides
    Geo,
    /// Both IP rules and the geofence must allow
    IpAndGeo,
}

impl FilterMode {
    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Disabled => "disabled",
            FilterMode::Ip => "ip",
            FilterMode::Geo => "geo",
            FilterMode::IpAndGeo => "ip_and_geo",
        }
    }

    /// Whether this mode consults the site's IP rules.
    pub fn needs_ip(&self) -> bool {
        matches!(self, FilterMode::Ip | FilterMode::IpAndGeo)
    }

    /// Whether this mode consults geo-location and the geofence.
    pub fn needs_geo(&self) -> bool {
        matches!(self, FilterMode::Geo | FilterMode::IpAndGeo)
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_mode_from_yaml() {
        let mode: FilterMode = serde_yaml::from_str("ip_and_geo").unwrap();
        assert_eq!(mode, FilterMode::IpAndGeo);
        assert!(serde_yaml::from_str::<FilterMode>("both").is_err());
        assert!(serde_yaml::from_str::<FilterMode>("ip-and-geo").is_err());
    }

    #[test]
    fn test_filter_mode_needs() {
        assert!(!FilterMode::Disabled.needs_ip());
        assert!(!FilterMode::Disabled.needs_geo());
        assert!(FilterMode::Ip.needs_ip());
        assert!(!FilterMode::Ip.needs_geo());
        assert!(!FilterMode::Geo.needs_ip());
        assert!(FilterMode::Geo.needs_geo());
        assert!(FilterMode::IpAndGeo.needs_ip());
        assert!(FilterMode::IpAndGeo.needs_geo());
    }

    #[test]
    fn test_filter_mode_serde_names() {
        for mode in [
            FilterMode::Disabled,
            FilterMode::Ip,
            FilterMode::Geo,
            FilterMode::IpAndGeo,
        ] {
            let yaml = serde_yaml::to_string(&mode).unwrap();
            assert_eq!(yaml.trim(), mode.as_str());
        }
    }
}
