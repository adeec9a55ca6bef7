//! Fusion of IP and geo verdicts into a single access decision.
//!
//! Every mode except [`FilterMode::Disabled`] is default-deny: a missing
//! verdict never allows a request.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Action, FilterMode};

/// Outcome of IP rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVerdict {
    /// The most specific matching rule allows
    Allow,
    /// The most specific matching rule denies
    Deny,
    /// No rule matched, or the client address was unusable
    Unknown,
}

impl From<Option<Action>> for IpVerdict {
    fn from(action: Option<Action>) -> Self {
        match action {
            Some(Action::Allow) => IpVerdict::Allow,
            Some(Action::Deny) => IpVerdict::Deny,
            None => IpVerdict::Unknown,
        }
    }
}

/// Outcome of geo evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoVerdict {
    /// Client location is inside the site's fence
    Inside,
    /// Client location is outside the site's fence
    Outside,
    /// Location could not be resolved or tested
    Unknown,
}

impl From<Option<bool>> for GeoVerdict {
    fn from(allowed: Option<bool>) -> Self {
        match allowed {
            Some(true) => GeoVerdict::Inside,
            Some(false) => GeoVerdict::Outside,
            None => GeoVerdict::Unknown,
        }
    }
}

/// Final result of one access evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessDecision {
    Allowed,
    Blocked,
}

impl AccessDecision {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDecision::Allowed => "allowed",
            AccessDecision::Blocked => "blocked",
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, AccessDecision::Blocked)
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Combine verdicts according to the site's filter mode.
///
/// | mode       | allowed when                   |
/// |------------|--------------------------------|
/// | Disabled   | always                         |
/// | Ip         | ip is Allow                    |
/// | Geo        | geo is Inside                  |
/// | IpAndGeo   | ip is Allow and geo is Inside  |
pub fn decide(mode: FilterMode, ip: IpVerdict, geo: GeoVerdict) -> AccessDecision {
    let allowed = match mode {
        FilterMode::Disabled => true,
        FilterMode::Ip => ip == IpVerdict::Allow,
        FilterMode::Geo => geo == GeoVerdict::Inside,
        FilterMode::IpAndGeo => ip == IpVerdict::Allow && geo == GeoVerdict::Inside,
    };

    if allowed {
        AccessDecision::Allowed
    } else {
        AccessDecision::Blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP: [IpVerdict; 3] = [IpVerdict::Allow, IpVerdict::Deny, IpVerdict::Unknown];
    const GEO: [GeoVerdict; 3] = [GeoVerdict::Inside, GeoVerdict::Outside, GeoVerdict::Unknown];

    #[test]
    fn test_disabled_always_allows() {
        for ip in IP {
            for geo in GEO {
                assert_eq!(decide(FilterMode::Disabled, ip, geo), AccessDecision::Allowed);
            }
        }
    }

    #[test]
    fn test_ip_mode_ignores_geo() {
        for geo in GEO {
            assert_eq!(decide(FilterMode::Ip, IpVerdict::Allow, geo), AccessDecision::Allowed);
            assert_eq!(decide(FilterMode::Ip, IpVerdict::Deny, geo), AccessDecision::Blocked);
            assert_eq!(decide(FilterMode::Ip, IpVerdict::Unknown, geo), AccessDecision::Blocked);
        }
    }

    #[test]
    fn test_geo_mode_ignores_ip() {
        for ip in IP {
            assert_eq!(decide(FilterMode::Geo, ip, GeoVerdict::Inside), AccessDecision::Allowed);
            assert_eq!(decide(FilterMode::Geo, ip, GeoVerdict::Outside), AccessDecision::Blocked);
            assert_eq!(decide(FilterMode::Geo, ip, GeoVerdict::Unknown), AccessDecision::Blocked);
        }
    }

    #[test]
    fn test_ip_and_geo_requires_both() {
        for ip in IP {
            for geo in GEO {
                let expected = if ip == IpVerdict::Allow && geo == GeoVerdict::Inside {
                    AccessDecision::Allowed
                } else {
                    AccessDecision::Blocked
                };
                assert_eq!(decide(FilterMode::IpAndGeo, ip, geo), expected, "{:?} {:?}", ip, geo);
            }
        }
    }

    #[test]
    fn test_verdict_conversions() {
        assert_eq!(IpVerdict::from(Some(Action::Allow)), IpVerdict::Allow);
        assert_eq!(IpVerdict::from(Some(Action::Deny)), IpVerdict::Deny);
        assert_eq!(IpVerdict::from(None), IpVerdict::Unknown);
        assert_eq!(GeoVerdict::from(Some(true)), GeoVerdict::Inside);
        assert_eq!(GeoVerdict::from(Some(false)), GeoVerdict::Outside);
        assert_eq!(GeoVerdict::from(None), GeoVerdict::Unknown);
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(AccessDecision::Allowed.to_string(), "allowed");
        assert_eq!(AccessDecision::Blocked.to_string(), "blocked");
        assert!(AccessDecision::Blocked.is_blocked());
    }
}
