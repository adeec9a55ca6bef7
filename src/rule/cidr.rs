//! IP CIDR rule parsing.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::IpRuleError;
use crate::Action;

/// IpRuleSpec is an IP rule as the configuration layer stores it.
///
/// Both fields are kept as strings so that a single malformed rule can be
/// skipped at evaluation time instead of rejecting the whole site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRuleSpec {
    /// Network in CIDR notation, or a bare address
    pub cidr: String,
    /// `allow` or `deny`
    pub action: String,
}

impl IpRuleSpec {
    /// Create a new rule spec.
    pub fn new(cidr: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            cidr: cidr.into(),
            action: action.into(),
        }
    }
}

/// IpRule is a parsed IP rule: a network and the action taken on a match.
///
/// # Examples
/// ```
/// use sitegate::rule::{IpRule, IpRuleSpec};
/// use sitegate::Action;
///
/// let rule = IpRule::parse(&IpRuleSpec::new("10.1.2.3/8", "deny")).unwrap();
/// assert_eq!(rule.network().to_string(), "10.0.0.0/8");
/// assert_eq!(rule.action(), Action::Deny);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRule {
    network: IpNet,
    action: Action,
}

impl IpRule {
    /// Create a rule from an already parsed network.
    pub fn new(network: IpNet, action: Action) -> Self {
        Self {
            network: network.trunc(),
            action,
        }
    }

    /// Parse a rule spec.
    pub fn parse(spec: &IpRuleSpec) -> Result<Self, IpRuleError> {
        let network = parse_network(&spec.cidr)?;
        let action = Action::parse(&spec.action)
            .ok_or_else(|| IpRuleError::InvalidAction(spec.action.clone()))?;
        Ok(Self { network, action })
    }

    /// Parse every rule, skipping the ones that are malformed.
    pub fn parse_all(specs: &[IpRuleSpec]) -> Vec<IpRule> {
        specs
            .iter()
            .filter_map(|spec| match IpRule::parse(spec) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    log::debug!("Skipping IP rule {:?}: {}", spec, e);
                    None
                }
            })
            .collect()
    }

    /// The rule's network with host bits cleared.
    pub fn network(&self) -> IpNet {
        self.network
    }

    /// The rule's action.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Prefix length of the rule's network.
    pub fn prefix_len(&self) -> u8 {
        self.network.prefix_len()
    }

    /// Check whether an address falls inside this rule's network.
    ///
    /// Addresses of the other family never match.
    pub fn matches(&self, addr: &IpAddr) -> bool {
        self.network.contains(addr)
    }
}

/// Parse a network pattern.
///
/// Host bits are allowed and cleared (`10.1.2.3/8` is `10.0.0.0/8`), and a
/// bare address is treated as a host route.
pub fn parse_network(pattern: &str) -> Result<IpNet, IpRuleError> {
    let pattern = pattern.trim();

    if let Ok(net) = pattern.parse::<IpNet>() {
        return Ok(net.trunc());
    }

    // Bare address: /32 or /128
    let host = match pattern.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Ipv4Net::new(v4, 32).map(IpNet::V4),
        Ok(IpAddr::V6(v6)) => Ipv6Net::new(v6, 128).map(IpNet::V6),
        Err(_) => return Err(IpRuleError::InvalidCidr(pattern.to_string())),
    };
    host.map_err(|_| IpRuleError::InvalidCidr(pattern.to_string()))
}
