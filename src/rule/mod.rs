//! IP policy evaluation.
//!
//! A site's IP rules are resolved with longest-prefix precedence: among all
//! rules whose network contains the client address, the most specific one
//! decides, whether it allows or denies. Rules of equal prefix length are
//! resolved in favour of the later rule in input order.

mod cidr;

pub use cidr::{parse_network, IpRule, IpRuleSpec};

use std::net::IpAddr;

use crate::Action;

/// Evaluate a client address string against configuration-level rules.
///
/// Returns `None` when the address is malformed or when no rule matches.
/// Malformed rules are skipped.
///
/// # Examples
/// ```
/// use sitegate::rule::{evaluate, IpRuleSpec};
/// use sitegate::Action;
///
/// let rules = vec![
///     IpRuleSpec::new("10.0.0.0/8", "deny"),
///     IpRuleSpec::new("10.1.0.0/16", "allow"),
/// ];
/// assert_eq!(evaluate("10.1.2.3", &rules), Some(Action::Allow));
/// assert_eq!(evaluate("10.2.0.1", &rules), Some(Action::Deny));
/// assert_eq!(evaluate("192.168.0.1", &rules), None);
/// ```
pub fn evaluate(client_ip: &str, rules: &[IpRuleSpec]) -> Option<Action> {
    let addr = match client_ip.trim().parse::<IpAddr>() {
        Ok(addr) => addr,
        Err(_) => {
            log::debug!("Unparseable client address: {:?}", client_ip);
            return None;
        }
    };

    evaluate_addr(addr, &IpRule::parse_all(rules))
}

/// Evaluate an address against already parsed rules.
pub fn evaluate_addr(addr: IpAddr, rules: &[IpRule]) -> Option<Action> {
    // ::ffff:a.b.c.d is matched as a.b.c.d
    let addr = addr.to_canonical();

    let mut best: Option<IpRule> = None;
    for &rule in rules {
        if !rule.matches(&addr) {
            continue;
        }
        match best {
            Some(current) if rule.prefix_len() < current.prefix_len() => {}
            _ => best = Some(rule),
        }
    }
    best.map(|rule| rule.action())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(rules: &[(&str, &str)]) -> Vec<IpRuleSpec> {
        rules
            .iter()
            .map(|(cidr, action)| IpRuleSpec::new(*cidr, *action))
            .collect()
    }

    #[test]
    fn test_more_specific_allow_beats_broad_deny() {
        let rules = specs(&[("10.0.0.0/8", "deny"), ("10.1.0.0/16", "allow")]);
        assert_eq!(evaluate("10.1.2.3", &rules), Some(Action::Allow));
    }

    #[test]
    fn test_more_specific_deny_beats_broad_allow() {
        let rules = specs(&[("10.1.2.0/24", "deny"), ("10.0.0.0/8", "allow")]);
        assert_eq!(evaluate("10.1.2.3", &rules), Some(Action::Deny));
        assert_eq!(evaluate("10.1.3.3", &rules), Some(Action::Allow));
    }

    #[test]
    fn test_no_match_is_none() {
        let rules = specs(&[("10.0.0.0/8", "allow")]);
        assert_eq!(evaluate("192.168.0.1", &rules), None);
        assert_eq!(evaluate("192.168.0.1", &[]), None);
    }

    #[test]
    fn test_equal_prefix_last_rule_wins() {
        let rules = specs(&[("10.0.0.0/8", "allow"), ("10.0.0.0/8", "deny")]);
        assert_eq!(evaluate("10.9.9.9", &rules), Some(Action::Deny));

        let rules = specs(&[("10.0.0.0/8", "deny"), ("10.255.0.0/8", "allow")]);
        assert_eq!(evaluate("10.9.9.9", &rules), Some(Action::Allow));
    }

    #[test]
    fn test_malformed_client_address() {
        let rules = specs(&[("0.0.0.0/0", "allow")]);
        assert_eq!(evaluate("not-an-ip", &rules), None);
        assert_eq!(evaluate("", &rules), None);
        assert_eq!(evaluate("10.0.0.1:443", &rules), None);
    }

    #[test]
    fn test_malformed_rules_are_skipped() {
        let rules = specs(&[
            ("garbage", "allow"),
            ("10.0.0.0/8", "sometimes"),
            ("10.0.0.0/8", "deny"),
        ]);
        assert_eq!(evaluate("10.0.0.1", &rules), Some(Action::Deny));
    }

    #[test]
    fn test_ipv6_rules() {
        let rules = specs(&[("2001:db8::/32", "deny"), ("2001:db8:1::/48", "allow")]);
        assert_eq!(evaluate("2001:db8:1::5", &rules), Some(Action::Allow));
        assert_eq!(evaluate("2001:db8:2::5", &rules), Some(Action::Deny));
        assert_eq!(evaluate("10.0.0.1", &rules), None);
    }

    #[test]
    fn test_ipv4_mapped_client() {
        let rules = specs(&[("203.0.113.0/24", "allow")]);
        assert_eq!(evaluate("::ffff:203.0.113.7", &rules), Some(Action::Allow));
    }

    #[test]
    fn test_evaluate_addr_matches_evaluate() {
        let specs = specs(&[("10.0.0.0/8", "deny"), ("10.1.0.0/16", "allow")]);
        let rules = IpRule::parse_all(&specs);
        for ip in ["10.1.2.3", "10.2.2.2", "172.16.0.1"] {
            let addr: IpAddr = ip.parse().unwrap();
            assert_eq!(evaluate_addr(addr, &rules), evaluate(ip, &specs));
        }
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let rules = specs(&[("10.0.0.0/8", "deny"), ("10.1.0.0/16", "allow")]);
        let first = evaluate("10.1.2.3", &rules);
        let second = evaluate("10.1.2.3", &rules);
        assert_eq!(first, second);
        assert_eq!(rules.len(), 2);
    }
}
