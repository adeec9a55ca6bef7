//! Rule action types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Action represents what an IP rule does when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Let the request through
    Allow,
    /// Refuse the request
    Deny,
}

impl Action {
    /// Parse an action from a string (case-insensitive).
    ///
    /// Returns `None` for anything other than `allow` or `deny`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Some(Action::Allow),
            "deny" => Some(Action::Deny),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Deny => "deny",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::parse(s).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!(Action::parse("allow"), Some(Action::Allow));
        assert_eq!(Action::parse("ALLOW"), Some(Action::Allow));
        assert_eq!(Action::parse(" Deny "), Some(Action::Deny));
        assert_eq!(Action::parse("reject"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Allow.to_string(), "allow");
        assert_eq!(Action::Deny.to_string(), "deny");
    }

    #[test]
    fn test_action_serde() {
        let action: Action = serde_yaml::from_str("deny").unwrap();
        assert_eq!(action, Action::Deny);
        assert!(serde_yaml::from_str::<Action>("block").is_err());
    }
}
