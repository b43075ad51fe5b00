//! First-party caveat encoding.
//!
//! A caveat travels as a single string `"<condition> <argument>"`. The
//! condition keyword selects the checker; the argument is free text that only
//! the checker interprets.

use std::fmt;
use std::str::FromStr;

use crate::error::ConstraintError;

/// Condition keywords shared by each constraint and its paired checker.
pub mod conditions {
    /// Operation allow-list
    pub const ALLOW: &str = "allow";
    /// Absolute expiry deadline
    pub const TIME_BEFORE: &str = "time-before";
    /// Client IP address lock
    pub const CLIENT_IP_ADDR: &str = "client-ip-addr";
    /// Payment path predicate
    pub const PAYMENT_PATH: &str = "payment-path-constraint";
}

/// A first-party caveat split into its condition keyword and argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caveat {
    condition: String,
    argument: String,
}

impl Caveat {
    pub fn new<C: Into<String>, A: Into<String>>(condition: C, argument: A) -> Self {
        Self {
            condition: condition.into(),
            argument: argument.into(),
        }
    }

    /// Split an encoded caveat at its first space. A caveat without a space
    /// has an empty argument.
    pub fn parse(caveat: &str) -> Self {
        match caveat.split_once(' ') {
            Some((condition, argument)) => Self::new(condition, argument),
            None => Self::new(caveat, ""),
        }
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn argument(&self) -> &str {
        &self.argument
    }
}

impl fmt::Display for Caveat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.condition, self.argument)
    }
}

impl FromStr for Caveat {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ConstraintError::generic("Empty caveat"));
        }
        Ok(Self::parse(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_at_first_space() {
        let caveat = Caveat::parse("payment-path-constraint path[0] in {a, b}");

        assert_eq!(caveat.condition(), conditions::PAYMENT_PATH);
        assert_eq!(caveat.argument(), "path[0] in {a, b}");
    }

    #[test]
    fn test_parse_without_argument() {
        let caveat = Caveat::parse("allow");

        assert_eq!(caveat.condition(), "allow");
        assert_eq!(caveat.argument(), "");
    }

    #[test]
    fn test_display_joins_with_single_space() {
        let caveat = Caveat::new(conditions::CLIENT_IP_ADDR, "127.0.0.1");

        assert_eq!(caveat.to_string(), "client-ip-addr 127.0.0.1");
        assert_eq!(Caveat::parse(&caveat.to_string()), caveat);
    }

    #[test]
    fn test_from_str_rejects_empty() {
        assert!("".parse::<Caveat>().is_err());
        assert!("time-before 2030-01-01T00:00:00Z".parse::<Caveat>().is_ok());
    }
}
