//! Payment path predicates.
//!
//! A payment path constraint restricts which node may appear at one position
//! of the route an operation travels along:
//!
//! ```text
//! path[<index>]     in {node1, node2, node3}
//! path[<index>] not in {node1, node2}
//! ```
//!
//! Negative indices count from the end of the path, so `path[-1]` is the last
//! hop. Node identifiers are opaque strings compared exactly; callers must use
//! one encoding consistently (e.g. base58 public keys) and identifiers may not
//! contain commas or closing braces.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use macaroon_constraints_core::{Caveat, CaveatToken, Checker, ConstraintError, conditions};
use regex::Regex;

use crate::attenuate::Constraint;

/// A parsed payment path predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConstraint {
    pub index: i64,
    pub negate: bool,
    pub node_set: Vec<String>,
}

impl PathConstraint {
    /// Parse a predicate of the form `path[<index>] [not] in {<nodes>}`.
    ///
    /// The index is not bounds checked here; the path it applies to is only
    /// known at check time.
    pub fn parse(predicate: &str) -> Result<Self, ConstraintError> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^[ \t]*path\[([^\]]*)\][ \t]+(?:([^ \t]+)[ \t]+)?in[ \t]+\{([^}]*)\}[ \t]*$")
                .unwrap()
        });

        let captures = re
            .captures(predicate)
            .ok_or_else(|| ConstraintError::PathSyntax {
                predicate: predicate.to_string(),
            })?;

        // Only `-?[0-9]+`; `parse` alone would also take a leading `+`.
        let index_str = &captures[1];
        let digits = index_str.strip_prefix('-').unwrap_or(index_str);
        let index = if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            index_str.parse::<i64>().ok()
        } else {
            None
        }
        .ok_or_else(|| ConstraintError::PathIndex {
            index: index_str.to_string(),
        })?;

        let negate = match captures.get(2).map(|m| m.as_str()) {
            None => false,
            Some("not") => true,
            Some(other) => {
                return Err(ConstraintError::PathNegation {
                    negation: other.to_string(),
                });
            }
        };

        let nodes = &captures[3];
        let node_set = if nodes.trim_matches(' ').is_empty() {
            Vec::new()
        } else {
            nodes
                .split(',')
                .map(|node| node.trim_matches(' ').to_string())
                .collect()
        };

        Ok(Self {
            index,
            negate,
            node_set,
        })
    }

    /// Evaluate the predicate against a concrete path.
    ///
    /// Returns whether the path satisfies the predicate, or a range error if
    /// the index falls outside `-len..len`.
    pub fn is_satisfied_by<S: AsRef<str>>(&self, path: &[S]) -> Result<bool, ConstraintError> {
        let len = path.len() as i64;
        if self.index >= len || self.index < -len {
            return Err(ConstraintError::PathIndexOutOfRange {
                index: self.index,
                len: path.len(),
            });
        }

        let index = if self.index < 0 {
            self.index + len
        } else {
            self.index
        };

        let node = path[index as usize].as_ref();
        let found = self.node_set.iter().any(|allowed| allowed == node);

        Ok(found != self.negate)
    }
}

impl fmt::Display for PathConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negation = if self.negate { " not" } else { "" };
        write!(
            f,
            "path[{}]{} in {{{}}}",
            self.index,
            negation,
            self.node_set.join(", ")
        )
    }
}

impl FromStr for PathConstraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Check a payment path predicate against the path actually traversed.
///
/// The predicate is parsed on every call. Parse errors, range errors and an
/// unsatisfied predicate all come back as errors.
pub fn check_payment_path<S: AsRef<str>>(predicate: &str, path: &[S]) -> Result<(), ConstraintError> {
    let constraint = PathConstraint::parse(predicate)?;
    if !constraint.is_satisfied_by(path)? {
        return Err(ConstraintError::PathUnsatisfied {
            predicate: predicate.to_string(),
        });
    }
    Ok(())
}

/// Limits parts of the payment path to certain nodes.
///
/// The predicate is validated when applied and stored verbatim. An empty
/// predicate appends nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPathConstraint {
    predicate: String,
}

impl PaymentPathConstraint {
    pub fn new<S: Into<String>>(predicate: S) -> Self {
        Self {
            predicate: predicate.into(),
        }
    }
}

impl Constraint for PaymentPathConstraint {
    fn apply(&self, token: &mut dyn CaveatToken) -> Result<(), ConstraintError> {
        if self.predicate.is_empty() {
            return Ok(());
        }

        PathConstraint::parse(&self.predicate)?;
        let caveat = Caveat::new(conditions::PAYMENT_PATH, self.predicate.as_str());
        token.add_first_party_caveat(&caveat.to_string())
    }
}

/// Limits parts of the payment path to certain nodes.
pub fn payment_path_constraint<S: Into<String>>(predicate: S) -> PaymentPathConstraint {
    PaymentPathConstraint::new(predicate)
}

/// Checks `payment-path-constraint` caveats against the traversed path.
///
/// # Arguments
/// * `path` - Node identifiers of every hop, in route order
pub fn payment_path_checker<I, S>(path: I) -> Checker
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let path: Vec<String> = path.into_iter().map(Into::into).collect();
    Checker::new(conditions::PAYMENT_PATH, move |_, argument| {
        check_payment_path(argument, path.as_slice())
    })
}
