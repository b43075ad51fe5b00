//! Caveat checkers and the registry that dispatches to them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::caveat::Caveat;
use crate::error::ConstraintError;
use crate::token::CaveatToken;

type CheckFn = dyn Fn(&str, &str) -> Result<(), ConstraintError> + Send + Sync;

/// A caveat checker: a condition keyword packaged with the function that
/// evaluates caveats carrying it.
///
/// Request context (client address, requested operation, traversed path) is
/// captured when the checker is built, not passed per call.
#[derive(Clone)]
pub struct Checker {
    condition: String,
    check: Arc<CheckFn>,
}

impl Checker {
    /// Creates a checker for `condition`.
    ///
    /// # Arguments
    /// * `condition` - The condition keyword this checker is registered under
    /// * `check` - Called with `(condition, argument)` for every matching caveat
    pub fn new<C, F>(condition: C, check: F) -> Self
    where
        C: Into<String>,
        F: Fn(&str, &str) -> Result<(), ConstraintError> + Send + Sync + 'static,
    {
        Self {
            condition: condition.into(),
            check: Arc::new(check),
        }
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Evaluate one caveat argument.
    pub fn check(&self, condition: &str, argument: &str) -> Result<(), ConstraintError> {
        (self.check)(condition, argument)
    }
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checker")
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

/// Registry of checkers keyed by condition keyword.
///
/// Every caveat on a token must be claimed by a registered checker and pass
/// it; a caveat nobody recognizes fails verification.
#[derive(Debug, Clone, Default)]
pub struct CheckerSet {
    checkers: HashMap<String, Checker>,
}

impl CheckerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a checker, failing if its condition is already taken.
    pub fn register(&mut self, checker: Checker) -> Result<(), ConstraintError> {
        if self.checkers.contains_key(checker.condition()) {
            return Err(ConstraintError::DuplicateChecker {
                condition: checker.condition().to_string(),
            });
        }
        self.checkers.insert(checker.condition().to_string(), checker);
        Ok(())
    }

    /// Builder form of [`CheckerSet::register`].
    pub fn with(mut self, checker: Checker) -> Result<Self, ConstraintError> {
        self.register(checker)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    /// Dispatch one encoded caveat to the checker for its condition.
    pub fn check_caveat(&self, caveat: &str) -> Result<(), ConstraintError> {
        let caveat = Caveat::parse(caveat);
        let checker = self.checkers.get(caveat.condition()).ok_or_else(|| {
            ConstraintError::UnknownCondition {
                condition: caveat.condition().to_string(),
            }
        })?;

        checker.check(caveat.condition(), caveat.argument())
    }

    /// Check every first-party caveat on `token`, stopping at the first failure.
    pub fn verify<T: CaveatToken + ?Sized>(&self, token: &T) -> Result<(), ConstraintError> {
        let caveats = token.first_party_caveats()?;

        for caveat in &caveats {
            debug!(caveat = %caveat, "checking caveat");
            if let Err(e) = self.check_caveat(caveat) {
                debug!(caveat = %caveat, error = %e, "caveat not satisfied");
                return Err(e);
            }
        }

        debug!(count = caveats.len(), "all caveats satisfied");
        Ok(())
    }
}
