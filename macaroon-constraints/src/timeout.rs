//! Token lifetime.

use chrono::{DateTime, SecondsFormat, Utc};
use macaroon_constraints_core::{
    Caveat, CaveatToken, Checker, ConstraintError, TokenTimeConfig, conditions,
};

use crate::attenuate::Constraint;

/// Limits the token's lifetime to a number of seconds after issue.
///
/// Encoded as `time-before <RFC 3339 deadline>`. The deadline is fixed when
/// the constraint is applied, not when it is built. Zero or negative
/// durations produce a token that is already expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConstraint {
    time_config: TokenTimeConfig,
}

impl TimeoutConstraint {
    pub fn new(seconds: i64) -> Self {
        Self::with_time(TokenTimeConfig::with_duration(seconds))
    }

    /// Use an explicit issue time instead of the current one.
    pub fn with_time(time_config: TokenTimeConfig) -> Self {
        Self { time_config }
    }
}

impl Constraint for TimeoutConstraint {
    fn apply(&self, token: &mut dyn CaveatToken) -> Result<(), ConstraintError> {
        let deadline = self
            .time_config
            .deadline()
            .ok_or(ConstraintError::InvalidTimeout {
                seconds: self.time_config.duration,
            })?;

        let caveat = Caveat::new(
            conditions::TIME_BEFORE,
            deadline.to_rfc3339_opts(SecondsFormat::Nanos, true),
        );
        token.add_first_party_caveat(&caveat.to_string())
    }
}

/// Restricts the lifetime of the token to `seconds` from now.
pub fn timeout_constraint(seconds: i64) -> TimeoutConstraint {
    TimeoutConstraint::new(seconds)
}

/// Checks `time-before` caveats against the current time.
pub fn timeout_checker() -> Checker {
    Checker::new(conditions::TIME_BEFORE, |condition, argument| {
        check_deadline(condition, argument, Utc::now())
    })
}

/// Checks `time-before` caveats against a fixed point in time.
pub fn timeout_checker_at(now: DateTime<Utc>) -> Checker {
    Checker::new(conditions::TIME_BEFORE, move |condition, argument| {
        check_deadline(condition, argument, now)
    })
}

fn check_deadline(condition: &str, argument: &str, now: DateTime<Utc>) -> Result<(), ConstraintError> {
    let deadline = DateTime::parse_from_rfc3339(argument)
        .map_err(|e| ConstraintError::invalid_caveat(condition, argument, e.to_string()))?
        .with_timezone(&Utc);

    if now >= deadline {
        return Err(ConstraintError::Expired {
            expired_at: deadline.timestamp(),
            current_time: now.timestamp(),
        });
    }
    Ok(())
}
