//! The token primitive consumed by constraints and checkers.
//!
//! Constraints only ever append caveats and verifiers only ever read them, so
//! the trait stays small. Biscuit tokens carry each first-party caveat as an
//! append-only block holding a single `caveat({condition})` fact.

extern crate biscuit_auth as biscuit;

use biscuit::Biscuit;
use biscuit::macros::block;

use crate::error::ConstraintError;

/// A bearer token that can be attenuated with first-party caveats.
///
/// Appending a caveat must never remove or weaken an existing one.
pub trait CaveatToken {
    /// Append an encoded `"<condition> <argument>"` caveat.
    fn add_first_party_caveat(&mut self, caveat: &str) -> Result<(), ConstraintError>;

    /// All first-party caveats in the order they were added.
    fn first_party_caveats(&self) -> Result<Vec<String>, ConstraintError>;
}

impl CaveatToken for Biscuit {
    fn add_first_party_caveat(&mut self, caveat: &str) -> Result<(), ConstraintError> {
        // Block sources print one fact per line; a control character would
        // split the fact and hide the caveat from `first_party_caveats`.
        if caveat.chars().any(char::is_control) {
            return Err(ConstraintError::AttenuationFailed {
                reason: format!("Caveat contains a control character: {caveat:?}"),
            });
        }

        let caveat = caveat.to_string();
        let block_builder = block!(r#"caveat({caveat});"#);

        let attenuated = self
            .append(block_builder)
            .map_err(|e| ConstraintError::AttenuationFailed {
                reason: format!("Failed to append caveat block: {e}"),
            })?;

        *self = attenuated;
        Ok(())
    }

    fn first_party_caveats(&self) -> Result<Vec<String>, ConstraintError> {
        let mut caveats = Vec::new();

        for i in 0..self.block_count() {
            let block_source = self.print_block_source(i)?;
            // Facts print one per line: `caveat("allow read write");`
            for line in block_source.lines() {
                let trimmed = line.trim();
                if !trimmed.starts_with("caveat(") {
                    continue;
                }
                let caveat = trimmed
                    .strip_prefix("caveat(\"")
                    .and_then(|rest| rest.strip_suffix("\");"))
                    .ok_or_else(|| ConstraintError::DeserializationError {
                        reason: format!("Undecodable caveat in block {i}: {trimmed}"),
                    })?;
                caveats.push(caveat.to_string());
            }
        }

        Ok(caveats)
    }
}
