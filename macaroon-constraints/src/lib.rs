//! # Macaroon Constraints
//!
//! Attenuating constraints for macaroon-style bearer tokens, each paired with
//! the checker that verifies it.
//!
//! A constraint appends one first-party caveat to a token. Constraints are
//! applied to a clone of the token, so the original stays usable, and the
//! first one that fails aborts the whole attenuation. On the verifying side,
//! every caveat is dispatched by its condition keyword to a checker that
//! closes over the request: the operation, the client address, the payment
//! path and the current time.
//!
//! | constraint | checker | caveat |
//! |---|---|---|
//! | [`allow_constraint`] | [`allow_checker`] | `allow send quote` |
//! | [`timeout_constraint`] | [`timeout_checker`] | `time-before 2030-01-01T00:00:00.000000000Z` |
//! | [`ip_lock_constraint`] | [`ip_lock_checker`] | `client-ip-addr 203.0.113.9` |
//! | [`payment_path_constraint`] | [`payment_path_checker`] | `payment-path-constraint path[-1] in {n1, n2}` |
//!
//! ## Payment path predicates
//!
//! ```text
//! path[<index>] [not] in {<node>, <node>, ...}
//! ```
//!
//! The predicate is stored verbatim and re-parsed on every check against the
//! path the payment actually takes. See [`PathConstraint`].

mod allow;
pub(crate) mod attenuate;
mod ip_lock;
mod payment_path;
mod timeout;
pub(crate) mod verify;

pub use allow::{AllowConstraint, allow_checker, allow_constraint};
pub use attenuate::{Constraint, ConstraintBuilder, add_constraints};
pub use ip_lock::{IpLockConstraint, ip_lock_checker, ip_lock_constraint};
pub use payment_path::{
    PathConstraint, PaymentPathConstraint, check_payment_path, payment_path_checker,
    payment_path_constraint,
};
pub use timeout::{TimeoutConstraint, timeout_checker, timeout_checker_at, timeout_constraint};
pub use verify::{ConstraintVerifier, verify_token_local};

// Re-export commonly needed types from core
pub use macaroon_constraints_core::{
    Biscuit, Caveat, CaveatToken, Checker, CheckerSet, ConstraintError, ErrorKind, KeyPair,
    PublicKey, TokenTimeConfig, conditions,
};
