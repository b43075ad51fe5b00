//! # Macaroon Constraints Core
//!
//! Core types shared by macaroon constraints and their checkers.
//!
//! This crate provides:
//!
//! - First-party caveat encoding and the condition keywords
//! - The [`CaveatToken`] trait and its Biscuit implementation
//! - [`Checker`] values and the [`CheckerSet`] registry
//! - Time configuration for token deadlines
//! - The common error type
//! - Biscuit type re-exports

pub mod caveat;
pub mod checker;
pub mod error;
pub mod time;
pub mod token;

pub use caveat::{Caveat, conditions};
pub use checker::{Checker, CheckerSet};
pub use error::{ConstraintError, ErrorKind};
pub use time::TokenTimeConfig;
pub use token::CaveatToken;

// Re-export biscuit types that are needed for public API
pub use biscuit_auth::{Biscuit, KeyPair, PublicKey};
