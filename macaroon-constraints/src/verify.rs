extern crate biscuit_auth as biscuit;

use chrono::{DateTime, Utc};
use macaroon_constraints_core::{
    Biscuit, CaveatToken, Checker, CheckerSet, ConstraintError, PublicKey,
};
use tracing::{debug, info};

use crate::allow::allow_checker;
use crate::ip_lock::ip_lock_checker;
use crate::payment_path::payment_path_checker;
use crate::timeout::{timeout_checker, timeout_checker_at};

/// Builder for verifying a token's first-party caveats against a request.
///
/// The timeout checker is always registered. The operation, client address
/// and payment path checkers are only registered when that part of the
/// request is supplied, so a token carrying such a caveat fails verification
/// if the context it needs is missing.
///
/// # Example
/// ```no_run
/// use macaroon_constraints::{ConstraintBuilder, ConstraintVerifier};
/// use macaroon_constraints_core::{Biscuit, KeyPair};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let keypair = KeyPair::new();
/// let root = Biscuit::builder().build(&keypair)?;
///
/// let token = ConstraintBuilder::new()
///     .allow(["send"])
///     .payment_path("path[-1] in {bob}")
///     .apply(&root)?;
///
/// ConstraintVerifier::new(&token)
///     .with_operation("send")
///     .with_payment_path(["alice", "hub", "bob"])
///     .verify()?;
/// # Ok(())
/// # }
/// ```
pub struct ConstraintVerifier<'a, T: CaveatToken + ?Sized> {
    token: &'a T,
    operation: Option<String>,
    client_ip: Option<String>,
    payment_path: Option<Vec<String>>,
    now: Option<DateTime<Utc>>,
    checkers: Vec<Checker>,
}

impl<'a, T: CaveatToken + ?Sized> ConstraintVerifier<'a, T> {
    /// Creates a new verifier for `token`.
    pub fn new(token: &'a T) -> Self {
        Self {
            token,
            operation: None,
            client_ip: None,
            payment_path: None,
            now: None,
            checkers: Vec::new(),
        }
    }

    /// Sets the operation being requested, enabling `allow` caveats.
    pub fn with_operation<S: Into<String>>(mut self, operation: S) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Sets the client address, enabling `client-ip-addr` caveats.
    pub fn with_client_ip<S: Into<String>>(mut self, client_ip: S) -> Self {
        self.client_ip = Some(client_ip.into());
        self
    }

    /// Sets the path the payment traverses, enabling payment path caveats.
    ///
    /// # Arguments
    /// * `path` - Node identifiers of every hop, in route order
    pub fn with_payment_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.payment_path = Some(path.into_iter().map(Into::into).collect());
        self
    }

    /// Checks deadlines against `now` instead of the current time.
    pub fn with_time(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Registers an additional checker for a custom condition.
    pub fn with_checker(mut self, checker: Checker) -> Self {
        self.checkers.push(checker);
        self
    }

    /// Builds the checker registry for the configured request.
    pub fn checkers(&self) -> Result<CheckerSet, ConstraintError> {
        let mut checkers = CheckerSet::new();

        match self.now {
            Some(now) => checkers.register(timeout_checker_at(now))?,
            None => checkers.register(timeout_checker())?,
        }

        if let Some(ref operation) = self.operation {
            checkers.register(allow_checker(operation.clone()))?;
        }

        if let Some(ref client_ip) = self.client_ip {
            checkers.register(ip_lock_checker(client_ip.clone()))?;
        }

        if let Some(ref path) = self.payment_path {
            checkers.register(payment_path_checker(path.clone()))?;
        }

        for checker in &self.checkers {
            checkers.register(checker.clone())?;
        }

        Ok(checkers)
    }

    /// Performs the verification with the configured request.
    ///
    /// # Returns
    /// * `Ok(())` - If every caveat on the token is satisfied
    /// * `Err(ConstraintError)` - The first caveat that failed, or a setup error
    pub fn verify(self) -> Result<(), ConstraintError> {
        let checkers = self.checkers()?;
        debug!(
            operation = self.operation.as_deref().unwrap_or("<none>"),
            client_ip = self.client_ip.as_deref().unwrap_or("<none>"),
            checkers = checkers.len(),
            "verifying token caveats"
        );

        checkers.verify(self.token)
    }
}

/// Verifies the caveats of a base64-encoded biscuit token against a request.
///
/// # Arguments
/// * `token` - The base64-encoded token
/// * `public_key` - The root public key the token was signed with
/// * `operation` - The operation being requested
/// * `client_ip` - The address of the client presenting the token
/// * `payment_path` - Node identifiers of every hop, in route order
pub fn verify_token_local(
    token: &str,
    public_key: PublicKey,
    operation: &str,
    client_ip: &str,
    payment_path: &[String],
) -> Result<(), ConstraintError> {
    let biscuit = Biscuit::from_base64(token, public_key)?;

    ConstraintVerifier::new(&biscuit)
        .with_operation(operation)
        .with_client_ip(client_ip)
        .with_payment_path(payment_path.iter().cloned())
        .verify()?;

    info!(operation, client_ip, "token caveats verified");
    Ok(())
}
