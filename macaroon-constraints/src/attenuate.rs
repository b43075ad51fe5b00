extern crate biscuit_auth as biscuit;

use macaroon_constraints_core::{Biscuit, CaveatToken, ConstraintError, PublicKey};
use tracing::{debug, info};

use crate::allow::AllowConstraint;
use crate::ip_lock::IpLockConstraint;
use crate::payment_path::PaymentPathConstraint;
use crate::timeout::TimeoutConstraint;

/// A single attenuation step: appends at most one caveat to a token.
///
/// Closures taking `&mut dyn CaveatToken` implement this trait, so ad-hoc
/// constraints can be mixed with the built-in ones.
pub trait Constraint {
    fn apply(&self, token: &mut dyn CaveatToken) -> Result<(), ConstraintError>;
}

impl<F> Constraint for F
where
    F: Fn(&mut dyn CaveatToken) -> Result<(), ConstraintError>,
{
    fn apply(&self, token: &mut dyn CaveatToken) -> Result<(), ConstraintError> {
        self(token)
    }
}

/// Returns a new token derived from a clone of `token` with every constraint
/// applied in order.
///
/// The first failing constraint aborts the whole derivation and its error is
/// returned; `token` itself is never modified.
pub fn add_constraints<T>(token: &T, constraints: &[&dyn Constraint]) -> Result<T, ConstraintError>
where
    T: CaveatToken + Clone,
{
    let mut derived = token.clone();
    for constraint in constraints {
        constraint.apply(&mut derived)?;
    }
    Ok(derived)
}

/// Builder for attenuating a token with several constraints at once.
///
/// # Example
/// ```rust,no_run
/// use macaroon_constraints::ConstraintBuilder;
/// use macaroon_constraints_core::PublicKey;
///
/// # fn example(token: String, public_key: PublicKey) -> Result<(), Box<dyn std::error::Error>> {
/// let attenuated = ConstraintBuilder::from_base64(token, public_key)?
///     .allow(["send", "quote"])
///     .timeout(600)
///     .ip_lock("203.0.113.7")
///     .payment_path("path[-1] in {02a1f3, 03bb7e}")
///     .attenuate_base64()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ConstraintBuilder {
    token: Option<Biscuit>,
    constraints: Vec<Box<dyn Constraint>>,
}

impl ConstraintBuilder {
    /// Create a builder with no constraints and no token attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for a base64-encoded biscuit token.
    ///
    /// # Arguments
    /// * `token` - The base64-encoded token string
    /// * `public_key` - The root public key the token was signed with
    pub fn from_base64(token: String, public_key: PublicKey) -> Result<Self, ConstraintError> {
        let biscuit = Biscuit::from_base64(&token, public_key)?;
        Ok(Self {
            token: Some(biscuit),
            constraints: Vec::new(),
        })
    }

    /// Restrict the token to the given operations.
    pub fn allow<I, S>(self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraint(AllowConstraint::new(operations))
    }

    /// Expire the token `seconds` from now.
    pub fn timeout(self, seconds: i64) -> Self {
        self.constraint(TimeoutConstraint::new(seconds))
    }

    /// Lock the token to a client address. An empty address adds nothing.
    pub fn ip_lock<S: Into<String>>(self, address: S) -> Self {
        self.constraint(IpLockConstraint::new(address))
    }

    /// Restrict the payment path. An empty predicate adds nothing.
    pub fn payment_path<S: Into<String>>(self, predicate: S) -> Self {
        self.constraint(PaymentPathConstraint::new(predicate))
    }

    /// Append an arbitrary constraint.
    pub fn constraint<C: Constraint + 'static>(mut self, constraint: C) -> Self {
        self.constraints.push(Box::new(constraint));
        self
    }

    /// Apply the accumulated constraints to a clone of `token`.
    pub fn apply<T: CaveatToken + Clone>(&self, token: &T) -> Result<T, ConstraintError> {
        let constraints: Vec<&dyn Constraint> = self.constraints.iter().map(|c| &**c).collect();
        let attenuated = add_constraints(token, &constraints)?;
        debug!(
            constraints = constraints.len(),
            caveats = attenuated.first_party_caveats()?.len(),
            "applied constraints"
        );
        Ok(attenuated)
    }

    /// Attenuate the token attached by [`ConstraintBuilder::from_base64`].
    pub fn attenuate(self) -> Result<Biscuit, ConstraintError> {
        let token = self.token.as_ref().ok_or_else(|| {
            ConstraintError::internal("No token attached to constraint builder")
        })?;
        let attenuated = self.apply(token)?;
        info!("biscuit (attenuated): {}", attenuated);
        Ok(attenuated)
    }

    /// Attenuate the attached token and return it as a base64-encoded string.
    pub fn attenuate_base64(self) -> Result<String, ConstraintError> {
        let attenuated = self.attenuate()?;
        Ok(attenuated.to_base64()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biscuit::macros::biscuit;
    use macaroon_constraints_core::{KeyPair, conditions};

    fn root_token(keypair: &KeyPair) -> Biscuit {
        biscuit!(
            r#"
                right("alice", "payments", "send");
            "#
        )
        .build(keypair)
        .unwrap()
    }

    fn caveat_count(token: &Biscuit) -> usize {
        token.first_party_caveats().unwrap().len()
    }

    #[test]
    fn test_add_constraints_appends_in_order() {
        let keypair = KeyPair::new();
        let token = root_token(&keypair);

        let allow = AllowConstraint::new(["send"]);
        let path = PaymentPathConstraint::new("path[0] in {n1}");
        let attenuated = add_constraints(&token, &[&allow, &path]).unwrap();

        assert_eq!(
            attenuated.first_party_caveats().unwrap(),
            vec![
                "allow send".to_string(),
                "payment-path-constraint path[0] in {n1}".to_string(),
            ]
        );
        assert_eq!(caveat_count(&token), 0);
    }

    #[test]
    fn test_failing_constraint_aborts_and_leaves_original() {
        let keypair = KeyPair::new();
        let mut token = root_token(&keypair);
        token.add_first_party_caveat("allow send").unwrap();
        let before = caveat_count(&token);

        let allow = AllowConstraint::new(["send"]);
        let bad_ip = IpLockConstraint::new("not-an-ip");
        let result = add_constraints(&token, &[&allow, &bad_ip]);

        assert!(matches!(
            result,
            Err(ConstraintError::InvalidIpAddress { .. })
        ));
        assert_eq!(caveat_count(&token), before);
    }

    #[test]
    fn test_no_op_constraints_add_nothing() {
        let keypair = KeyPair::new();
        let token = root_token(&keypair);

        let attenuated = ConstraintBuilder::new()
            .ip_lock("")
            .payment_path("")
            .apply(&token)
            .unwrap();

        assert_eq!(caveat_count(&attenuated), 0);
        assert_eq!(attenuated.block_count(), token.block_count());
    }

    #[test]
    fn test_closure_constraint() {
        let keypair = KeyPair::new();
        let token = root_token(&keypair);

        let custom = |token: &mut dyn CaveatToken| token.add_first_party_caveat("color blue");
        let attenuated = add_constraints(&token, &[&custom]).unwrap();

        assert_eq!(
            attenuated.first_party_caveats().unwrap(),
            vec!["color blue".to_string()]
        );
    }

    #[test]
    fn test_builder_base64_round_trip() {
        let keypair = KeyPair::new();
        let token = root_token(&keypair).to_base64().unwrap();

        let attenuated = ConstraintBuilder::from_base64(token, keypair.public())
            .unwrap()
            .allow(["send", "quote"])
            .timeout(60)
            .ip_lock("192.0.2.1")
            .payment_path("path[-1] not in {evil}")
            .attenuate_base64()
            .unwrap();

        let decoded = Biscuit::from_base64(&attenuated, keypair.public()).unwrap();
        let caveats = decoded.first_party_caveats().unwrap();
        assert_eq!(caveats.len(), 4);
        assert_eq!(caveats[0], "allow send quote");
        assert!(caveats[1].starts_with(conditions::TIME_BEFORE));
        assert_eq!(caveats[2], "client-ip-addr 192.0.2.1");
        assert_eq!(caveats[3], "payment-path-constraint path[-1] not in {evil}");
    }

    #[test]
    fn test_builder_rejects_malformed_token() {
        let keypair = KeyPair::new();

        let result = ConstraintBuilder::from_base64("garbage".to_string(), keypair.public());
        assert!(matches!(
            result,
            Err(ConstraintError::DeserializationError { .. })
        ));
    }

    #[test]
    fn test_builder_without_token_fails() {
        let result = ConstraintBuilder::new().allow(["send"]).attenuate();

        assert!(matches!(result, Err(ConstraintError::Internal(_))));
    }
}
