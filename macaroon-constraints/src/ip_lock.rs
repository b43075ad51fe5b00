//! Client address lock.

use std::net::IpAddr;

use macaroon_constraints_core::{Caveat, CaveatToken, Checker, ConstraintError, conditions};

use crate::attenuate::Constraint;

/// Locks the token to a single client IP address.
///
/// An empty address means no lock was requested and appends nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpLockConstraint {
    address: String,
}

impl IpLockConstraint {
    pub fn new<S: Into<String>>(address: S) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl Constraint for IpLockConstraint {
    fn apply(&self, token: &mut dyn CaveatToken) -> Result<(), ConstraintError> {
        if self.address.is_empty() {
            return Ok(());
        }

        let address: IpAddr =
            self.address
                .parse()
                .map_err(|_| ConstraintError::InvalidIpAddress {
                    address: self.address.clone(),
                })?;

        let caveat = Caveat::new(conditions::CLIENT_IP_ADDR, address.to_string());
        token.add_first_party_caveat(&caveat.to_string())
    }
}

/// Locks the token to `address`.
pub fn ip_lock_constraint<S: Into<String>>(address: S) -> IpLockConstraint {
    IpLockConstraint::new(address)
}

/// Checks `client-ip-addr` caveats against the address of the client.
///
/// Addresses are compared parsed, so an IPv4 address and its IPv4-mapped
/// IPv6 form match.
pub fn ip_lock_checker<S: Into<String>>(client_ip: S) -> Checker {
    let client_ip = client_ip.into();
    Checker::new(conditions::CLIENT_IP_ADDR, move |condition, argument| {
        let locked: IpAddr = argument
            .parse()
            .map_err(|_| ConstraintError::invalid_caveat(condition, argument, "not an IP address"))?;

        let matches = client_ip
            .parse::<IpAddr>()
            .is_ok_and(|client| client.to_canonical() == locked.to_canonical());

        if !matches {
            return Err(ConstraintError::IpMismatch {
                expected: argument.to_string(),
                actual: client_ip.clone(),
            });
        }
        Ok(())
    })
}
