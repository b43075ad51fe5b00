//! Operation allow-list.

use macaroon_constraints_core::{Caveat, CaveatToken, Checker, ConstraintError, conditions};

use crate::attenuate::Constraint;

/// Restricts the token to a fixed set of operation names.
///
/// Encoded as `allow <op1> <op2> ...`. An empty set permits nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowConstraint {
    operations: Vec<String>,
}

impl AllowConstraint {
    pub fn new<I, S>(operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operations: operations.into_iter().map(Into::into).collect(),
        }
    }

    pub fn operations(&self) -> &[String] {
        &self.operations
    }
}

impl Constraint for AllowConstraint {
    fn apply(&self, token: &mut dyn CaveatToken) -> Result<(), ConstraintError> {
        for operation in &self.operations {
            if operation.is_empty() || operation.chars().any(char::is_whitespace) {
                return Err(ConstraintError::InvalidOperation {
                    operation: operation.clone(),
                    reason: "operation names must be non-empty and contain no whitespace"
                        .to_string(),
                });
            }
        }

        let caveat = Caveat::new(conditions::ALLOW, self.operations.join(" "));
        token.add_first_party_caveat(&caveat.to_string())
    }
}

/// Restricts the token to the given operations.
pub fn allow_constraint<I, S>(operations: I) -> AllowConstraint
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    AllowConstraint::new(operations)
}

/// Checks `allow` caveats against the operation being requested.
pub fn allow_checker<S: Into<String>>(operation: S) -> Checker {
    let operation = operation.into();
    Checker::new(conditions::ALLOW, move |_, argument| {
        if argument.split_whitespace().any(|allowed| allowed == operation) {
            return Ok(());
        }
        Err(ConstraintError::OperationNotAllowed {
            operation: operation.clone(),
            allowed: argument.split_whitespace().map(str::to_string).collect(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::add_constraints;
    use biscuit_auth::macros::biscuit;
    use macaroon_constraints_core::{Biscuit, CheckerSet, KeyPair};

    fn root_token() -> Biscuit {
        biscuit!(r#"right("alice", "payments", "send");"#)
            .build(&KeyPair::new())
            .unwrap()
    }

    #[test]
    fn test_allowed_operation_passes() {
        let checker = allow_checker("send");

        assert!(checker.check(conditions::ALLOW, "quote send").is_ok());
        assert!(checker.check(conditions::ALLOW, "send").is_ok());
    }

    #[test]
    fn test_other_operation_is_denied() {
        let err = allow_checker("refund")
            .check(conditions::ALLOW, "quote send")
            .unwrap_err();

        assert!(err.is_unauthorized());
        match err {
            ConstraintError::OperationNotAllowed { operation, allowed } => {
                assert_eq!(operation, "refund");
                assert_eq!(allowed, vec!["quote".to_string(), "send".to_string()]);
            }
            other => panic!("Expected OperationNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_allow_list_permits_nothing() {
        let token = add_constraints(&root_token(), &[&allow_constraint(Vec::<String>::new())])
            .unwrap();

        let checkers = CheckerSet::new().with(allow_checker("send")).unwrap();
        assert_eq!(token.first_party_caveats().unwrap(), vec!["allow ".to_string()]);
        assert!(checkers.verify(&token).is_err());
    }

    #[test]
    fn test_operation_with_whitespace_is_rejected() {
        let result = add_constraints(&root_token(), &[&allow_constraint(["send money"])]);

        assert!(matches!(
            result,
            Err(ConstraintError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_constraint_and_checker_pair() {
        let token = add_constraints(&root_token(), &[&allow_constraint(["send", "quote"])])
            .unwrap();

        let permitted = CheckerSet::new().with(allow_checker("quote")).unwrap();
        let denied = CheckerSet::new().with(allow_checker("refund")).unwrap();
        assert!(permitted.verify(&token).is_ok());
        assert!(denied.verify(&token).is_err());
    }
}
