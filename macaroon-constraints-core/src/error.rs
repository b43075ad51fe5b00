use thiserror::Error;

/// Broad classification of a [`ConstraintError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input could not be encoded as, or decoded from, a caveat
    Format,
    /// A path index fell outside the path it was evaluated against
    Range,
    /// A caveat was well formed but not satisfied by the request
    Unauthorized,
    /// The token primitive or the checker registry failed
    Token,
}

/// Error type for constraint application and caveat checking
#[derive(Error, Debug, Clone)]
pub enum ConstraintError {
    // ===== Format Errors =====
    /// IP-lock address did not parse as an IPv4 or IPv6 address
    #[error("Incorrect macaroon IP-lock address: '{address}'")]
    InvalidIpAddress { address: String },

    /// Operation name cannot be encoded in an allow caveat
    #[error("Invalid operation name '{operation}': {reason}")]
    InvalidOperation { operation: String, reason: String },

    /// Timeout cannot be turned into a representable deadline
    #[error("Invalid timeout of {seconds} seconds: deadline is out of range")]
    InvalidTimeout { seconds: i64 },

    /// A caveat argument could not be decoded by its checker
    #[error("Malformed '{condition}' caveat argument '{argument}': {reason}")]
    InvalidCaveat {
        condition: String,
        argument: String,
        reason: String,
    },

    /// Path predicate does not match `path[<index>] [not] in {...}`
    #[error("Path constraint syntax error: '{predicate}'")]
    PathSyntax { predicate: String },

    /// Bracketed path index is not an integer
    #[error("Unable to parse path index '{index}'")]
    PathIndex { index: String },

    /// Word before `in` is something other than `not`
    #[error("Incorrect path constraint negation '{negation}'")]
    PathNegation { negation: String },

    // ===== Range Errors =====
    /// Path index lies outside `-len..len`
    #[error("Path constraint index {index} exceeds path length {len}")]
    PathIndexOutOfRange { index: i64, len: usize },

    // ===== Authorization Errors =====
    /// Hop at the constrained index is not allowed by the predicate
    #[error("Path does not satisfy constraint \"{predicate}\"")]
    PathUnsatisfied { predicate: String },

    /// Requested operation is absent from the allow caveat
    #[error("Operation '{operation}' not allowed, allowed operations: [{}]", .allowed.join(", "))]
    OperationNotAllowed {
        operation: String,
        allowed: Vec<String>,
    },

    /// Client address differs from the locked one
    #[error("Macaroon locked to different IP address: expected '{expected}', got '{actual}'")]
    IpMismatch { expected: String, actual: String },

    /// Token deadline has passed
    #[error("Macaroon expired at {expired_at}, current time is {current_time}")]
    Expired {
        /// Deadline encoded in the caveat (Unix timestamp)
        expired_at: i64,
        /// Time the check ran at (Unix timestamp)
        current_time: i64,
    },

    /// No checker is registered for the caveat's condition keyword
    #[error("Caveat not recognized: no checker registered for condition '{condition}'")]
    UnknownCondition { condition: String },

    /// A checker for this condition keyword is already registered
    #[error("Checker already registered for condition '{condition}'")]
    DuplicateChecker { condition: String },

    // ===== Token Errors =====
    /// Token signature verification failed
    #[error("Invalid token signature: {details}")]
    InvalidSignature { details: String },

    /// Token deserialization failed
    #[error("Failed to deserialize token: {reason}")]
    DeserializationError { reason: String },

    /// Token serialization failed
    #[error("Failed to serialize token: {reason}")]
    SerializationError { reason: String },

    /// Appending a caveat to the token failed
    #[error("Token attenuation failed: {reason}")]
    AttenuationFailed { reason: String },

    // ===== Generic Errors =====
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

impl ConstraintError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConstraintError::InvalidIpAddress { .. }
            | ConstraintError::InvalidOperation { .. }
            | ConstraintError::InvalidTimeout { .. }
            | ConstraintError::InvalidCaveat { .. }
            | ConstraintError::PathSyntax { .. }
            | ConstraintError::PathIndex { .. }
            | ConstraintError::PathNegation { .. } => ErrorKind::Format,
            ConstraintError::PathIndexOutOfRange { .. } => ErrorKind::Range,
            ConstraintError::PathUnsatisfied { .. }
            | ConstraintError::OperationNotAllowed { .. }
            | ConstraintError::IpMismatch { .. }
            | ConstraintError::Expired { .. }
            | ConstraintError::UnknownCondition { .. } => ErrorKind::Unauthorized,
            ConstraintError::DuplicateChecker { .. }
            | ConstraintError::InvalidSignature { .. }
            | ConstraintError::DeserializationError { .. }
            | ConstraintError::SerializationError { .. }
            | ConstraintError::AttenuationFailed { .. }
            | ConstraintError::Internal(_)
            | ConstraintError::Generic(_) => ErrorKind::Token,
        }
    }

    // ===== Helper Methods for Common Error Checks =====

    /// Check if this error is a malformed path predicate
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            ConstraintError::PathSyntax { .. }
                | ConstraintError::PathIndex { .. }
                | ConstraintError::PathNegation { .. }
        )
    }

    /// Check if this error is a path index out of bounds
    pub fn is_range_error(&self) -> bool {
        self.kind() == ErrorKind::Range
    }

    /// Check if this error is a caveat that was not satisfied
    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }

    /// Check if this error is due to token expiration
    pub fn is_expired(&self) -> bool {
        matches!(self, ConstraintError::Expired { .. })
    }

    /// Get the expiration time if this is an expiration error
    pub fn get_expiration_time(&self) -> Option<i64> {
        match self {
            ConstraintError::Expired { expired_at, .. } => Some(*expired_at),
            _ => None,
        }
    }

    // ===== Constructor Helper Methods =====

    /// Create a generic error
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        ConstraintError::Generic(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        ConstraintError::Internal(msg.into())
    }

    /// Create an error for a caveat argument its checker cannot decode
    pub fn invalid_caveat<C, A, R>(condition: C, argument: A, reason: R) -> Self
    where
        C: Into<String>,
        A: Into<String>,
        R: Into<String>,
    {
        ConstraintError::InvalidCaveat {
            condition: condition.into(),
            argument: argument.into(),
            reason: reason.into(),
        }
    }
}

// ===== Conversions from biscuit-auth errors =====

impl From<biscuit_auth::error::Token> for ConstraintError {
    fn from(err: biscuit_auth::error::Token) -> Self {
        use biscuit_auth::error::{Format, Token};

        match err {
            Token::Format(format_err) => match format_err {
                Format::Signature(sig_err) => ConstraintError::InvalidSignature {
                    details: sig_err.to_string(),
                },
                Format::DeserializationError(msg) | Format::BlockDeserializationError(msg) => {
                    ConstraintError::DeserializationError { reason: msg }
                }
                Format::SerializationError(msg) | Format::BlockSerializationError(msg) => {
                    ConstraintError::SerializationError { reason: msg }
                }
                other => ConstraintError::Generic(other.to_string()),
            },
            Token::Base64(base64_err) => ConstraintError::DeserializationError {
                reason: base64_err.to_string(),
            },
            Token::AppendOnSealed => ConstraintError::AttenuationFailed {
                reason: "token is sealed".to_string(),
            },
            other => ConstraintError::Generic(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_errors_are_syntax_errors() {
        let errors = [
            ConstraintError::PathSyntax {
                predicate: "path[0] in x".to_string(),
            },
            ConstraintError::PathIndex {
                index: "abc".to_string(),
            },
            ConstraintError::PathNegation {
                negation: "nto".to_string(),
            },
        ];

        for error in errors {
            assert!(error.is_syntax_error(), "{error} should be a syntax error");
            assert_eq!(error.kind(), ErrorKind::Format);
        }
    }

    #[test]
    fn test_range_error_is_not_syntax_error() {
        let error = ConstraintError::PathIndexOutOfRange { index: 2, len: 2 };

        assert!(error.is_range_error());
        assert!(!error.is_syntax_error());
        assert!(!error.is_unauthorized());
        assert_eq!(
            error.to_string(),
            "Path constraint index 2 exceeds path length 2"
        );
    }

    #[test]
    fn test_expired_helpers() {
        let error = ConstraintError::Expired {
            expired_at: 1735689600,
            current_time: 1735689700,
        };

        assert!(error.is_expired());
        assert!(error.is_unauthorized());
        assert_eq!(error.get_expiration_time(), Some(1735689600));
        assert_eq!(
            ConstraintError::generic("boom").get_expiration_time(),
            None
        );
    }

    #[test]
    fn test_malformed_token_maps_to_deserialization_error() {
        let keypair = crate::KeyPair::new();

        for token in ["not base64 at all!", "AAAA"] {
            let err: ConstraintError = crate::Biscuit::from_base64(token, keypair.public())
                .unwrap_err()
                .into();
            assert!(
                matches!(err, ConstraintError::DeserializationError { .. }),
                "{token:?} gave {err:?}"
            );
            assert_eq!(err.kind(), ErrorKind::Token);
        }
    }

    #[test]
    fn test_foreign_root_key_maps_to_invalid_signature() {
        let issuer = crate::KeyPair::new();
        let stranger = crate::KeyPair::new();
        let token = biscuit_auth::macros::biscuit!(r#"right("alice", "payments", "send");"#)
            .build(&issuer)
            .unwrap()
            .to_base64()
            .unwrap();

        let err: ConstraintError = crate::Biscuit::from_base64(&token, stranger.public())
            .unwrap_err()
            .into();
        assert!(matches!(err, ConstraintError::InvalidSignature { .. }));
    }

    #[test]
    fn test_operation_not_allowed_message() {
        let error = ConstraintError::OperationNotAllowed {
            operation: "write".to_string(),
            allowed: vec!["read".to_string(), "list".to_string()],
        };

        assert_eq!(
            error.to_string(),
            "Operation 'write' not allowed, allowed operations: [read, list]"
        );
    }
}
