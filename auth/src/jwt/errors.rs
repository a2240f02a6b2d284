use thiserror::Error;

/// Error type for JWT operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Signing secret is empty")]
    EmptySecret,

    #[error("Failed to sign token: {0}")]
    SigningFailed(String),

    #[error("Token is expired")]
    TokenExpired,

    #[error("Token is invalid: {0}")]
    InvalidToken(String),

    #[error("Token claims are invalid: {0}")]
    InvalidClaims(String),
}

impl JwtError {
    /// True for failures raised while producing a token.
    pub fn is_signing_error(&self) -> bool {
        matches!(self, JwtError::EmptySecret | JwtError::SigningFailed(_))
    }

    /// True when the token verified but its payload had the wrong shape.
    pub fn is_claims_error(&self) -> bool {
        matches!(self, JwtError::InvalidClaims(_))
    }
}
