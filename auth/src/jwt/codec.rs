use chrono::Duration;
use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use uuid::Uuid;

use super::claims::SessionClaims;
use super::errors::JwtError;

/// Session token codec.
///
/// Signs and verifies [`SessionClaims`] with a symmetric secret using HS256
/// (HMAC with SHA-256). Tokens advertising any other algorithm are rejected
/// before signature verification is attempted.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    has_secret: bool,
}

impl TokenCodec {
    /// Create a new codec with a secret key.
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Store secrets in environment variables or secure vaults, never in code
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            has_secret: !secret.is_empty(),
        }
    }

    /// Issue a token for a user, valid for `ttl` from now.
    ///
    /// # Errors
    /// * `EmptySecret` - Codec was built without a secret
    /// * `SigningFailed` - Token encoding failed
    pub fn issue(&self, subject: Uuid, email: &str, ttl: Duration) -> Result<String, JwtError> {
        self.encode(&SessionClaims::for_user(subject, email, ttl))
    }

    /// Sign pre-built claims.
    ///
    /// # Errors
    /// * `EmptySecret` - Codec was built without a secret
    /// * `SigningFailed` - Token encoding failed
    pub fn encode(&self, claims: &SessionClaims) -> Result<String, JwtError> {
        if !self.has_secret {
            return Err(JwtError::EmptySecret);
        }

        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| JwtError::SigningFailed(e.to_string()))
    }

    /// Verify a token and return its claims.
    ///
    /// Expiry is checked with zero leeway. The subject must be present and
    /// parse as a UUID.
    ///
    /// # Errors
    /// * `TokenExpired` - `exp` is in the past
    /// * `InvalidToken` - Token is malformed, uses another algorithm, or its
    ///   signature does not verify
    /// * `InvalidClaims` - Payload is missing required claims or has the
    ///   wrong shape
    pub fn verify(&self, token: &str) -> Result<SessionClaims, JwtError> {
        if !self.has_secret {
            return Err(JwtError::InvalidToken("no verification secret".to_string()));
        }

        let header = decode_header(token).map_err(|e| JwtError::InvalidToken(e.to_string()))?;
        if header.alg != self.algorithm {
            return Err(JwtError::InvalidToken(format!(
                "unexpected signing algorithm {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data =
            decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                    ErrorKind::MissingRequiredClaim(claim) => {
                        JwtError::InvalidClaims(format!("missing required claim: {}", claim))
                    }
                    ErrorKind::Json(_) => JwtError::InvalidClaims(e.to_string()),
                    _ => JwtError::InvalidToken(e.to_string()),
                }
            })?;

        token_data.claims.subject_id()?;

        Ok(token_data.claims)
    }
}
