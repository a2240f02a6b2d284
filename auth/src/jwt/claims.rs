use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::errors::JwtError;

/// Claims carried by a session token.
///
/// Sessions are stateless: nothing here is persisted, and a token is valid
/// for as long as its signature checks out and `exp` lies in the future.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject (user identifier, UUID string form)
    pub sub: String,

    /// Email of the subject at issuance time (informational only)
    #[serde(default)]
    pub email: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Build claims for a user, expiring `ttl` from now.
    pub fn for_user(user_id: Uuid, email: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id.to_string(),
            email: email.into(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Parse the subject as a user identifier.
    ///
    /// # Errors
    /// * `InvalidClaims` - Subject is empty or not a UUID
    pub fn subject_id(&self) -> Result<Uuid, JwtError> {
        if self.sub.is_empty() {
            return Err(JwtError::InvalidClaims("missing subject".to_string()));
        }

        Uuid::parse_str(&self.sub)
            .map_err(|e| JwtError::InvalidClaims(format!("subject is not a UUID: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_user() {
        let user_id = Uuid::new_v4();
        let claims = SessionClaims::for_user(user_id, "a@b.com", Duration::minutes(60));

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.exp - claims.iat, 60 * 60);
        assert_eq!(claims.subject_id(), Ok(user_id));
    }

    #[test]
    fn test_subject_id_rejects_garbage() {
        let mut claims = SessionClaims::for_user(Uuid::new_v4(), "a@b.com", Duration::minutes(1));

        claims.sub = "user123".to_string();
        assert!(claims.subject_id().unwrap_err().is_claims_error());

        claims.sub = String::new();
        assert!(claims.subject_id().unwrap_err().is_claims_error());
    }
}
