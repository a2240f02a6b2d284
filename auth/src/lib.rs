//! Authentication utilities library
//!
//! Provides the credential and session primitives used by the account service:
//! - Password hashing (Argon2id)
//! - Session token issuance and verification (HS256 JWT)
//! - Authentication coordination
//!
//! The service defines its own domain errors and adapts these implementations
//! behind its use-case layer.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).is_ok());
//! assert!(hasher.verify("other_password", &hash).is_err());
//! ```
//!
//! ## Session Tokens
//! ```
//! use auth::TokenCodec;
//! use chrono::Duration;
//! use uuid::Uuid;
//!
//! let codec = TokenCodec::new(b"secret_key_at_least_32_bytes_long!");
//! let user_id = Uuid::new_v4();
//! let token = codec.issue(user_id, "alice@example.com", Duration::minutes(60)).unwrap();
//! let claims = codec.verify(&token).unwrap();
//! assert_eq!(claims.subject_id().unwrap(), user_id);
//! ```
//!
//! ## Complete Authentication Flow
//! ```
//! use auth::Authenticator;
//! use chrono::Duration;
//! use uuid::Uuid;
//!
//! let auth = Authenticator::new(b"secret_key_at_least_32_bytes_long!", Duration::minutes(60));
//!
//! // Register: hash password
//! let hash = auth.hash_password("password123").unwrap();
//!
//! // Login: verify and issue token
//! let user_id = Uuid::new_v4();
//! let result = auth.authenticate("password123", &hash, user_id, "alice@example.com").unwrap();
//!
//! // Validate token
//! let claims = auth.validate_token(&result.access_token).unwrap();
//! assert_eq!(claims.sub, user_id.to_string());
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::AuthenticationResult;
pub use authenticator::Authenticator;
pub use jwt::JwtError;
pub use jwt::SessionClaims;
pub use jwt::TokenCodec;
pub use password::PasswordError;
pub use password::PasswordHasher;
