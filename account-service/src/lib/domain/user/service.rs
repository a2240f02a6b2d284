use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;
use chrono::Utc;

use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserWithToken;
use crate::user::errors::UserError;
use crate::user::ports::AccountServicePort;
use crate::user::ports::UserRepository;

/// Domain service implementation for account operations.
///
/// Holds no mutable state of its own; the repository is the sole arbiter of
/// consistency (uniqueness, affected-row counts).
pub struct AccountService<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
}

impl<UR> AccountService<UR>
where
    UR: UserRepository,
{
    /// Create a new account service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `authenticator` - Password hashing and session token issuance
    pub fn new(repository: Arc<UR>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    fn issue_token(&self, user: &User) -> Result<String, UserError> {
        self.authenticator
            .issue_token(user.id.0, user.email.as_str())
            .map_err(|e| UserError::Token(e.to_string()))
    }
}

#[async_trait]
impl<UR> AccountServicePort for AccountService<UR>
where
    UR: UserRepository,
{
    async fn register(&self, command: RegisterUserCommand) -> Result<UserWithToken, UserError> {
        // Fast path only: the unique constraint in the store is authoritative.
        if self
            .repository
            .find_by_email(&command.email)
            .await?
            .is_some()
        {
            return Err(UserError::EmailAlreadyExists(command.email.to_string()));
        }

        let password_hash = self
            .authenticator
            .hash_password(command.password.expose())
            .map_err(|e| UserError::Hashing(e.to_string()))?;

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            first_name: command.first_name,
            last_name: command.last_name,
            email: command.email,
            password_hash,
            avatar: command.avatar,
            country: command.country,
            created_at: now,
            updated_at: now,
            login_date: now,
        };

        let created_user = self.repository.create(user).await?;
        let token = self.issue_token(&created_user)?;

        tracing::info!(user_id = %created_user.id, "Account registered");

        Ok(UserWithToken {
            user: created_user.sanitized(),
            token,
        })
    }

    async fn login(&self, command: LoginCommand) -> Result<UserWithToken, UserError> {
        let mut user = self
            .repository
            .find_by_email(&command.email)
            .await?
            .ok_or_else(|| UserError::NotFoundByEmail(command.email.to_string()))?;

        let result = self
            .authenticator
            .authenticate(
                &command.password,
                &user.password_hash,
                user.id.0,
                user.email.as_str(),
            )
            .map_err(|e| match e {
                AuthenticationError::InvalidCredentials => UserError::InvalidCredentials,
                AuthenticationError::PasswordError(err) => UserError::Hashing(err.to_string()),
                AuthenticationError::JwtError(err) => UserError::Token(err.to_string()),
            })?;

        let now = Utc::now();
        self.repository.record_login(&user.id, now).await?;
        user.login_date = now;

        tracing::info!(user_id = %user.id, "Login succeeded");

        Ok(UserWithToken {
            user: user.sanitized(),
            token: result.access_token,
        })
    }

    async fn get_user(&self, id: &UserId) -> Result<User, UserError> {
        self.repository
            .find_by_id(id)
            .await?
            .map(User::sanitized)
            .ok_or(UserError::NotFound(id.to_string()))
    }

    async fn update_user(
        &self,
        id: &UserId,
        command: UpdateUserCommand,
    ) -> Result<User, UserError> {
        let updated_user = self.repository.update(id, command, Utc::now()).await?;

        Ok(updated_user.sanitized())
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), UserError> {
        self.repository.delete(id).await?;

        tracing::info!(user_id = %id, "Account deleted");

        Ok(())
    }
}
