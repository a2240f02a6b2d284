use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::user::models::Country;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PersonName;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, avatar, country, \
                            created_at, updated_at, login_date";

/// PostgreSQL implementation of UserRepository.
///
/// Email uniqueness is enforced by the `users_email_key` constraint; a
/// violation surfaces as `EmailAlreadyExists`.
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Create a new PostgreSQL user repository.
    ///
    /// # Arguments
    /// * `pool` - PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    avatar: Option<Vec<u8>>,
    country: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    login_date: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = UserError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(row.id),
            first_name: PersonName::new(row.first_name)?,
            last_name: PersonName::new(row.last_name)?,
            email: EmailAddress::new(row.email)?,
            password_hash: row.password_hash,
            avatar: row.avatar,
            country: row.country.map(Country::new).transpose()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            login_date: row.login_date,
        })
    }
}

fn database_error(operation: &str, err: sqlx::Error) -> UserError {
    UserError::DatabaseError(format!("users.{}: {}", operation, err))
}

fn write_error(operation: &str, email: Option<&EmailAddress>, err: sqlx::Error) -> UserError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
            let email = email.map(EmailAddress::as_str).unwrap_or_default();
            return UserError::EmailAlreadyExists(email.to_string());
        }
    }
    database_error(operation, err)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password_hash, avatar, country,
                               created_at, updated_at, login_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id.0)
        .bind(user.first_name.as_str())
        .bind(user.last_name.as_str())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.avatar.as_deref())
        .bind(user.country.as_ref().map(Country::as_str))
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.login_date)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("create", Some(&user.email), e))?;

        tracing::debug!(user_id = %user.id, "User row inserted");
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find_by_id", e))?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find_by_email", e))?;

        row.map(User::try_from).transpose()
    }

    async fn update(
        &self,
        id: &UserId,
        changes: UpdateUserCommand,
        at: DateTime<Utc>,
    ) -> Result<User, UserError> {
        // NULL parameters keep the stored column value.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                avatar = COALESCE($5, avatar),
                country = COALESCE($6, country),
                updated_at = $7
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id.0)
        .bind(changes.first_name.as_ref().map(PersonName::as_str))
        .bind(changes.last_name.as_ref().map(PersonName::as_str))
        .bind(changes.email.as_ref().map(EmailAddress::as_str))
        .bind(changes.avatar.as_deref())
        .bind(changes.country.as_ref().map(Country::as_str))
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error("update", changes.email.as_ref(), e))?
        .ok_or_else(|| UserError::NotFound(id.to_string()))?;

        User::try_from(row)
    }

    async fn record_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), UserError> {
        let result = sqlx::query("UPDATE users SET login_date = $2 WHERE id = $1")
            .bind(id.0)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("record_login", e))?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn delete(&self, id: &UserId) -> Result<(), UserError> {
        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound(id.to_string()));
        }

        Ok(())
    }
}
