use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;

use account_service::config::ServerConfig;
use account_service::domain::user::models::EmailAddress;
use account_service::domain::user::models::UpdateUserCommand;
use account_service::domain::user::models::User;
use account_service::domain::user::models::UserId;
use account_service::domain::user::ports::UserRepository;
use account_service::domain::user::service::AccountService;
use account_service::inbound::http::router::create_router;
use account_service::inbound::http::router::AppState;
use account_service::user::errors::UserError;
use async_trait::async_trait;
use auth::Authenticator;
use auth::PasswordHasher;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde_json::json;
use serde_json::Value;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// In-memory user store with the same uniqueness rule as the `users` table.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    fn email_taken(users: &HashMap<UserId, User>, email: &EmailAddress, except: UserId) -> bool {
        users
            .values()
            .any(|user| user.id != except && &user.email == email)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        let mut users = self.users.lock().unwrap();
        if Self::email_taken(&users, &user.email, user.id) {
            return Err(UserError::EmailAlreadyExists(user.email.to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|user| &user.email == email)
            .cloned())
    }

    async fn update(
        &self,
        id: &UserId,
        changes: UpdateUserCommand,
        at: DateTime<Utc>,
    ) -> Result<User, UserError> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &changes.email {
            if Self::email_taken(&users, email, *id) {
                return Err(UserError::EmailAlreadyExists(email.to_string()));
            }
        }
        let user = users
            .get_mut(id)
            .ok_or_else(|| UserError::NotFound(id.to_string()))?;
        user.apply(changes, at);
        Ok(user.clone())
    }

    async fn record_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), UserError> {
        match self.users.lock().unwrap().get_mut(id) {
            Some(user) => {
                user.login_date = at;
                Ok(())
            }
            None => Err(UserError::NotFound(id.to_string())),
        }
    }

    async fn delete(&self, id: &UserId) -> Result<(), UserError> {
        self.users
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or(UserError::NotFound(id.to_string()))
    }
}

/// User store whose every operation fails like an unreachable database.
pub struct UnavailableUserRepository;

impl UnavailableUserRepository {
    pub const DETAIL: &'static str = "connection to 10.0.0.5:5432 refused";

    fn error(operation: &str) -> UserError {
        UserError::DatabaseError(format!("users.{}: {}", operation, Self::DETAIL))
    }
}

#[async_trait]
impl UserRepository for UnavailableUserRepository {
    async fn create(&self, _user: User) -> Result<User, UserError> {
        Err(Self::error("create"))
    }

    async fn find_by_id(&self, _id: &UserId) -> Result<Option<User>, UserError> {
        Err(Self::error("find_by_id"))
    }

    async fn find_by_email(&self, _email: &EmailAddress) -> Result<Option<User>, UserError> {
        Err(Self::error("find_by_email"))
    }

    async fn update(
        &self,
        _id: &UserId,
        _changes: UpdateUserCommand,
        _at: DateTime<Utc>,
    ) -> Result<User, UserError> {
        Err(Self::error("update"))
    }

    async fn record_login(&self, _id: &UserId, _at: DateTime<Utc>) -> Result<(), UserError> {
        Err(Self::error("record_login"))
    }

    async fn delete(&self, _id: &UserId) -> Result<(), UserError> {
        Err(Self::error("delete"))
    }
}

/// Authenticator with cheap argon2 parameters to keep the suite fast.
pub fn test_authenticator() -> Arc<Authenticator> {
    Arc::new(
        Authenticator::new(JWT_SECRET, Duration::minutes(60)).with_password_hasher(
            PasswordHasher::with_params(1024, 1, 1).expect("Invalid argon2 parameters"),
        ),
    )
}

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub authenticator: Arc<Authenticator>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        Self::spawn_with(ServerConfig::default()).await
    }

    pub async fn spawn_with(server_config: ServerConfig) -> Self {
        Self::spawn_with_repository(Arc::new(InMemoryUserRepository::default()), server_config)
            .await
    }

    pub async fn spawn_with_repository<UR: UserRepository>(
        repository: Arc<UR>,
        server_config: ServerConfig,
    ) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let authenticator = test_authenticator();

        let account_service = Arc::new(AccountService::new(
            repository,
            Arc::clone(&authenticator),
        ));

        let state = AppState::new(account_service, Arc::clone(&authenticator));
        let router = create_router(state, &server_config);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::new(),
            authenticator,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make PUT request
    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(format!("{}{}", self.address, path))
    }

    /// Helper to make DELETE request
    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.delete(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Register an account and return the `data` member of the response.
    pub async fn register(&self, email: &str, password: &str) -> Value {
        let response = self
            .post("/api/v1/auth/register")
            .json(&json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": email,
                "password": password,
                "country": "UK"
            }))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: Value = response.json().await.expect("Failed to parse response");
        body["data"].clone()
    }
}
