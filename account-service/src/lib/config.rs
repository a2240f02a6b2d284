use std::env;
use std::time::Duration;

use auth::PasswordError;
use auth::PasswordHasher;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
    /// Allowed CORS origins; `"*"` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Dump request headers and bodies to the log.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_gzip_level")]
    pub gzip_level: i32,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout_secs(),
            body_limit_bytes: default_body_limit_bytes(),
            cors_origins: default_cors_origins(),
            debug: false,
            gzip_level: default_gzip_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_expiration_minutes")]
    pub expiration_minutes: i64,
}

impl JwtConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.expiration_minutes)
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl PasswordConfig {
    /// Build a hasher with these cost parameters.
    ///
    /// # Errors
    /// * `InvalidParams` - Parameters rejected by argon2
    pub fn hasher(&self) -> Result<PasswordHasher, PasswordError> {
        PasswordHasher::with_params(self.memory_kib, self.iterations, self.parallelism)
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_body_limit_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_gzip_level() -> i32 {
    5
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_expiration_minutes() -> i64 {
    60
}

// argon2 crate defaults (OWASP minimum for Argon2id)
fn default_memory_kib() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: SERVER__CORS_ORIGINS=https://a.io,https://b.io
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?;

        configuration.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse(
            r#"
            [server]
            [database]
            url = "postgres://localhost/accounts"
            [jwt]
            secret = "s3cret"
            "#,
        );

        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.server.body_limit_bytes, 2 * 1024 * 1024);
        assert_eq!(config.server.cors_origins, vec!["*".to_string()]);
        assert!(!config.server.debug);
        assert_eq!(config.jwt.token_ttl(), chrono::Duration::minutes(60));
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.password.memory_kib, 19 * 1024);
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let config = parse(
            r#"
            [server]
            http_port = 9000
            request_timeout_secs = 3
            cors_origins = ["https://app.example.com"]
            debug = true
            [database]
            url = "postgres://db/accounts"
            max_connections = 2
            [jwt]
            secret = "s3cret"
            expiration_minutes = 15
            [password]
            memory_kib = 1024
            iterations = 1
            parallelism = 1
            [logging]
            format = "json"
            "#,
        );

        assert_eq!(config.server.http_port, 9000);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(3));
        assert!(config.server.debug);
        assert_eq!(config.jwt.expiration_minutes, 15);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.password.hasher().is_ok());
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let result = ConfigBuilder::builder()
            .add_source(File::from_str(
                "[server]\n[database]\nurl = \"x\"\n[jwt]\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize::<Config>();

        assert!(result.is_err());
    }
}
