/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_PRODUCTION`: Enables HSTS (default: false)
/// - `CORS_ORIGINS`: Comma-separated origins, `*` for permissive (default: *)
/// - `MEDIA_DIR`: Directory served under `/media` (default: media)
/// - `STORE_BACKEND`: `postgres` or `memory` (default: postgres)
/// - `DATABASE_URL`: PostgreSQL connection string (required for postgres)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 chars)
/// - `AUTH_ALLOW_LEGACY_CLEARTEXT`: Accept and migrate cleartext credentials (default: false)
/// - `RBAC_SUPERUSER_ROLE`: Name of the undeletable role (default: 超级管理员)
/// - `BOOTSTRAP_ADMIN_USERNAME` / `BOOTSTRAP_ADMIN_PASSWORD`: Provision an admin at startup
/// - `RUST_LOG`, `LOG_FORMAT`: Read by `main` for the tracing subscriber
///
/// # Example
///
/// ```no_run
/// use permit_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::{env, fmt, path::PathBuf, str::FromStr};

use permit_shared::db::pool::DatabaseConfig;
use permit_shared::models::role::SUPERUSER_ROLE_NAME;

const MIN_JWT_SECRET_LEN: usize = 32;

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("JWT_SECRET must be at least 32 characters long")]
    WeakSecret,
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Storage backend
    pub store: StoreConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Login and role rules
    pub auth: AuthConfig,

    /// Admin account provisioned at startup, if any
    pub bootstrap: Option<BootstrapConfig>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Production mode turns on HSTS
    pub production: bool,

    /// Allowed CORS origins; `*` means permissive
    pub cors_origins: Vec<String>,

    /// Directory served under `/media`
    pub media_dir: PathBuf,
}

/// Which [`EntityStore`](permit_shared::store::EntityStore) backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid {
                name: "STORE_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Present when `backend` is `Postgres`
    pub database: Option<DatabaseConfig>,
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig").field("secret", &"<redacted>").finish()
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Accept cleartext credentials at login and re-hash them
    pub allow_legacy_cleartext: bool,

    /// Role that can never be deleted or renamed
    pub superuser_role: String,
}

#[derive(Clone)]
pub struct BootstrapConfig {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("API_PORT") {
            Some(v) => parse("API_PORT", v)?,
            None => 8080,
        };
        let production = match var("API_PRODUCTION") {
            Some(v) => parse_bool("API_PRODUCTION", v)?,
            None => false,
        };
        let cors_origins = var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["*".to_string()]);

        let backend = match var("STORE_BACKEND") {
            Some(v) => v.parse()?,
            None => StoreBackend::Postgres,
        };
        let database = match backend {
            StoreBackend::Postgres => {
                let url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
                let mut database = DatabaseConfig {
                    url,
                    ..Default::default()
                };
                if let Some(v) = var("DATABASE_MAX_CONNECTIONS") {
                    database.max_connections = parse("DATABASE_MAX_CONNECTIONS", v)?;
                }
                Some(database)
            }
            StoreBackend::Memory => None,
        };

        let secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if secret.chars().count() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        let allow_legacy_cleartext = match var("AUTH_ALLOW_LEGACY_CLEARTEXT") {
            Some(v) => parse_bool("AUTH_ALLOW_LEGACY_CLEARTEXT", v)?,
            None => false,
        };

        let bootstrap = match (var("BOOTSTRAP_ADMIN_USERNAME"), var("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(BootstrapConfig { username, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("BOOTSTRAP_ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("BOOTSTRAP_ADMIN_USERNAME")),
        };

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
                production,
                cors_origins,
                media_dir: var("MEDIA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("media")),
            },
            store: StoreConfig { backend, database },
            jwt: JwtConfig { secret },
            auth: AuthConfig {
                allow_legacy_cleartext,
                superuser_role: var("RBAC_SUPERUSER_ROLE")
                    .map(|v| v.trim().to_string())
                    .unwrap_or_else(|| SUPERUSER_ROLE_NAME.to_string()),
            },
            bootstrap,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether CORS should allow any origin
    pub fn cors_permissive(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_with_memory_store() {
        let config = load(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", SECRET)]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(!config.api.production);
        assert!(config.cors_permissive());
        assert_eq!(config.api.media_dir, PathBuf::from("media"));
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.store.database.is_none());
        assert!(!config.auth.allow_legacy_cleartext);
        assert_eq!(config.auth.superuser_role, SUPERUSER_ROLE_NAME);
        assert!(config.bootstrap.is_none());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = load(&[("JWT_SECRET", SECRET)]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));

        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgresql://localhost/permit"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
        ])
        .unwrap();
        let database = config.store.database.unwrap();
        assert_eq!(database.url, "postgresql://localhost/permit");
        assert_eq!(database.max_connections, 25);
    }

    #[test]
    fn test_jwt_secret_rules() {
        assert!(matches!(
            load(&[("STORE_BACKEND", "memory")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
        assert!(matches!(
            load(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "short")]),
            Err(ConfigError::WeakSecret)
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("STORE_BACKEND", "mysql"), ("JWT_SECRET", SECRET)]),
            Err(ConfigError::Invalid { name: "STORE_BACKEND", .. })
        ));
        assert!(matches!(
            load(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", SECRET), ("API_PORT", "http")]),
            Err(ConfigError::Invalid { name: "API_PORT", .. })
        ));
        assert!(matches!(
            load(&[
                ("STORE_BACKEND", "memory"),
                ("JWT_SECRET", SECRET),
                ("AUTH_ALLOW_LEGACY_CLEARTEXT", "maybe"),
            ]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", SECRET),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "9000"),
            ("API_PRODUCTION", "true"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("AUTH_ALLOW_LEGACY_CLEARTEXT", "1"),
            ("RBAC_SUPERUSER_ROLE", "Root"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert!(config.api.production);
        assert!(!config.cors_permissive());
        assert_eq!(config.api.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert!(config.auth.allow_legacy_cleartext);
        assert_eq!(config.auth.superuser_role, "Root");
    }

    #[test]
    fn test_bootstrap_needs_both_values() {
        let base = [("STORE_BACKEND", "memory"), ("JWT_SECRET", SECRET)];

        let mut vars = base.to_vec();
        vars.push(("BOOTSTRAP_ADMIN_USERNAME", "admin"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Missing("BOOTSTRAP_ADMIN_PASSWORD"))
        ));

        vars.push(("BOOTSTRAP_ADMIN_PASSWORD", "Adm1n@pass"));
        let bootstrap = load(&vars).unwrap().bootstrap.unwrap();
        assert_eq!(bootstrap.username, "admin");
        assert!(!format!("{bootstrap:?}").contains("Adm1n@pass"));
    }
}
