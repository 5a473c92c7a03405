//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use serde::Deserialize;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Default application name, used as the scope namespace in access tokens
pub const DEFAULT_APP_NAME: &str = "galactic_core";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for ECS/Docker
            port: 8000,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_pool_size: usize,
    pub require_tls: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "galactic_core".to_string(),
            max_pool_size: 10,
            require_tls: false,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Token authentication configuration (Cognito user pool)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub app_name: String,
    pub region: String,
    pub userpool_id: String,
    /// Hosted auth domain; only used to advertise the token URL in the API docs
    pub issuer: Option<String>,
    pub jwt_header_name: String,
    /// Empty means the header carries the raw token
    pub jwt_header_prefix: String,
    pub check_token_expiration: bool,
    pub jwks_url: String,
    /// Scopes accepted on write endpoints, empty disables the check
    pub write_scopes: Vec<String>,
}

impl AuthConfig {
    /// Issuer claim every user pool token must carry
    pub fn token_issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region, self.userpool_id
        )
    }

    /// OAuth2 token endpoint of the hosted auth domain
    pub fn token_url(&self) -> Option<String> {
        self.issuer
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|issuer| format!("{}/oauth2/token", issuer.trim_end_matches('/')))
    }
}

/// API documentation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DocsConfig {
    pub title: String,
    pub version: String,
    pub enable_openapi: bool,
    pub enable_swagger: bool,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            title: "Galactic Core API".to_string(),
            version: "1".to_string(),
            enable_openapi: true,
            enable_swagger: true,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub docs: DocsConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerConfig {
            host: lookup("HOST")
                .and_then(|h| h.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().port),
        };

        let max_pool_size = lookup("DB_MAX_CONNECTIONS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        // Try DATABASE_URL first, fall back to individual vars
        let mut database = if let Some(database_url) = lookup("DATABASE_URL") {
            Self::parse_database_url(&database_url, max_pool_size)?
        } else {
            let defaults = DatabaseConfig::default();
            DatabaseConfig {
                host: lookup("DB_HOST").unwrap_or(defaults.host),
                port: lookup("DB_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.port),
                user: lookup("DB_USER").unwrap_or(defaults.user),
                password: lookup("DB_PASSWORD").unwrap_or_default(),
                database: lookup("DB_NAME").unwrap_or(defaults.database),
                max_pool_size,
                require_tls: false,
            }
        };
        if lookup("DB_SSLMODE").is_some_and(|mode| mode.eq_ignore_ascii_case("require")) {
            database.require_tls = true;
        }

        let cors = CorsConfig {
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let auth = Self::auth_config(&lookup)?;

        let docs_defaults = DocsConfig::default();
        let docs = DocsConfig {
            title: lookup("API_TITLE").unwrap_or(docs_defaults.title),
            version: lookup("API_VERSION").unwrap_or(docs_defaults.version),
            enable_openapi: parse_flag(lookup("ENABLE_OPENAPI_SPEC"), docs_defaults.enable_openapi)?,
            enable_swagger: parse_flag(lookup("ENABLE_SWAGGER"), docs_defaults.enable_swagger)?,
        };

        Ok(Self {
            server,
            database,
            cors,
            auth,
            docs,
        })
    }

    fn auth_config<F>(lookup: &F) -> Result<AuthConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        let region = required("COGNITO_REGION")?;
        let userpool_id = required("COGNITO_USERPOOL_ID")?;

        let jwks_url = lookup("COGNITO_JWKS_URL").unwrap_or_else(|| {
            format!(
                "https://cognito-idp.{}.amazonaws.com/{}/.well-known/jwks.json",
                region, userpool_id
            )
        });
        url::Url::parse(&jwks_url)
            .map_err(|e| ConfigError::InvalidValue(format!("COGNITO_JWKS_URL: {}", e)))?;

        Ok(AuthConfig {
            app_name: lookup("APP_NAME")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            region,
            userpool_id,
            issuer: lookup("COGNITO_ISSUER"),
            jwt_header_name: lookup("COGNITO_JWT_HEADER_NAME")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "Authorization".to_string()),
            jwt_header_prefix: lookup("COGNITO_JWT_HEADER_PREFIX")
                .unwrap_or_else(|| "Bearer".to_string()),
            check_token_expiration: parse_flag(lookup("COGNITO_CHECK_TOKEN_EXPIRATION"), true)?,
            jwks_url,
            write_scopes: lookup("WRITE_SCOPES")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
        })
    }

    /// Parse a DATABASE_URL connection string (postgresql://...)
    fn parse_database_url(url: &str, max_pool_size: usize) -> Result<DatabaseConfig, ConfigError> {
        let parsed = url::Url::parse(url).map_err(|_| {
            ConfigError::InvalidValue(
                "Invalid DATABASE_URL format (expected postgresql://...)".to_string(),
            )
        })?;

        let host = parsed
            .host_str()
            .ok_or_else(|| ConfigError::InvalidValue("Missing host in DATABASE_URL".to_string()))?
            .to_string();

        let database = parsed.path().trim_start_matches('/').to_string();
        if database.is_empty() {
            return Err(ConfigError::InvalidValue(
                "Missing database name in DATABASE_URL".to_string(),
            ));
        }

        let require_tls = parsed
            .query_pairs()
            .any(|(k, v)| k == "sslmode" && v == "require");

        Ok(DatabaseConfig {
            host,
            port: parsed.port().unwrap_or(5432),
            user: parsed.username().to_string(),
            password: parsed.password().map(|p| p.to_string()).unwrap_or_default(),
            database,
            max_pool_size,
            require_tls,
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(format!("expected a boolean, got '{}'", v))),
        },
    }
}
