/// Server configuration management
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub google: GoogleConfig,
    pub logging: LoggingConfig,
}

/// Core service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Server hostname
    pub hostname: String,
    /// Port to listen on
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Token issuing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret for signing session tokens (min 32 chars)
    pub jwt_secret: String,
    /// Lifetime of issued tokens in seconds
    pub token_ttl_seconds: i64,
}

/// Google federated login configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client ID expected in the token audience
    pub client_id: String,
    /// JWKS endpoint for Google's signing keys
    pub jwks_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("USERS_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());

        let port = env::var("USERS_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ApiError::Validation("Invalid USERS_PORT".to_string()))?;

        let database_path = env::var("USERS_DATABASE_PATH")
            .unwrap_or_else(|_| "./data/users.sqlite".to_string());

        let jwt_secret = env::var("USERS_JWT_SECRET").map_err(|_| {
            ApiError::Validation("USERS_JWT_SECRET environment variable required".to_string())
        })?;

        let token_ttl_seconds = env::var("USERS_TOKEN_TTL_SECONDS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse::<i64>()
            .map_err(|_| ApiError::Validation("Invalid USERS_TOKEN_TTL_SECONDS".to_string()))?;

        let google_client_id = env::var("USERS_GOOGLE_CLIENT_ID").map_err(|_| {
            ApiError::Validation("USERS_GOOGLE_CLIENT_ID environment variable required".to_string())
        })?;

        let google_jwks_url = env::var("USERS_GOOGLE_JWKS_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/oauth2/v3/certs".to_string());

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            database: DatabaseConfig {
                path: PathBuf::from(database_path),
            },
            auth: AuthConfig {
                jwt_secret,
                token_ttl_seconds,
            },
            google: GoogleConfig {
                client_id: google_client_id,
                jwks_url: google_jwks_url,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.auth.jwt_secret.len() < 32 {
            return Err(ApiError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.auth.token_ttl_seconds <= 0 {
            return Err(ApiError::Validation(
                "Token TTL must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
