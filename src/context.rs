/// Application context and dependency injection
use crate::{
    config::ServerConfig, db, error::ApiResult, google::GoogleVerifier, token::TokenSigner,
    users::UserService,
};
use chrono::Duration;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub tokens: Arc<TokenSigner>,
    pub users: Arc<UserService>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize database
        let db = db::create_pool(&config.database.path, db::DatabaseOptions::default()).await?;

        // Run migrations
        db::run_migrations(&db).await?;

        // Test connection
        db::test_connection(&db).await?;

        let tokens = Arc::new(TokenSigner::new(
            &config.auth.jwt_secret,
            Duration::seconds(config.auth.token_ttl_seconds),
        ));

        let verifier = Arc::new(GoogleVerifier::new(
            &config.google.client_id,
            &config.google.jwks_url,
        )?);

        let users = Arc::new(UserService::new(db.clone(), tokens.clone(), verifier));

        Ok(Self {
            config: Arc::new(config),
            db,
            tokens,
            users,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
