use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use tracing::warn;

/// Token signing and bootstrap settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret_key: String,
    pub algorithm: String,
    pub token_ttl_minutes: i64,
    pub superuser: String,
    pub superuser_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub api_prefix: String,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let auth = AuthConfig {
            secret_key: std::env::var("ACCESS_TOKEN_SECRET_KEY").unwrap_or_else(|_| {
                // An ephemeral secret keeps dev setups working; every restart
                // invalidates previously issued tokens.
                warn!("ACCESS_TOKEN_SECRET_KEY not set, generating an ephemeral secret");
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(43)
                    .map(char::from)
                    .collect()
            }),
            algorithm: std::env::var("ACCESS_TOKEN_ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            token_ttl_minutes: std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
            superuser: std::env::var("SUPERUSER").unwrap_or_else(|_| "admin".into()),
            superuser_password: std::env::var("SUPERUSER_PASSWORD")
                .unwrap_or_else(|_| "admin".into()),
        };
        let api_prefix = std::env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".into());
        Ok(Self {
            database_url,
            api_prefix,
            auth,
        })
    }
}
