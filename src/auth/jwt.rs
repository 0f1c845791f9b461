use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::auth::claims::Claims;
use crate::config::AuthConfig;
use crate::errors::AuthError;
use crate::state::AppState;

/// Holds JWT signing and verification keys with config data. The secret is
/// loaded once at startup; rotating it invalidates every issued token.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub algorithm: Algorithm,
    pub ttl: TimeDuration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let AuthConfig {
            secret_key,
            algorithm,
            token_ttl_minutes,
            ..
        } = state.config.auth.clone();
        let algorithm = algorithm.parse().unwrap_or_else(|_| {
            warn!(%algorithm, "unknown signing algorithm, falling back to HS256");
            Algorithm::HS256
        });
        Self {
            encoding: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding: DecodingKey::from_secret(secret_key.as_bytes()),
            algorithm,
            ttl: TimeDuration::minutes(token_ttl_minutes),
        }
    }
}

impl JwtKeys {
    /// Sign an access token for `sub` carrying the granted scopes. Expiry is
    /// `now + ttl`, falling back to the configured lifetime.
    pub fn issue(
        &self,
        sub: &str,
        scopes: &[String],
        ttl: Option<TimeDuration>,
    ) -> anyhow::Result<String> {
        let expire = OffsetDateTime::now_utc() + ttl.unwrap_or(self.ttl);
        let claims = Claims {
            sub: sub.to_owned(),
            scopes: scopes.to_vec(),
            exp: expire.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(sub = %claims.sub, "access token signed");
        Ok(token)
    }

    /// Verify signature and expiry. Any failure collapses to `InvalidToken`.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        // no leeway: a token expired one second ago is expired
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "token rejected");
            AuthError::InvalidToken
        })?;
        Ok(data.claims)
    }
}
