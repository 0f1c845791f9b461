use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        claims::Token,
        jwt::JwtKeys,
        services::{authenticate_user, grant_scopes},
    },
    errors::{ApiError, AuthError, AuthRejection},
    state::AppState,
};

pub fn login_routes() -> Router<AppState> {
    Router::new().route("/login/token", post(login_access_token))
}

/// OAuth2 password-style login form. `scope` is a space-separated list of
/// requested scopes.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub scope: String,
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login_access_token(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<Token>, Response> {
    let user = authenticate_user(state.users.as_ref(), &form.username, &form.password)
        .await
        .map_err(|e| {
            error!(error = %e, "user lookup failed");
            AuthRejection::new(AuthError::Storage(e), &[]).into_response()
        })?
        .ok_or_else(|| {
            warn!("login rejected");
            AuthRejection::new(AuthError::InvalidCredentials, &[]).into_response()
        })?;

    let scopes = grant_scopes(&form.scope, &user);
    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.issue(&user.id, &scopes, None).map_err(|e| {
        error!(error = %e, "token signing failed");
        ApiError::database("unable to sign access token")
            .with_ctx(serde_json::json!({ "error": e.to_string() }))
            .into_response()
    })?;

    info!(user_id = %user.id, granted = scopes.len(), "access token issued");
    Ok(Json(Token {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
