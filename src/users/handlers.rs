use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    auth::extractors::{ActiveUser, AuthUser, UserRead, UserWrite},
    errors::{ApiError, AuthError, AuthRejection},
    state::AppState,
    users::dto::{UserData, UserUpdate},
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/user", get(get_current_user).patch(update_user))
}

/// Return the current user, if active.
#[instrument(skip_all)]
pub async fn get_current_user(
    AuthUser { user, .. }: AuthUser<UserRead>,
) -> Result<Json<UserData>, AuthRejection> {
    if !user.is_active() {
        warn!(user_id = %user.id, "inactive user");
        return Err(AuthRejection::new(AuthError::InactivePrincipal, &[]));
    }
    Ok(Json(user.into()))
}

/// Apply a partial update to the current user.
#[instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    ActiveUser { user, .. }: ActiveUser<UserWrite>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserData>, ApiError> {
    if let Err(reason) = update.validate() {
        return Err(ApiError::invalid_request("invalid user")
            .with_input(serde_json::json!({ "id": user.id }))
            .with_ctx(serde_json::json!({ "reason": reason })));
    }
    match state.users.update(&user.id, &update).await {
        Ok(Some(updated)) => Ok(Json(updated.into())),
        Ok(None) => Err(ApiError::not_found("resource not found")
            .with_input(serde_json::json!({ "id": user.id }))),
        Err(e) => {
            error!(error = %e, user_id = %user.id, "update user failed");
            Err(ApiError::database("unable to update user")
                .with_input(serde_json::json!({ "id": user.id }))
                .with_ctx(serde_json::json!({ "error": e.to_string() })))
        }
    }
}
