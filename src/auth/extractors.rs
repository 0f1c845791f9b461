use std::marker::PhantomData;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, warn};

use crate::auth::claims::Scope;
use crate::auth::jwt::JwtKeys;
use crate::errors::{AuthError, AuthRejection};
use crate::state::AppState;
use crate::users::store::User;

/// The scope set a route requires, fixed at registration time. Declaring
/// `AuthUser<ResourcesWrite>` in a handler signature installs the guard for
/// that route.
pub trait ScopePolicy: Send + Sync + 'static {
    const REQUIRED: &'static [Scope];
}

#[derive(Debug)]
pub struct UserRead;
impl ScopePolicy for UserRead {
    const REQUIRED: &'static [Scope] = &[Scope::UserRead];
}

#[derive(Debug)]
pub struct UserWrite;
impl ScopePolicy for UserWrite {
    const REQUIRED: &'static [Scope] = &[Scope::UserWrite];
}

#[derive(Debug)]
pub struct ResourcesRead;
impl ScopePolicy for ResourcesRead {
    const REQUIRED: &'static [Scope] = &[Scope::ResourcesRead];
}

#[derive(Debug)]
pub struct ResourcesWrite;
impl ScopePolicy for ResourcesWrite {
    const REQUIRED: &'static [Scope] = &[Scope::ResourcesWrite];
}

/// Extracts and validates the bearer token, resolves the principal and
/// enforces the route's scope policy.
#[derive(Debug)]
pub struct AuthUser<P: ScopePolicy> {
    pub user: User,
    _policy: PhantomData<fn() -> P>,
}

#[async_trait]
impl<P: ScopePolicy> FromRequestParts<AppState> for AuthUser<P> {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authorize(parts, state, P::REQUIRED)
            .await
            .map_err(|error| AuthRejection::new(error, P::REQUIRED))?;
        Ok(Self {
            user,
            _policy: PhantomData,
        })
    }
}

/// [`AuthUser`] with the principal additionally required to be active.
#[derive(Debug)]
pub struct ActiveUser<P: ScopePolicy> {
    pub user: User,
    _policy: PhantomData<fn() -> P>,
}

#[async_trait]
impl<P: ScopePolicy> FromRequestParts<AppState> for ActiveUser<P> {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser { user, .. } = AuthUser::<P>::from_request_parts(parts, state).await?;
        if !user.is_active() {
            warn!(user_id = %user.id, "inactive user rejected");
            return Err(AuthRejection::new(AuthError::InactivePrincipal, P::REQUIRED));
        }
        Ok(Self {
            user,
            _policy: PhantomData,
        })
    }
}

async fn authorize(
    parts: &Parts,
    state: &AppState,
    required: &'static [Scope],
) -> Result<User, AuthError> {
    let token = bearer_token(parts).ok_or(AuthError::Unauthenticated)?;

    let keys = JwtKeys::from_ref(state);
    let claims = keys.decode(token)?;

    let user = state
        .users
        .get(&claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(sub = %claims.sub, "token subject not found");
            AuthError::PrincipalNotFound
        })?;

    // Ordinary scopes are checked against the token's grant, bounding a
    // token's power to what was granted at login. The superuser bypass reads
    // the live principal instead, so elevation and revocation take effect on
    // the next request.
    if !user.is_superuser() {
        for scope in required {
            if !claims.scopes.iter().any(|s| s == scope.as_str()) {
                warn!(user_id = %user.id, scope = %scope, "missing scope");
                return Err(AuthError::InsufficientPermissions);
            }
        }
    }

    debug!(user_id = %user.id, "request authorized");
    Ok(user)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
}
