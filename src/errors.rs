use std::panic::Location;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::claims::Scope;
use crate::users::store::StoreError;

/// Valid error types reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Database,
    InvalidRequest,
    Unauthorized,
    NotFound,
}

/// A consistent shape for reporting errors.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: ErrorType,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    pub loc: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<serde_json::Value>,
}

impl ErrorDetail {
    /// `loc` defaults to the call site when not supplied.
    #[track_caller]
    pub fn new(kind: ErrorType, msg: impl Into<String>) -> Self {
        Self::at(kind, msg, Location::caller())
    }

    pub fn at(kind: ErrorType, msg: impl Into<String>, location: &Location<'_>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            input: None,
            loc: vec![location.file().to_string(), location.line().to_string()],
            ctx: None,
        }
    }
}

/// Error response body: a list of one or more [`ErrorDetail`]s.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: Vec<ErrorDetail>,
}

impl ErrorBody {
    pub fn single(detail: ErrorDetail) -> Self {
        Self {
            detail: vec![detail],
        }
    }
}

/// Error returned by CRUD handlers, rendered as a structured body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: ErrorDetail,
}

impl ApiError {
    #[track_caller]
    pub fn database(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: ErrorDetail::new(ErrorType::Database, msg),
        }
    }

    #[track_caller]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: ErrorDetail::new(ErrorType::NotFound, msg),
        }
    }

    #[track_caller]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: ErrorDetail::new(ErrorType::InvalidRequest, msg),
        }
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.detail.input = Some(input);
        self
    }

    pub fn with_ctx(mut self, ctx: serde_json::Value) -> Self {
        self.detail.ctx = Some(ctx);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody::single(self.detail))).into_response()
    }
}

/// Why a request was denied by the access guard or the login endpoint.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token on the request.
    #[error("Not authenticated")]
    Unauthenticated,
    /// Bad signature, malformed structure, or expired token.
    #[error("unable to validate credentials")]
    InvalidToken,
    /// Unknown user id or wrong password at login. The two are deliberately
    /// indistinguishable on the wire.
    #[error("unable to validate credentials")]
    InvalidCredentials,
    /// Token subject no longer resolves to a user.
    #[error("unable to validate credentials")]
    PrincipalNotFound,
    /// Valid principal, missing scope.
    #[error("insufficient permissions")]
    InsufficientPermissions,
    /// Principal exists but is not active.
    #[error("unable to validate credentials")]
    InactivePrincipal,
    /// The user store failed; a server-side fault, not a client error.
    #[error("unable to validate credentials")]
    Storage(#[from] StoreError),
}

/// An [`AuthError`] bound to the scope set the route required, rendered as a
/// structured 401/500 response with a `WWW-Authenticate` challenge.
#[derive(Debug)]
pub struct AuthRejection {
    pub error: AuthError,
    pub scopes: &'static [Scope],
    location: &'static Location<'static>,
}

impl AuthRejection {
    #[track_caller]
    pub fn new(error: AuthError, scopes: &'static [Scope]) -> Self {
        Self {
            error,
            scopes,
            location: Location::caller(),
        }
    }

    fn challenge(&self) -> String {
        // A missing token is challenged with a bare scheme; once a token was
        // presented the challenge names the scopes the route required.
        if self.scopes.is_empty() || matches!(self.error, AuthError::Unauthenticated) {
            return "Bearer".to_string();
        }
        let list = self
            .scopes
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        format!("Bearer scope=\"{list}\"")
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.error {
            AuthError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorType::Database),
            _ => (StatusCode::UNAUTHORIZED, ErrorType::Unauthorized),
        };
        let mut detail = ErrorDetail::at(kind, self.error.to_string(), self.location);
        if let AuthError::Storage(e) = &self.error {
            detail.ctx = Some(serde_json::json!({ "error": e.to_string() }));
        }
        let body = Json(ErrorBody::single(detail));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, self.challenge())], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
