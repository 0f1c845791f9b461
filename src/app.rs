use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, resources, users};

pub fn build_app(state: AppState) -> Router {
    let prefix = state.config.api_prefix.clone();
    let api = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(resources::router())
        .route("/health", get(|| async { "ok" }));

    Router::new()
        .nest(&prefix, api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::auth::services::seed_superuser;
    use crate::users::store::test_user;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    async fn test_app() -> (Router, AppState) {
        let state = AppState::fake();
        seed_superuser(state.users.as_ref(), &state.config.auth)
            .await
            .expect("seed superuser");
        (build_app(state.clone()), state)
    }

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    async fn login(app: &Router, username: &str, password: &str, scope: &str) -> Response {
        let form = format!("username={username}&password={password}&scope={scope}");
        app.clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/login/token")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn get_user(app: &Router, token: Option<&str>) -> Response {
        let mut builder = Request::builder().uri("/api/v1/user");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        app.clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let (app, _state) = test_app().await;
        let res = app
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn current_user_without_token_is_not_authenticated() {
        let (app, _state) = test_app().await;
        let res = get_user(&app, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            res.headers()[header::WWW_AUTHENTICATE].to_str().unwrap(),
            "Bearer"
        );
        let body = body_json(res).await;
        assert_eq!(body["detail"][0]["msg"], "Not authenticated");
        assert_eq!(body["detail"][0]["type"], "unauthorized");
    }

    #[tokio::test]
    async fn seeded_superuser_can_log_in_and_read_itself() {
        let (app, _state) = test_app().await;

        let res = login(&app, "admin", "admin", "superuser").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["token_type"], "bearer");
        let token = body["access_token"].as_str().unwrap().to_string();
        assert!(!token.is_empty());

        let res = get_user(&app, Some(&token)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["id"], "admin");
        assert_eq!(body["status"], "active");
    }

    #[tokio::test]
    async fn login_failures_are_uniform() {
        let (app, _state) = test_app().await;

        let wrong_password = login(&app, "admin", "nope", "").await;
        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(wrong_password).await;
        assert_eq!(body["detail"][0]["msg"], "unable to validate credentials");

        let unknown_user = login(&app, "nobody", "nope", "").await;
        assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(unknown_user).await;
        assert_eq!(body["detail"][0]["msg"], "unable to validate credentials");
    }

    #[tokio::test]
    async fn token_scopes_bound_what_a_login_grants() {
        let (app, state) = test_app().await;
        let mut user = test_user("reader", &["resources:read"]);
        user.hashed_password = Some(hash_password("s3cret").unwrap());
        state.users.insert(user).await.unwrap();

        // user:read was requested but is not stored, so it is not granted
        let res = login(&app, "reader", "s3cret", "resources:read user:read").await;
        assert_eq!(res.status(), StatusCode::OK);
        let token = body_json(res).await["access_token"]
            .as_str()
            .unwrap()
            .to_string();

        let res = get_user(&app, Some(&token)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(res).await;
        assert_eq!(body["detail"][0]["msg"], "insufficient permissions");
    }

    #[tokio::test]
    async fn invalid_token_is_challenged_with_the_required_scopes() {
        let (app, _state) = test_app().await;
        let res = get_user(&app, Some("garbage")).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            res.headers()[header::WWW_AUTHENTICATE].to_str().unwrap(),
            "Bearer scope=\"user:read\""
        );
    }

    #[tokio::test]
    async fn deactivated_user_is_rejected_on_the_current_user_path() {
        let (app, _state) = test_app().await;
        let res = login(&app, "admin", "admin", "superuser").await;
        let token = body_json(res).await["access_token"]
            .as_str()
            .unwrap()
            .to_string();

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::PATCH)
                    .uri("/api/v1/user")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"status":"inactive"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["status"], "inactive");

        // valid token, valid scopes, inactive principal
        let res = get_user(&app, Some(&token)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn update_with_invalid_email_is_unprocessable() {
        let (app, _state) = test_app().await;
        let res = login(&app, "admin", "admin", "").await;
        let token = body_json(res).await["access_token"]
            .as_str()
            .unwrap()
            .to_string();

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::PATCH)
                    .uri("/api/v1/user")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"not-an-email"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(res).await;
        assert_eq!(body["detail"][0]["type"], "invalid_request");
        assert_eq!(body["detail"][0]["msg"], "invalid user");
    }
}
