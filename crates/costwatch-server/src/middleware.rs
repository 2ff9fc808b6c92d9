use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::error_response;
use crate::logging::TraceId;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";

/// Validates the `X-API-Key` header on protected routes.
///
/// With `auth.disable_auth` every request passes. Otherwise an unset server
/// key answers 500 and a missing or wrong key answers 401.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let auth = &state.config.auth;
    if auth.disable_auth {
        return next.run(req).await;
    }

    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    if auth.api_key.is_empty() {
        tracing::error!(trace_id = %trace_id, "Request rejected: server API key not configured");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &trace_id,
            "internal_error",
            "API key not configured on server",
        );
    }

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if key == auth.api_key => next.run(req).await,
        Some(_) => {
            tracing::warn!(trace_id = %trace_id, "Request rejected: invalid API key");
            error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "unauthorized",
                "Invalid API key",
            )
        }
        None => {
            tracing::warn!(trace_id = %trace_id, "Request rejected: missing X-API-Key header");
            error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "unauthorized",
                "Missing X-API-Key header",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, ServerConfig};
    use axum::body::to_bytes;
    use axum::routing::get;
    use axum::Router;
    use costwatch_ai::NullGenerator;
    use costwatch_analysis::CostAnalyzer;
    use costwatch_common::types::NotificationConfig;
    use costwatch_metrics::SyntheticSource;
    use costwatch_notify::LogNotifier;
    use costwatch_storage::{CostRepository, LocalFileStore};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn build_state(auth: AuthConfig) -> (AppState, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalFileStore::open(temp_dir.path()).await.unwrap());
        let config = ServerConfig {
            auth,
            ..ServerConfig::default()
        };
        let state = AppState::build(
            config,
            CostRepository::new(store, NotificationConfig::default()),
            Arc::new(CostAnalyzer::new(Arc::new(SyntheticSource))),
            Arc::new(NullGenerator),
            Arc::new(LogNotifier),
        )
        .await
        .unwrap();
        (state, temp_dir)
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/protected", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                state,
                api_key_middleware,
            ))
    }

    async fn call(app: Router, key: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/protected");
        if let Some(key) = key {
            builder = builder.header("X-API-Key", key);
        }
        let resp = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disabled_auth_passes_through() {
        let (state, _dir) = build_state(AuthConfig {
            api_key: String::new(),
            disable_auth: true,
        })
        .await;
        let (status, body) = call(app(state), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unconfigured_server_key_is_500() {
        let (state, _dir) = build_state(AuthConfig::default()).await;
        let (status, body) = call(app(state), Some("anything")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("API key not configured on server"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_or_wrong_key_is_401() {
        let (state, _dir) = build_state(AuthConfig {
            api_key: "secret".to_string(),
            disable_auth: false,
        })
        .await;

        let (status, body) = call(app(state.clone()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("\"err_code\":1002"));

        let (status, _) = call(app(state.clone()), Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(app(state), Some("secret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
