//! HTTP surface: health route, WebSocket upgrade and the static client.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::state::AppState;
use crate::ws;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
    pub timestamp: String,
    pub connections: usize,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Live Polling System API is running!".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        connections: state.connection_count().await,
    })
}

/// Exact-origin CORS when a client URL is configured, permissive otherwise
fn cors_layer(client_url: Option<&str>) -> CorsLayer {
    match client_url.map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        Some(Err(e)) => {
            tracing::warn!("CLIENT_URL is not a valid origin ({}), using permissive CORS", e);
            CorsLayer::permissive()
        }
        None => CorsLayer::permissive(),
    }
}

/// Build the application router. Unknown paths fall back to the client's
/// index.html so client-side routing keeps working.
pub fn router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let static_dir = Path::new(&config.static_dir);
    let static_files =
        ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(static_files)
        .layer(cors_layer(config.client_url.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn config_for(dir: &Path) -> ServerConfig {
        ServerConfig {
            static_dir: dir.to_string_lossy().into_owned(),
            ..ServerConfig::default()
        }
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_route() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(Arc::new(AppState::new()), &config_for(dir.path()));

        let (status, body) = get_body(app, "/health").await;
        assert_eq!(status, StatusCode::OK);

        let health: HealthResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(health.connections, 0);
        assert!(!health.timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_static_assets_and_index_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>poll</html>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        let app = router(Arc::new(AppState::new()), &config_for(dir.path()));

        let (status, body) = get_body(app.clone(), "/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log(1)");

        let (status, body) = get_body(app, "/teacher/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>poll</html>");
    }
}
