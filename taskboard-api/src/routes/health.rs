/// Banner and health check endpoints
///
/// # Endpoints
///
/// - `GET /` - API banner with endpoint map
/// - `GET /health` - liveness plus store connectivity
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "backend": "postgres",
///   "store": "connected"
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    /// Store backend name
    pub backend: String,

    /// `connected` or `disconnected`
    pub store: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndpointMap {
    pub auth: String,
    pub tasks: String,
    pub users: String,
    pub stats: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub message: String,
    pub version: String,
    pub endpoints: EndpointMap,
}

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "Task Manager API is running!".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: EndpointMap {
            auth: "/api/auth".to_string(),
            tasks: "/api/tasks".to_string(),
            users: "/api/users".to_string(),
            stats: "/api/stats".to_string(),
        },
    })
}

/// Reports `degraded` rather than failing when the store is unreachable
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = match state.store.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.store.backend().to_string(),
        store: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}
