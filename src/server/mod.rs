//! HTTP transport for the Check endpoint (ambient, §4.8).
//!
//! The core decision logic in [`crate::handler`] is transport-agnostic; this
//! module is a thin axum adapter exposing it as `POST /check` plus a
//! liveness probe at `GET /healthz`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::handler::{CheckRequest, Handler};
use crate::response::{render, Rendered};

/// Application state shared across handlers.
pub struct AppState {
    pub handler: Arc<Handler>,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Wire shape of a Check call over HTTP: the caller supplies the headers it
/// would otherwise hand to an ext_authz filter, plus the method being
/// authorized.
#[derive(Debug, Deserialize)]
struct CheckPayload {
    #[serde(default)]
    headers: HashMap<String, String>,
    method: String,
}

async fn check(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckPayload>,
) -> Response {
    let headers = payload
        .headers
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect();

    let request = CheckRequest {
        headers,
        method: payload.method,
    };

    let outcome = state.handler.check(&request).await;

    match render(&outcome) {
        Rendered::Allow { headers } => {
            let mut response = StatusCode::OK.into_response();
            for (name, value) in headers {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(&value),
                ) {
                    response.headers_mut().insert(name, value);
                }
            }
            response
        }
        Rendered::Deny { status, body } => {
            let status =
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(body)).into_response()
        }
    }
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/check", post(check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the Check endpoint.
pub async fn run(state: Arc<AppState>) -> Result<(), crate::Error> {
    let addr = format!("{}:{}", state.host, state.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("authz-sidecar listening on {}", addr);

    let app = build_router(state);
    axum::serve(listener, app)
        .await
        .map_err(|e| crate::Error::Server(e.to_string()))
}
