//! Axum router construction for the patient API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing middleware.

use std::sync::Arc;

use antrian_core::config::CorsConfig;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post, put};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /health` -- liveness probe
/// - `GET /ws/loket/{loket}` -- counter display stream
/// - `GET|POST /api/patients` -- list / register
/// - `GET|PUT /api/patients/{id}` -- fetch / replace
/// - `GET /api/patients/check/{name}` -- active registration by name
/// - `PUT /api/patients/{id}/status` -- set status
/// - `POST /api/patients/{id}/recall` -- re-announce a called patient
/// - `GET /api/patients/loket/{loket}` -- patients at a counter
/// - `GET /api/patients/loket/{loket}/next` -- next waiting patient
/// - `GET /api/stats` -- status counts
/// - `POST /api/reset` -- clear every record
pub fn build_router(state: Arc<AppState>, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws/loket/{loket}", get(ws::ws_loket))
        // REST API
        .route(
            "/api/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route(
            "/api/patients/{id}",
            get(handlers::get_patient).put(handlers::replace_patient),
        )
        .route("/api/patients/check/{name}", get(handlers::check_patient))
        .route("/api/patients/{id}/status", put(handlers::update_status))
        .route("/api/patients/{id}/recall", post(handlers::recall_patient))
        .route("/api/patients/loket/{loket}", get(handlers::list_by_loket))
        .route(
            "/api/patients/loket/{loket}/next",
            get(handlers::next_in_loket),
        )
        .route("/api/stats", get(handlers::stats))
        .route("/api/reset", post(handlers::reset))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the registration and display front-ends.
///
/// An empty origin list or a `*` entry allows any origin without
/// credentials; otherwise only the listed origins are allowed, with
/// credentials.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}
