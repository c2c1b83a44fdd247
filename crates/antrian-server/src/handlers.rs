//! REST API endpoint handlers for the patient queue.
//!
//! Every handler goes through the shared [`QueueStore`](antrian_core::QueueStore)
//! in [`AppState`]. Handlers that change a counter's list queue a display
//! broadcast after the store call returns; the response never waits for
//! delivery.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/patients` | List all patients |
//! | `POST` | `/api/patients` | Register a patient |
//! | `GET` | `/api/patients/{id}` | Get single patient |
//! | `PUT` | `/api/patients/{id}` | Replace a patient record |
//! | `GET` | `/api/patients/check/{name}` | Active registration by name |
//! | `PUT` | `/api/patients/{id}/status` | Set a patient's status |
//! | `POST` | `/api/patients/{id}/recall` | Re-announce a called patient |
//! | `GET` | `/api/patients/loket/{loket}` | Patients at a counter |
//! | `GET` | `/api/patients/loket/{loket}/next` | Next waiting patient |
//! | `GET` | `/api/stats` | Status counts |
//! | `POST` | `/api/reset` | Clear every record |

use std::sync::Arc;

use antrian_types::{
    Loket, NewPatient, Patient, PatientId, PatientUpdate, QueueStats, Specialty, StatusUpdate,
};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// /api/patients
// ---------------------------------------------------------------------------

/// List every patient in creation order.
pub async fn list_patients(State(state): State<Arc<AppState>>) -> Json<Vec<Patient>> {
    Json(state.store.all().await)
}

/// Register a patient and queue an update for their counter.
///
/// # Errors
///
/// Returns [`ApiError::InvalidInput`] for a malformed body or a blank
/// `specialist`.
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewPatient>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(input) = body?;
    let patient = state.store.create(input).await?;
    state.broadcaster.counter_changed(patient.loket_number.clone());
    Ok((StatusCode::CREATED, Json(patient)))
}

/// Get a single patient by ID.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] if the ID is unknown.
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let patient = state.store.get(&PatientId::from(id)).await?;
    Ok(Json(patient))
}

/// Replace a patient record and queue updates for every counter whose
/// list changed.
///
/// # Errors
///
/// Returns [`ApiError::InvalidInput`] for a malformed body or blank
/// `specialist`, or [`ApiError::NotFound`] if the ID is unknown.
pub async fn replace_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<PatientUpdate>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let Json(update) = body?;
    let replaced = state.store.replace(&PatientId::from(id), update).await?;
    for loket in replaced.affected_lokets() {
        state.broadcaster.counter_changed(loket);
    }
    Ok(Json(replaced.patient))
}

/// The most recent `waiting` or `called` registration under this exact
/// name, or `null`.
pub async fn check_patient(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Json<Option<Patient>> {
    Json(state.store.find_active_by_name(&name).await)
}

/// Set a patient's status and queue an update for their counter.
///
/// # Errors
///
/// Returns [`ApiError::InvalidInput`] for a malformed body or unknown
/// status value, or [`ApiError::NotFound`] if the ID is unknown.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let Json(StatusUpdate { status }) = body?;
    let patient = state.store.update_status(&PatientId::from(id), status).await?;
    state.broadcaster.counter_changed(patient.loket_number.clone());
    Ok(Json(patient))
}

/// Re-announce a called patient at their counter.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] if the ID is unknown, or
/// [`ApiError::InvalidState`] if the patient is not `called`.
pub async fn recall_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let patient = state.store.recall(&PatientId::from(id)).await?;
    info!(
        patient_id = %patient.id,
        queue_number = %patient.queue_number,
        loket = %patient.loket_number,
        "Recall triggered"
    );
    state.broadcaster.recall(patient.clone());
    Ok(Json(json!({
        "message": "Recall triggered",
        "patient": patient,
    })))
}

// ---------------------------------------------------------------------------
// /api/patients/loket/{loket}
// ---------------------------------------------------------------------------

/// Every patient at a counter, in creation order.
pub async fn list_by_loket(
    State(state): State<Arc<AppState>>,
    Path(loket): Path<String>,
) -> Json<Vec<Patient>> {
    Json(state.store.list_by_counter(&Loket::from(loket)).await)
}

/// The oldest waiting patient at a counter, or a message when none is
/// waiting.
pub async fn next_in_loket(
    State(state): State<Arc<AppState>>,
    Path(loket): Path<String>,
) -> Response {
    match state.store.next_waiting(&Loket::from(loket)).await {
        Some(patient) => Json(patient).into_response(),
        None => Json(json!({ "message": "No waiting queue" })).into_response(),
    }
}

// ---------------------------------------------------------------------------
// /api/stats and /api/reset
// ---------------------------------------------------------------------------

/// Status counts over every patient.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<QueueStats> {
    Json(state.store.stats().await)
}

/// Clear every record and push an empty list to every counter.
pub async fn reset(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.store.reset().await;
    for specialty in Specialty::ALL {
        state.broadcaster.counter_changed(specialty.loket());
    }
    Json(json!({ "message": "Data reset successfully" }))
}
