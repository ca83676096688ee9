// Event ingestion HTTP route

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use pingpanda_core::{DeliveryStatus, PlanLimits};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::ErrorResponse;
use super::errors::ApiError;
use super::validation::{body_from_extractor, MAX_BODY_BYTES};
use crate::auth::{AuthAccount, AuthState};
use crate::notifications::Notifier;
use crate::services::IngestService;
use crate::storage::StorageBackend;

/// Request to ingest an event.
/// Documented shape only; the handler validates the raw body itself so
/// malformed JSON and schema violations get distinct status codes.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngestEventRequest {
    /// Name of a category that exists for the account.
    #[schema(example = "sale")]
    pub category: String,
    /// Flat mapping of field name to string, number or boolean.
    #[serde(default)]
    #[schema(value_type = Object, example = json!({"plan": "PRO", "email": "zoe.martinez2001@email.com", "amount": 49.00}))]
    pub fields: serde_json::Map<String, serde_json::Value>,
    /// Optional free-text description shown in the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "New PRO upgrade")]
    pub description: Option<String>,
}

/// Response for a successfully ingested event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestEventResponse {
    #[schema(example = "Event processed successfully")]
    pub message: String,
    /// ID of the stored event.
    pub event_id: Uuid,
    /// Outcome of the notification delivery.
    pub delivery_status: DeliveryStatus,
}

/// App state for event routes
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(db: Arc<StorageBackend>, notifier: Arc<dyn Notifier>, limits: PlanLimits) -> Self {
        Self {
            ingest: Arc::new(IngestService::new(db.clone(), notifier, limits)),
            auth: AuthState::new(db),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Create event routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/events", post(ingest_event))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// POST /v1/events - Ingest an event
#[utoipa::path(
    post,
    path = "/v1/events",
    request_body = IngestEventRequest,
    responses(
        (status = 201, description = "Event stored", body = IngestEventResponse),
        (status = 400, description = "Body is not valid JSON", body = ErrorResponse),
        (status = 401, description = "Missing, malformed or unknown API key", body = ErrorResponse),
        (status = 403, description = "Account has no Discord id", body = ErrorResponse),
        (status = 404, description = "Unknown category", body = ErrorResponse),
        (status = 422, description = "Body does not match the event shape or is too large", body = ErrorResponse),
        (status = 429, description = "Monthly quota reached", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = [])),
    tag = "events"
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    AuthAccount(account): AuthAccount,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<IngestEventResponse>), ApiError> {
    // Read failures are reported only after the delivery identifier check.
    let event = state
        .ingest
        .ingest(&account, body_from_extractor(body))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestEventResponse {
            message: "Event processed successfully".to_string(),
            event_id: event.id,
            delivery_status: event.delivery_status,
        }),
    ))
}
