// Quota usage HTTP route

use axum::{
    extract::{FromRef, State},
    routing::get,
    Json, Router,
};
use pingpanda_core::{PlanLimits, QuotaUsage};
use std::sync::Arc;

use super::common::ErrorResponse;
use super::errors::ApiError;
use crate::auth::{AuthAccount, AuthState};
use crate::services::UsageService;
use crate::storage::StorageBackend;

/// App state for usage routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<UsageService>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(db: Arc<StorageBackend>, limits: PlanLimits) -> Self {
        Self {
            service: Arc::new(UsageService::new(db.clone(), limits)),
            auth: AuthState::new(db),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Create usage routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/usage", get(get_usage))
        .with_state(state)
}

/// GET /v1/usage - Current month quota usage
#[utoipa::path(
    get,
    path = "/v1/usage",
    responses(
        (status = 200, description = "Usage for the current calendar month", body = QuotaUsage),
        (status = 401, description = "Missing, malformed or unknown API key", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = [])),
    tag = "usage"
)]
pub async fn get_usage(
    State(state): State<AppState>,
    AuthAccount(account): AuthAccount,
) -> Result<Json<QuotaUsage>, ApiError> {
    let usage = state.service.current(&account).await?;
    Ok(Json(usage))
}
