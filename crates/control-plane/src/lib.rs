// PingPanda Control Plane Library
// Decision: Shared library for binaries (API server, provisioning tool, OpenAPI export)

use anyhow::Result;
use axum::{extract::State, routing::get, Json, Router};
use pingpanda_core::PlanLimits;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// API routes and types (shared for OpenAPI generation)
pub mod api;

// Authentication module
pub mod auth;

// Environment configuration
pub mod config;

// Notification delivery
pub mod notifications;

// Services layer
pub mod services;
pub use services::{IngestService, ProvisioningService, UsageService};

// Storage layer
pub mod storage;

// OpenAPI spec generation
pub mod openapi;

use notifications::{DiscordConfig, DiscordNotifier, LogNotifier, Notifier};
use storage::StorageBackend;

/// Shared dependencies for building the router
#[derive(Clone)]
pub struct AppContext {
    pub storage: Arc<StorageBackend>,
    pub notifier: Arc<dyn Notifier>,
    pub plan_limits: PlanLimits,
}

impl AppContext {
    pub fn new(
        storage: Arc<StorageBackend>,
        notifier: Arc<dyn Notifier>,
        plan_limits: PlanLimits,
    ) -> Self {
        Self {
            storage,
            notifier,
            plan_limits,
        }
    }
}

/// Discord when a bot token is configured, log-only otherwise.
pub fn notifier_from_config(discord: Option<DiscordConfig>) -> Result<Arc<dyn Notifier>> {
    match discord {
        Some(config) => Ok(Arc::new(DiscordNotifier::new(config)?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
}

/// State for health endpoint
#[derive(Clone)]
struct HealthState {
    storage: &'static str,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.storage.to_string(),
    })
}

/// Build the application router: health (not prefixed) plus prefixed API routes.
/// Swagger UI, CORS and request tracing are layered on by the server binary.
pub fn build_router(ctx: &AppContext, api_prefix: &str) -> Router {
    let events_state =
        api::events::AppState::new(ctx.storage.clone(), ctx.notifier.clone(), ctx.plan_limits);
    let usage_state = api::usage::AppState::new(ctx.storage.clone(), ctx.plan_limits);

    let api_routes = Router::new()
        .merge(api::events::routes(events_state))
        .merge(api::usage::routes(usage_state));

    let health_state = HealthState {
        storage: ctx.storage.kind(),
    };

    Router::new()
        .route("/health", get(health).with_state(health_state))
        .merge(build_router_with_prefix(api_routes, api_prefix))
}

/// Build router with optional API prefix
pub fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_routes() -> Router {
        Router::new().route("/v1/test", get(|| async { "ok" }))
    }

    fn context() -> AppContext {
        AppContext::new(
            Arc::new(StorageBackend::in_memory()),
            Arc::new(LogNotifier),
            PlanLimits::default(),
        )
    }

    #[tokio::test]
    async fn test_api_prefix_empty() {
        let app = build_router_with_prefix(test_routes(), "");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_api_prefix_set() {
        let app = build_router_with_prefix(test_routes(), "/api");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_health_is_not_prefixed() {
        let app = build_router(&context(), "/api");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.storage, "in-memory");
    }

    #[test]
    fn test_notifier_from_config() {
        assert_eq!(notifier_from_config(None).unwrap().name(), "log");
        let discord = notifier_from_config(Some(DiscordConfig::new("token"))).unwrap();
        assert_eq!(discord.name(), "discord");
    }
}
