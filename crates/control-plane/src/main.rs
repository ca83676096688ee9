// PingPanda API server
// Decision: PostgreSQL when DATABASE_URL is set, otherwise dev mode with in-memory storage
// Decision: Discord delivery when DISCORD_BOT_TOKEN is set, otherwise notifications are logged

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use pingpanda_control_plane::{
    build_router, config::AppConfig, notifier_from_config, openapi::ApiDoc,
    storage::StorageBackend, AppContext, ProvisioningService,
};
use pingpanda_core::telemetry::{init_telemetry, TelemetryConfig};
use pingpanda_core::Plan;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize telemetry with OpenTelemetry support
    // Configure via environment variables:
    // - OTEL_SERVICE_NAME: Service name (default: "pingpanda-control-plane")
    // - OTEL_EXPORTER_OTLP_ENDPOINT: OTLP endpoint (e.g., "http://localhost:4317")
    // - RUST_LOG: Log filter (default: "pingpanda_control_plane=debug,tower_http=debug")
    let mut telemetry_config = TelemetryConfig::from_env()
        .with_default_service_name("pingpanda-control-plane")
        .with_default_filter("pingpanda_control_plane=debug,tower_http=debug");
    telemetry_config.service_version = Some(env!("CARGO_PKG_VERSION").to_string());

    // Keep the guard alive for the lifetime of the application
    let _telemetry_guard = init_telemetry(telemetry_config);

    tracing::info!("pingpanda-control-plane starting...");

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let storage = match &config.database_url {
        Some(url) => {
            let storage = StorageBackend::postgres(url, config.database_max_connections)
                .await
                .context("Failed to connect to database")?;
            tracing::info!(
                max_connections = config.database_max_connections,
                "Connected to database, migrations applied"
            );
            storage
        }
        None => {
            tracing::warn!("DATABASE_URL not set, running in dev mode with in-memory storage");
            StorageBackend::in_memory()
        }
    };
    let storage = Arc::new(storage);

    if storage.is_dev_mode() {
        seed_dev_data(storage.clone(), &config.dev_discord_id).await?;
    }

    let notifier = notifier_from_config(config.discord.clone())
        .context("Failed to create notifier")?;
    tracing::info!(notifier = notifier.name(), "Notification delivery configured");
    tracing::info!(
        free = config.plan_limits.free,
        pro = config.plan_limits.pro,
        "Monthly event quotas"
    );

    let ctx = AppContext::new(storage, notifier, config.plan_limits);

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }

    let app = build_router(&ctx, &config.api_prefix);

    // Add Swagger UI
    let app =
        app.merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    // Load CORS allowed origins (optional)
    // Only needed when the dashboard is served from a different origin than the API
    let cors_origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let app = if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
        app
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]),
        )
    };

    // Add tracing
    let app = app.layer(TraceLayer::new_for_http());

    // Start HTTP server
    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.http_addr))?;
    tracing::info!("HTTP server listening on {}", config.http_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Seed a demo account and a "sale" category so the API can be tried locally.
async fn seed_dev_data(storage: Arc<StorageBackend>, discord_id: &str) -> Result<()> {
    let provisioning = ProvisioningService::new(storage);

    let (account, key) = provisioning
        .create_account("demo@pingpanda.dev", Some(discord_id.to_string()), Plan::Free)
        .await
        .context("Failed to seed dev account")?;
    provisioning
        .create_category(account.id, "sale", Some(0x00ff00), Some("💰".to_string()))
        .await
        .context("Failed to seed dev category")?;

    tracing::info!(
        account_id = %account.id,
        api_key = %key.key,
        "Dev mode: seeded demo account with category \"sale\""
    );
    Ok(())
}
