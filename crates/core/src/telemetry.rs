// Telemetry setup
//
// Console logging through tracing-subscriber, plus OTLP span export when
// OTEL_EXPORTER_OTLP_ENDPOINT is set. Every binary calls init_telemetry
// once at start-up and holds the returned guard until exit.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider, Tracer},
    Resource,
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Default service name reported in traces.
pub const DEFAULT_SERVICE_NAME: &str = "pingpanda";

/// Filter used when neither RUST_LOG nor LOG_LEVEL is usable.
pub const DEFAULT_LOG_FILTER: &str = "info";

const OTLP_EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Logging and trace export settings
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: Option<String>,
    /// OTLP gRPC endpoint, e.g. "http://localhost:4317". `None` disables export.
    pub otlp_endpoint: Option<String>,
    /// Deployment environment, e.g. "production"
    pub environment: Option<String>,
    /// Filter directives, e.g. "pingpanda_control_plane=debug,tower_http=info"
    pub log_filter: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: None,
            otlp_endpoint: None,
            environment: None,
            log_filter: None,
        }
    }
}

impl TelemetryConfig {
    /// Read `OTEL_SERVICE_NAME`, `OTEL_SERVICE_VERSION`,
    /// `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_ENVIRONMENT` and
    /// `RUST_LOG` (falling back to `LOG_LEVEL`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            service_name: get("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            service_version: get("OTEL_SERVICE_VERSION"),
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
            environment: get("OTEL_ENVIRONMENT"),
            log_filter: get("RUST_LOG").or_else(|| get("LOG_LEVEL")),
        }
    }

    /// Rename the service unless OTEL_SERVICE_NAME chose one explicitly.
    pub fn with_default_service_name(mut self, name: &str) -> Self {
        if self.service_name == DEFAULT_SERVICE_NAME {
            self.service_name = name.to_string();
        }
        self
    }

    /// Use `filter` unless RUST_LOG / LOG_LEVEL set one.
    pub fn with_default_filter(mut self, filter: &str) -> Self {
        if self.log_filter.is_none() {
            self.log_filter = Some(filter.to_string());
        }
        self
    }

    fn env_filter(&self) -> EnvFilter {
        self.log_filter
            .as_deref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
    }

    fn resource(&self) -> Resource {
        let mut attributes = vec![KeyValue::new("service.name", self.service_name.clone())];
        if let Some(version) = &self.service_version {
            attributes.push(KeyValue::new("service.version", version.clone()));
        }
        if let Some(environment) = &self.environment {
            attributes.push(KeyValue::new("deployment.environment", environment.clone()));
        }
        Resource::builder().with_attributes(attributes).build()
    }
}

/// Flushes and shuts down span export on drop
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shutdown tracer provider: {:?}", e);
            }
        }
    }
}

/// Install the global subscriber. Keep the returned guard alive until exit.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(config.env_filter());

    let export = config
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| build_otlp_tracer(endpoint, &config));

    let (provider, otel_layer, export_error) = match export {
        Some(Ok((provider, tracer))) => (
            Some(provider),
            Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            None,
        ),
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(otel_layer)
        .init();

    match (&config.otlp_endpoint, export_error) {
        (Some(_), Some(e)) => {
            tracing::warn!(error = %e, "OTLP export unavailable, continuing with console logs only")
        }
        (Some(endpoint), None) => {
            tracing::info!(
                endpoint = %endpoint,
                service = %config.service_name,
                "OTLP span export enabled"
            )
        }
        (None, _) => tracing::debug!("OTLP span export disabled"),
    }

    TelemetryGuard { provider }
}

fn build_otlp_tracer(
    endpoint: &str,
    config: &TelemetryConfig,
) -> anyhow::Result<(SdkTracerProvider, Tracer)> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(OTLP_EXPORT_TIMEOUT)
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(config.resource())
        .build();

    let tracer = provider.tracer(config.service_name.clone());
    Ok((provider, tracer))
}
