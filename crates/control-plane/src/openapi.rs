// OpenAPI specification generation
//
// This module defines the OpenAPI spec for the PingPanda API.
// It can be used by both the main API server (for Swagger UI)
// and the export-openapi binary (for static spec generation).

use crate::api;
use crate::api::ErrorResponse;
use pingpanda_core::{DeliveryStatus, Plan, QuotaPeriod, QuotaUsage};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI documentation for the PingPanda API
#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api", description = "Default API prefix"),
    ),
    paths(
        api::events::ingest_event,
        api::usage::get_usage,
    ),
    components(
        schemas(
            api::events::IngestEventRequest,
            api::events::IngestEventResponse,
            DeliveryStatus,
            Plan, QuotaPeriod, QuotaUsage,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "events", description = "Event ingestion endpoints"),
        (name = "usage", description = "Quota usage endpoints")
    ),
    info(
        title = "PingPanda API",
        version = "0.1.0",
        description = "API for ingesting business events and forwarding them as Discord notifications",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

/// Registers the bearer API key scheme referenced by the paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("pp_<64 hex chars>")
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate the OpenAPI spec as a pretty-printed JSON string
    pub fn to_json() -> String {
        Self::openapi()
            .to_pretty_json()
            .expect("Failed to serialize OpenAPI spec")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_contains_routes() {
        let doc: serde_json::Value = serde_json::from_str(&ApiDoc::to_json()).unwrap();
        assert!(doc["paths"]["/v1/events"]["post"].is_object());
        assert!(doc["paths"]["/v1/usage"]["get"].is_object());
        assert!(doc["components"]["securitySchemes"]["api_key"].is_object());
        assert!(doc["components"]["schemas"]["IngestEventResponse"].is_object());
    }
}
