// HTTP API routes
//
// This module contains all HTTP route handlers for the public API.
// Each submodule handles a specific resource type with its own AppState.

pub mod common;
pub mod errors;
pub mod events;
pub mod usage;
pub mod validation;

// Re-export common types
pub use common::ErrorResponse;
pub use errors::ApiError;
