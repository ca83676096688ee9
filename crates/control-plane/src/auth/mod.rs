// Authentication module
// Decision: API keys for programmatic access, hashed at rest

pub mod api_key;
pub mod middleware;

pub use middleware::{AuthAccount, AuthState};
