// Authentication extractor
// Decision: Programmatic access only, via "Authorization: Bearer <API_KEY>"
// Decision: Every request re-reads the account, no in-process cache

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use pingpanda_core::{Account, Plan};
use std::sync::Arc;

use super::api_key::{hash_api_key, is_valid_api_key_format};
use crate::api::ApiError;
use crate::storage::{AccountRow, StorageBackend};

const BEARER_PREFIX: &str = "Bearer ";

/// Auth state shared across routes
#[derive(Clone)]
pub struct AuthState {
    pub db: Arc<StorageBackend>,
}

impl AuthState {
    pub fn new(db: Arc<StorageBackend>) -> Self {
        Self { db }
    }
}

/// Authenticated account extracted from the request.
/// Rejects with 401 when the header is missing, malformed or unknown.
#[derive(Debug, Clone)]
pub struct AuthAccount(pub Account);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthAccount
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let token = bearer_token(&parts.headers)?;
        let account = authenticate(token, &auth_state).await?;
        Ok(AuthAccount(account))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid authorization header".to_string()))?;

    let token = value.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
        ApiError::Unauthorized(
            "Invalid auth header format. Expected: 'Bearer [API_KEY]'".to_string(),
        )
    })?;

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::Unauthorized("Invalid API key".to_string()));
    }

    Ok(token)
}

/// Resolve an API key to its account.
async fn authenticate(key: &str, auth_state: &AuthState) -> Result<Account, ApiError> {
    if !is_valid_api_key_format(key) {
        tracing::debug!("Rejected API key with invalid format");
        return Err(ApiError::Unauthorized("Invalid API key".to_string()));
    }

    let row = auth_state
        .db
        .get_account_by_api_key_hash(&hash_api_key(key))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid API key".to_string()))?;

    Ok(row_to_account(row))
}

pub fn row_to_account(row: AccountRow) -> Account {
    Account {
        id: row.id,
        email: row.email,
        api_key_prefix: row.api_key_prefix,
        discord_id: row.discord_id,
        plan: Plan::from(row.plan.as_str()),
        created_at: row.created_at,
    }
}
