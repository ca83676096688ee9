// Configuration loading and parsing
//
// All settings come from the environment (optionally via a .env file loaded
// by the binary). Unset and empty variables fall back to defaults.

use anyhow::{Context, Result};
use pingpanda_core::PlanLimits;
use std::time::Duration;

use crate::notifications::discord::{
    DiscordConfig, DEFAULT_DISCORD_API_URL, DEFAULT_DISCORD_TIMEOUT_SECS,
};

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:9000";
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_DEV_DISCORD_ID: &str = "000000000000000000";

/// Server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL URL. `None` runs in dev mode with in-memory storage.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub http_addr: String,
    /// Path prefix for API routes; empty means no prefix.
    pub api_prefix: String,
    pub cors_allowed_origins: Vec<String>,
    pub plan_limits: PlanLimits,
    /// Discord bot settings. `None` logs notifications instead of sending them.
    pub discord: Option<DiscordConfig>,
    /// Discord id given to the demo account seeded in dev mode.
    pub dev_discord_id: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let defaults = PlanLimits::default();
        let plan_limits = PlanLimits {
            free: parse_or(
                get("FREE_PLAN_MONTHLY_EVENTS"),
                defaults.free,
                "FREE_PLAN_MONTHLY_EVENTS",
            )?,
            pro: parse_or(
                get("PRO_PLAN_MONTHLY_EVENTS"),
                defaults.pro,
                "PRO_PLAN_MONTHLY_EVENTS",
            )?,
        };

        let discord = match get("DISCORD_BOT_TOKEN") {
            Some(token) => {
                let timeout = parse_or(
                    get("DISCORD_TIMEOUT_SECS"),
                    DEFAULT_DISCORD_TIMEOUT_SECS,
                    "DISCORD_TIMEOUT_SECS",
                )?;
                Some(
                    DiscordConfig::new(token.trim())
                        .with_api_url(
                            get("DISCORD_API_URL")
                                .unwrap_or_else(|| DEFAULT_DISCORD_API_URL.to_string()),
                        )
                        .with_timeout(Duration::from_secs(timeout)),
                )
            }
            None => None,
        };

        // API_PREFIX set to an empty string disables the prefix.
        let api_prefix = normalize_prefix(
            &lookup("API_PREFIX").unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
        );

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(
                get("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_DATABASE_MAX_CONNECTIONS,
                "DATABASE_MAX_CONNECTIONS",
            )?,
            http_addr: get("HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string()),
            api_prefix,
            cors_allowed_origins,
            plan_limits,
            discord,
            dev_discord_id: get("DEV_DISCORD_ID")
                .map(|id| id.trim().to_string())
                .unwrap_or_else(|| DEFAULT_DEV_DISCORD_ID.to_string()),
        })
    }
}

fn parse_or<T>(value: Option<String>, default: T, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, v)),
        None => Ok(default),
    }
}

/// "/api/" -> "/api", "api" -> "/api", "/" -> ""
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
