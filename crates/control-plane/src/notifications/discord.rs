// Discord direct-message notifier
//
// Delivery is two REST calls against the bot API: open (or reuse) the DM
// channel with the recipient, then post one embed to it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use super::{DeliveryError, EventNotification, Notifier};

pub const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";
pub const DEFAULT_DISCORD_TIMEOUT_SECS: u64 = 10;

/// Discord bot configuration
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub bot_token: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_url: DEFAULT_DISCORD_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_DISCORD_TIMEOUT_SECS),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }
}

#[derive(Debug, Serialize)]
struct CreateDmRequest<'a> {
    recipient_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct DmChannel {
    id: String,
}

#[derive(Debug, Serialize)]
struct CreateMessageRequest {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<i32>,
    timestamp: String,
    fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

impl From<&EventNotification> for Embed {
    fn from(notification: &EventNotification) -> Self {
        Self {
            title: notification.title.clone(),
            description: notification.description.clone(),
            color: notification.color,
            timestamp: notification.timestamp.to_rfc3339(),
            fields: notification
                .fields
                .iter()
                .map(|f| EmbedField {
                    name: f.name.clone(),
                    value: f.value.clone(),
                    inline: true,
                })
                .collect(),
        }
    }
}

/// Notifier posting embeds to Discord direct messages
pub struct DiscordNotifier {
    config: DiscordConfig,
    client: Client,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DeliveryError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, DeliveryError> {
        let url = self.url(path);
        debug!(url = %url, "Calling Discord API");

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, body = %body, "Discord API request failed");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn open_dm_channel(&self, recipient_id: &str) -> Result<String, DeliveryError> {
        let channel: DmChannel = self
            .post("/users/@me/channels", &CreateDmRequest { recipient_id })
            .await?
            .json()
            .await
            .map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;
        Ok(channel.id)
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn deliver(&self, notification: &EventNotification) -> Result<(), DeliveryError> {
        let channel_id = self.open_dm_channel(&notification.recipient_id).await?;

        let message = CreateMessageRequest {
            embeds: vec![Embed::from(notification)],
        };
        self.post(&format!("/channels/{}/messages", channel_id), &message)
            .await?;

        debug!(event_id = %notification.event_id, channel_id = %channel_id, "Discord message sent");
        Ok(())
    }
}
