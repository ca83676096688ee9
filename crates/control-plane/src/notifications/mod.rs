// Notification delivery
// Decision: Delivery runs after the event is committed; its outcome never
// changes the ingestion result, only the stored delivery status.

pub mod discord;
pub mod log;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pingpanda_core::{EventCategory, EventFields};
use thiserror::Error;
use uuid::Uuid;

pub use discord::{DiscordConfig, DiscordNotifier};
pub use log::LogNotifier;

/// Placeholder used for empty embed field values, which Discord rejects.
pub const EMPTY_FIELD_VALUE: &str = "\u{200B}";

/// Everything a notifier needs to render one event.
#[derive(Debug, Clone)]
pub struct EventNotification {
    pub event_id: Uuid,
    /// Delivery identifier of the account (Discord user id).
    pub recipient_id: String,
    pub title: String,
    pub description: String,
    pub color: Option<i32>,
    pub fields: Vec<NotificationField>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
}

impl EventNotification {
    pub fn new(
        event_id: Uuid,
        recipient_id: impl Into<String>,
        category: &EventCategory,
        formatted_message: impl Into<String>,
        fields: &EventFields,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let fields = fields
            .iter()
            .map(|(name, value)| {
                let value = value.to_string();
                NotificationField {
                    name: name.clone(),
                    value: if value.is_empty() {
                        EMPTY_FIELD_VALUE.to_string()
                    } else {
                        value
                    },
                }
            })
            .collect();

        Self {
            event_id,
            recipient_id: recipient_id.into(),
            title: category.notification_title(),
            description: formatted_message.into(),
            color: category.color,
            fields,
            timestamp,
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery channel unreachable: {0}")]
    Connection(String),
    #[error("delivery rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("unexpected delivery response: {0}")]
    InvalidResponse(String),
}

/// Delivers event notifications to an account's delivery identifier.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name for logs and health output.
    fn name(&self) -> &'static str;

    async fn deliver(&self, notification: &EventNotification) -> Result<(), DeliveryError>;
}

// =============================================================================
// Recording notifier
// =============================================================================

/// Notifier that keeps every notification in memory.
/// Used by router tests; can be switched to fail every delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<EventNotification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose deliveries always fail.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EventNotification> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, notification: &EventNotification) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Connection("recording notifier set to fail".into()));
        }
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pingpanda_core::FieldValue;

    fn category(emoji: Option<&str>, color: Option<i32>) -> EventCategory {
        EventCategory {
            id: Uuid::now_v7(),
            account_id: Uuid::now_v7(),
            name: "sale".to_string(),
            color,
            emoji: emoji.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_notification_from_event() {
        let mut fields = EventFields::new();
        fields.insert("plan".into(), FieldValue::from("PRO"));
        fields.insert("amount".into(), FieldValue::from(49i64));
        fields.insert("note".into(), FieldValue::from(""));

        let notification = EventNotification::new(
            Uuid::now_v7(),
            "1234",
            &category(Some("💰"), Some(0x00ff00)),
            "A new sale event has occurred!",
            &fields,
            Utc::now(),
        );

        assert_eq!(notification.title, "💰 Sale");
        assert_eq!(notification.color, Some(0x00ff00));
        assert_eq!(notification.recipient_id, "1234");
        assert_eq!(
            notification.fields,
            vec![
                NotificationField {
                    name: "amount".into(),
                    value: "49".into()
                },
                NotificationField {
                    name: "note".into(),
                    value: EMPTY_FIELD_VALUE.into()
                },
                NotificationField {
                    name: "plan".into(),
                    value: "PRO".into()
                },
            ]
        );
    }

    #[test]
    fn test_notification_default_emoji() {
        let notification = EventNotification::new(
            Uuid::now_v7(),
            "1234",
            &category(None, None),
            "hello",
            &EventFields::new(),
            Utc::now(),
        );
        assert_eq!(notification.title, "🔔 Sale");
        assert!(notification.fields.is_empty());
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notification = EventNotification::new(
            Uuid::now_v7(),
            "1234",
            &category(None, None),
            "hello",
            &EventFields::new(),
            Utc::now(),
        );

        let recorder = RecordingNotifier::new();
        recorder.deliver(&notification).await.unwrap();
        assert_eq!(recorder.sent().len(), 1);

        let failing = RecordingNotifier::failing();
        assert!(failing.deliver(&notification).await.is_err());
        assert!(failing.sent().is_empty());
    }
}
