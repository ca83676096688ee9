// Log-only notifier for dev mode (no bot token configured)

use async_trait::async_trait;
use tracing::info;

use super::{DeliveryError, EventNotification, Notifier};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, notification: &EventNotification) -> Result<(), DeliveryError> {
        info!(
            event_id = %notification.event_id,
            recipient_id = %notification.recipient_id,
            title = %notification.title,
            fields = notification.fields.len(),
            "{}",
            notification.description
        );
        Ok(())
    }
}
