// Event ingestion service
//
// Runs the checks in contract order (authentication already happened in the
// extractor): delivery identifier, JSON syntax, shape, category, quota.
// The quota check and the event insert are one storage call.

use anyhow::Context;
use axum::body::Bytes;
use chrono::Utc;
use pingpanda_core::{format_message, Account, DeliveryStatus, Event, PlanLimits, QuotaPeriod};
use std::sync::Arc;
use tracing::{error, field, info, info_span, warn, Instrument, Span};

use super::account::row_to_category;
use crate::api::validation::{parse_json_body, validate_event_payload};
use crate::api::ApiError;
use crate::notifications::{EventNotification, Notifier};
use crate::storage::{CreateEventRow, QuotaInsert, StorageBackend};

pub struct IngestService {
    db: Arc<StorageBackend>,
    notifier: Arc<dyn Notifier>,
    limits: PlanLimits,
}

impl IngestService {
    pub fn new(db: Arc<StorageBackend>, notifier: Arc<dyn Notifier>, limits: PlanLimits) -> Self {
        Self {
            db,
            notifier,
            limits,
        }
    }

    /// Ingest one event for an authenticated account.
    ///
    /// `body` is the raw request body, or the error from reading it. Returns
    /// the stored event with its final delivery status. Delivery failures do
    /// not fail ingestion.
    pub async fn ingest(
        &self,
        account: &Account,
        body: Result<Bytes, ApiError>,
    ) -> Result<Event, ApiError> {
        let span = info_span!(
            "ingest_event",
            account_id = %account.id,
            category = field::Empty,
            event_id = field::Empty,
        );
        self.ingest_inner(account, body).instrument(span).await
    }

    async fn ingest_inner(
        &self,
        account: &Account,
        body: Result<Bytes, ApiError>,
    ) -> Result<Event, ApiError> {
        let recipient_id = account.delivery_target().ok_or_else(|| {
            warn!("Account has no Discord id, rejecting event");
            ApiError::Forbidden("Please enter your discord ID in your account settings".into())
        })?;

        let payload = validate_event_payload(parse_json_body(&body?)?)?;
        Span::current().record("category", payload.category.as_str());

        let category = self
            .db
            .get_event_category_by_name(account.id, &payload.category)
            .await?
            .map(row_to_category)
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "You don't have a category named \"{}\"",
                    payload.category
                ))
            })?;

        let formatted_message = format_message(&category.name, payload.description.as_deref());
        let fields_json =
            serde_json::to_value(&payload.fields).context("Failed to encode event fields")?;

        let created_at = Utc::now();
        let period = QuotaPeriod::containing(created_at);
        let limit = i32::try_from(self.limits.monthly_events(account.plan)).unwrap_or(i32::MAX);

        let input = CreateEventRow {
            account_id: account.id,
            category_id: category.id,
            category_name: category.name.clone(),
            fields: fields_json,
            description: payload.description.clone(),
            formatted_message,
            created_at,
        };

        let (row, used) = match self
            .db
            .create_event_within_quota(input, limit)
            .await?
        {
            QuotaInsert::Created { event, used } => (event, used),
            QuotaInsert::Exceeded => {
                warn!(plan = %account.plan, limit, period = %period, "Monthly quota reached");
                return Err(ApiError::TooManyRequests(
                    "Monthly quota reached. Please upgrade your plan for more events".into(),
                ));
            }
        };

        Span::current().record("event_id", field::display(row.id));
        info!(used, limit, period = %period, "Event stored");

        let notification = EventNotification::new(
            row.id,
            recipient_id,
            &category,
            row.formatted_message.clone(),
            &payload.fields,
            row.created_at,
        );

        let delivery_status = match self.notifier.deliver(&notification).await {
            Ok(()) => DeliveryStatus::Delivered,
            Err(e) => {
                error!(
                    error = %e,
                    notifier = self.notifier.name(),
                    "Failed to deliver event notification"
                );
                DeliveryStatus::Failed
            }
        };

        // The event is committed at this point; a failed status write is
        // logged and the stored status stays pending.
        if let Err(e) = self
            .db
            .update_event_delivery_status(row.id, &delivery_status.to_string())
            .await
        {
            error!(error = %format!("{:#}", e), "Failed to record delivery status");
        }

        Ok(Event {
            id: row.id,
            account_id: row.account_id,
            category_id: row.category_id,
            category: row.category_name,
            fields: payload.fields,
            description: row.description,
            formatted_message: row.formatted_message,
            delivery_status,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::RecordingNotifier;
    use crate::services::ProvisioningService;
    use pingpanda_core::Plan;

    fn body(raw: &'static [u8]) -> Result<Bytes, ApiError> {
        Ok(Bytes::from_static(raw))
    }

    struct Fixture {
        db: Arc<StorageBackend>,
        notifier: Arc<RecordingNotifier>,
        service: IngestService,
        account: Account,
    }

    async fn fixture(discord_id: Option<&str>, limits: PlanLimits) -> Fixture {
        let db = Arc::new(StorageBackend::in_memory());
        let provisioning = ProvisioningService::new(db.clone());
        let (account, _key) = provisioning
            .create_account("owner@example.com", discord_id.map(str::to_string), Plan::Free)
            .await
            .unwrap();
        provisioning
            .create_category(account.id, "sale", Some(0x00ff00), Some("💰".into()))
            .await
            .unwrap();

        let notifier = Arc::new(RecordingNotifier::new());
        let service = IngestService::new(db.clone(), notifier.clone(), limits);
        Fixture {
            db,
            notifier,
            service,
            account,
        }
    }

    #[tokio::test]
    async fn test_ingest_stores_and_delivers() {
        let f = fixture(Some("4242"), PlanLimits::default()).await;

        let event = f
            .service
            .ingest(
                &f.account,
                body(br#"{"category": "sale", "fields": {"plan": "PRO", "amount": 49}}"#),
            )
            .await
            .unwrap();

        assert_eq!(event.category, "sale");
        assert_eq!(event.delivery_status, DeliveryStatus::Delivered);
        assert_eq!(event.formatted_message, "A new sale event has occurred!");

        let stored = f.db.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.delivery_status, "delivered");

        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient_id, "4242");
        assert_eq!(sent[0].title, "💰 Sale");
        assert_eq!(sent[0].fields.len(), 2);

        let count = f
            .db
            .get_quota_count(f.account.id, QuotaPeriod::current())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_missing_discord_id_wins_over_bad_body() {
        let f = fixture(None, PlanLimits::default()).await;
        let err = f
            .service
            .ingest(&f.account, body(b"not json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_missing_discord_id_wins_over_unreadable_body() {
        let f = fixture(None, PlanLimits::default()).await;
        let unreadable = Err(ApiError::UnprocessableEntity("too large".into()));
        let err = f.service.ingest(&f.account, unreadable).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_unreadable_body_is_reported_after_identity_checks() {
        let f = fixture(Some("4242"), PlanLimits::default()).await;
        let unreadable = Err(ApiError::BadRequest("connection reset".into()));
        let err = f.service.ingest(&f.account, unreadable).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(f.db.count_events_for_account(f.account.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_category() {
        let f = fixture(Some("4242"), PlanLimits::default()).await;
        let err = f
            .service
            .ingest(&f.account, body(br#"{"category": "refund"}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(f.db.count_events_for_account(f.account.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_quota_exhausted() {
        let f = fixture(Some("4242"), PlanLimits { free: 1, pro: 10 }).await;
        let sale = br#"{"category": "sale"}"#;

        f.service.ingest(&f.account, body(sale)).await.unwrap();
        let err = f.service.ingest(&f.account, body(sale)).await.unwrap_err();
        assert!(matches!(err, ApiError::TooManyRequests(_)));

        assert_eq!(f.db.count_events_for_account(f.account.id).await.unwrap(), 1);
        assert_eq!(f.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_event() {
        let db = Arc::new(StorageBackend::in_memory());
        let provisioning = ProvisioningService::new(db.clone());
        let (account, _) = provisioning
            .create_account("owner@example.com", Some("4242".into()), Plan::Pro)
            .await
            .unwrap();
        provisioning
            .create_category(account.id, "signup", None, None)
            .await
            .unwrap();

        let service = IngestService::new(
            db.clone(),
            Arc::new(RecordingNotifier::failing()),
            PlanLimits::default(),
        );
        let event = service
            .ingest(&account, body(br#"{"category": "signup", "description": "hello"}"#))
            .await
            .unwrap();

        assert_eq!(event.delivery_status, DeliveryStatus::Failed);
        assert_eq!(event.formatted_message, "hello");
        let stored = db.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.delivery_status, "failed");
        assert_eq!(
            db.get_quota_count(account.id, QuotaPeriod::current())
                .await
                .unwrap(),
            1
        );
    }
}
