// PingPanda core domain
//
// DB-agnostic entity types shared by the API server and tooling:
// - Account and Plan (who sends events, and how many they may send)
// - EventCategory (named bucket an event is filed under)
// - Event, FieldValue and DeliveryStatus (what gets ingested)
// - QuotaPeriod and QuotaUsage (calendar-month accounting)

pub mod account;
pub mod category;
pub mod event;
pub mod quota;

// Telemetry (tracing subscriber + optional OTLP export)
pub mod telemetry;

pub use account::{Account, Plan, PlanLimits};
pub use category::{validate_category_name, CategoryNameError, EventCategory};
pub use event::{format_message, DeliveryStatus, Event, EventFields, FieldValue};
pub use quota::{QuotaPeriod, QuotaUsage};
