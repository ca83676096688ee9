// Services layer for business logic
// Services own the ingestion sequence and validation, calling storage directly

pub mod account;
pub mod ingest;
pub mod usage;

pub use account::ProvisioningService;
pub use ingest::IngestService;
pub use usage::UsageService;
