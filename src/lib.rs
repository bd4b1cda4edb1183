pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod types;

// Layered boundaries: use cases and ports in `app`, adapters in `infra`
pub mod app;
pub mod infra;

pub use app::catalog_fetcher::{Catalog, CatalogFetcher, CatalogSummary};
pub use app::mapping::{apply_mapping, OutcomeReport, RecordOutcome};
pub use app::sync_use_case::{RunPhase, SyncResult, SyncUseCase};
pub use error::{Result, SyncError};
pub use types::{ImageEntry, ImageIndex, Record, RecordCollection};
