use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ListImagesResponse, RecordCollection};

/// "Give me page N of size S" against the remote image catalog.
///
/// Implementations return the service envelope as-is when the service answered;
/// transport failures come back as `SyncError::RemoteUnavailable`. Interpreting the
/// envelope's `success` flag is left to the caller.
#[async_trait]
pub trait ImageCatalogPort: Send + Sync {
    async fn list_images(&self, page: u32, per_page: u32) -> Result<ListImagesResponse>;
}

/// Where the record collection comes from and where the translated one goes.
#[async_trait]
pub trait RecordStorePort: Send + Sync {
    async fn load_records(&self) -> Result<RecordCollection>;

    /// Persists the translated collection as a new artifact. Called at most once
    /// per run and only after every record was processed.
    async fn write_records(&self, records: &RecordCollection) -> Result<String>;
}
