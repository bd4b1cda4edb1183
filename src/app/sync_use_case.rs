use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::app::catalog_fetcher::{CatalogFetcher, CatalogSummary};
use crate::app::mapping::{apply_mapping, OutcomeReport};
use crate::app::ports::{ImageCatalogPort, RecordStorePort};
use crate::error::Result;
use crate::types::ImageIndex;

/// Where a run currently is. A run only moves forward; any failure ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Fetching,
    Applying,
    Writing,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Fetching => "fetching",
            RunPhase::Applying => "applying",
            RunPhase::Writing => "writing",
            RunPhase::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Result of a complete sync run
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    /// None when the index was supplied instead of fetched.
    pub catalog: Option<CatalogSummary>,
    pub report: OutcomeReport,
    pub output_file: String,
}

/// Fetch -> apply -> write, with no retries and nothing persisted in between.
pub struct SyncUseCase {
    catalog: Arc<dyn ImageCatalogPort>,
    records: Arc<dyn RecordStorePort>,
}

impl SyncUseCase {
    pub fn new(catalog: Arc<dyn ImageCatalogPort>, records: Arc<dyn RecordStorePort>) -> Self {
        Self { catalog, records }
    }

    /// Runs the full pipeline. The output is written only when every phase
    /// before it succeeded.
    #[instrument(skip(self))]
    pub async fn run(&self, page_size: u32, max_pages: u32) -> Result<SyncResult> {
        info!(phase = %RunPhase::Fetching, "Fetching image catalog");
        let catalog = CatalogFetcher::new(self.catalog.clone())
            .fetch_catalog(page_size, max_pages)
            .await
            .map_err(|e| failed(RunPhase::Fetching, e))?;

        let mut result = self.apply_index(&catalog.index).await?;
        result.catalog = Some(catalog.summary);
        Ok(result)
    }

    /// Applies an already built index to the record store and writes the output.
    pub async fn apply_index(&self, index: &ImageIndex) -> Result<SyncResult> {
        apply_with_index(self.records.as_ref(), index).await
    }
}

/// Load -> apply -> write against `records`, for callers that already hold an index.
#[instrument(skip_all, fields(index = index.len()))]
pub async fn apply_with_index(records: &dyn RecordStorePort, index: &ImageIndex) -> Result<SyncResult> {
    info!(phase = %RunPhase::Applying, "Applying image mapping");
    let input = records
        .load_records()
        .await
        .map_err(|e| failed(RunPhase::Applying, e))?;
    let (mapped, report) =
        apply_mapping(index, &input).map_err(|e| failed(RunPhase::Applying, e))?;

    info!(phase = %RunPhase::Writing, "Writing translated records");
    let output_file = records
        .write_records(&mapped)
        .await
        .map_err(|e| failed(RunPhase::Writing, e))?;

    info!(phase = %RunPhase::Done, output = %output_file, "Sync finished");
    Ok(SyncResult {
        catalog: None,
        report,
        output_file,
    })
}

fn failed(phase: RunPhase, err: crate::error::SyncError) -> crate::error::SyncError {
    error!(%phase, "Sync failed: {}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::types::{ImageEntry, ImagesPage, ListImagesResponse, RecordCollection};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    struct StaticCatalog(Vec<ImageEntry>);

    #[async_trait]
    impl ImageCatalogPort for StaticCatalog {
        async fn list_images(&self, page: u32, _per_page: u32) -> Result<ListImagesResponse> {
            let images = if page == 1 { self.0.clone() } else { vec![] };
            Ok(ListImagesResponse {
                success: true,
                result: Some(ImagesPage::new(images)),
                ..Default::default()
            })
        }
    }

    struct MemoryStore {
        input: RecordCollection,
        written: Mutex<Option<RecordCollection>>,
    }

    #[async_trait]
    impl RecordStorePort for MemoryStore {
        async fn load_records(&self) -> Result<RecordCollection> {
            Ok(self.input.clone())
        }

        async fn write_records(&self, records: &RecordCollection) -> Result<String> {
            *self.written.lock().await = Some(records.clone());
            Ok("memory".to_string())
        }
    }

    fn store(input: RecordCollection) -> Arc<MemoryStore> {
        Arc::new(MemoryStore {
            input,
            written: Mutex::new(None),
        })
    }

    #[tokio::test]
    async fn test_run_writes_translated_records() {
        let catalog = Arc::new(StaticCatalog(vec![ImageEntry::new("cat.png", "id-1")]));
        let records = store(vec![json!({"image": "cat.png"}), json!({"image": "fox.png"})]);
        let use_case = SyncUseCase::new(catalog, records.clone());

        let result = use_case.run(100, 10).await.unwrap();

        assert_eq!(result.output_file, "memory");
        assert_eq!(result.report.translated, 1);
        assert_eq!(result.report.not_found, 1);
        assert_eq!(result.catalog.unwrap().distinct_filenames, 1);
        assert_eq!(
            records.written.lock().await.clone().unwrap(),
            vec![json!({"image": "id-1"}), json!({"image": "fox.png"})]
        );
    }

    #[tokio::test]
    async fn test_malformed_record_writes_nothing() {
        let catalog = Arc::new(StaticCatalog(vec![ImageEntry::new("cat.png", "id-1")]));
        let records = store(vec![json!({"image": "cat.png"}), json!({"image": ["cat.png"]})]);
        let use_case = SyncUseCase::new(catalog, records.clone());

        let err = use_case.run(100, 10).await.unwrap_err();

        assert!(matches!(err, SyncError::MalformedRecord { position: 1, .. }));
        assert!(records.written.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_apply_index_skips_fetch() {
        let catalog = Arc::new(StaticCatalog(vec![]));
        let records = store(vec![json!({"image": "dog.png"})]);
        let use_case = SyncUseCase::new(catalog, records.clone());
        let index: ImageIndex = [("dog.png", "id-2")].into_iter().collect();

        let result = use_case.apply_index(&index).await.unwrap();

        assert!(result.catalog.is_none());
        assert_eq!(result.report.translated, 1);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RunPhase::Fetching.to_string(), "fetching");
        assert_eq!(RunPhase::Done.to_string(), "done");
    }
}
