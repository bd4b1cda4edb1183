use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::app::ports::ImageCatalogPort;
use crate::constants::MAX_PAGE_SIZE;
use crate::error::{Result, SyncError};
use crate::observability::metrics::catalog as catalog_metrics;
use crate::types::{ImageIndex, ResultInfo};

/// Counters describing one catalog fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub pages_fetched: u32,
    /// Entries received across all pages, duplicates included.
    pub entries_received: usize,
    /// Distinct filenames in the resulting index.
    pub distinct_filenames: usize,
    /// Filenames that appeared more than once; the last identifier was kept.
    pub duplicate_filenames: usize,
    /// False when the page limit stopped the listing before the service ran out.
    pub exhausted: bool,
}

/// The fetched index together with how it was obtained.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub index: ImageIndex,
    pub summary: CatalogSummary,
}

/// Builds a complete filename -> identifier index from the paginated listing.
pub struct CatalogFetcher {
    port: Arc<dyn ImageCatalogPort>,
}

impl CatalogFetcher {
    pub fn new(port: Arc<dyn ImageCatalogPort>) -> Self {
        Self { port }
    }

    /// Fetches pages `1..=max_pages` until the service reports no further results.
    ///
    /// Any remote failure aborts the whole fetch; a partially built index is
    /// never handed back.
    #[instrument(skip(self))]
    pub async fn fetch_catalog(&self, page_size: u32, max_pages: u32) -> Result<Catalog> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(SyncError::Config(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, page_size
            )));
        }
        if max_pages == 0 {
            return Err(SyncError::Config("max_pages must be at least 1".into()));
        }

        let _timing = catalog_metrics::fetch_timer();
        let mut index = ImageIndex::new();
        let mut summary = CatalogSummary::default();

        for page in 1..=max_pages {
            let response = match self.port.list_images(page, page_size).await {
                Ok(r) => r,
                Err(e) => {
                    catalog_metrics::fetch_failed("unavailable");
                    return Err(e);
                }
            };

            if !response.success {
                warn!(page, errors = ?response.errors, "Image service reported failure");
                catalog_metrics::fetch_failed("rejected");
                return Err(SyncError::RemoteRejected {
                    errors: response.errors,
                });
            }

            let images = match response.result.and_then(|r| r.images) {
                Some(images) => images,
                None => {
                    warn!(page, "Success envelope carried no image list");
                    catalog_metrics::fetch_failed("unavailable");
                    return Err(SyncError::RemoteUnavailable {
                        reason: format!("success envelope without result images on page {}", page),
                    });
                }
            };
            let received = images.len();
            summary.pages_fetched = page;
            summary.entries_received += received;
            catalog_metrics::page_fetched(received);
            debug!(page, received, "Fetched catalog page");

            for entry in images {
                if let Some(previous) = index.insert(entry) {
                    summary.duplicate_filenames += 1;
                    debug!(replaced = %previous, "Duplicate filename in catalog, keeping later id");
                }
            }

            if is_last_page(page, page_size, received, summary.entries_received, response.result_info.as_ref()) {
                summary.exhausted = true;
                break;
            }
        }

        if !summary.exhausted {
            warn!(
                max_pages,
                page_size,
                "Stopped listing at the page limit; the catalog may have more images"
            );
        }

        summary.distinct_filenames = index.len();
        info!(
            pages = summary.pages_fetched,
            entries = summary.entries_received,
            distinct = summary.distinct_filenames,
            "Catalog fetched"
        );
        Ok(Catalog { index, summary })
    }
}

fn is_last_page(
    page: u32,
    page_size: u32,
    received: usize,
    received_total: usize,
    info: Option<&ResultInfo>,
) -> bool {
    if received == 0 || received < page_size as usize {
        return true;
    }
    match info {
        Some(ResultInfo { total_pages: Some(total), .. }) if page >= *total => true,
        Some(ResultInfo { total_count: Some(total), .. }) if received_total as u64 >= *total => true,
        _ => false,
    }
}
