use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::ports::RecordStorePort;
use crate::config::same_location;
use crate::error::{Result, SyncError};
use crate::types::RecordCollection;

/// Reads the record collection from one JSON file and writes the translated
/// collection to another.
pub struct JsonFileRecordStore {
    input: PathBuf,
    output: PathBuf,
}

impl JsonFileRecordStore {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Result<Self> {
        let input = input.into();
        let output = output.into();
        if same_location(&input, &output) {
            return Err(SyncError::Config(format!(
                "refusing to overwrite input file '{}'",
                input.display()
            )));
        }
        Ok(Self { input, output })
    }
}

#[async_trait]
impl RecordStorePort for JsonFileRecordStore {
    async fn load_records(&self) -> Result<RecordCollection> {
        let bytes = tokio::fs::read(&self.input).await?;
        let records = parse_collection(&bytes)?;
        info!("Loaded {} records from {}", records.len(), self.input.display());
        Ok(records)
    }

    async fn write_records(&self, records: &RecordCollection) -> Result<String> {
        let body = serde_json::to_string_pretty(records)?;
        write_atomically(&self.output, body.as_bytes()).await?;
        info!("Wrote {} records to {}", records.len(), self.output.display());
        Ok(self.output.display().to_string())
    }
}

/// Parses a file body that must hold a top-level JSON array.
pub fn parse_collection(bytes: &[u8]) -> Result<RecordCollection> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    match value {
        serde_json::Value::Array(records) => Ok(records),
        other => Err(SyncError::InvalidInput(format!(
            "expected a JSON array of records, found {}",
            match other {
                serde_json::Value::Object(_) => "an object",
                serde_json::Value::String(_) => "a string",
                serde_json::Value::Number(_) => "a number",
                serde_json::Value::Bool(_) => "a boolean",
                _ => "null",
            }
        ))),
    }
}

/// Writes to a sibling temp file and renames it over `path`, so a failed write
/// never leaves a half-written artifact behind.
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
