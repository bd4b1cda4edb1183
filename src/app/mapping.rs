use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::constants::IMAGE_FIELD;
use crate::error::{Result, SyncError};
use crate::observability::metrics::mapping as mapping_metrics;
use crate::types::{ImageIndex, Record, RecordCollection};

/// What happened to one record during the mapping pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    Translated { filename: String, identifier: String },
    NotFound { filename: String },
    Untouched,
}

/// Per-record outcomes for one pass, in input order, with running totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeReport {
    pub translated: usize,
    pub not_found: usize,
    pub untouched: usize,
    pub outcomes: Vec<RecordOutcome>,
}

impl OutcomeReport {
    fn record(&mut self, outcome: RecordOutcome) {
        match &outcome {
            RecordOutcome::Translated { .. } => self.translated += 1,
            RecordOutcome::NotFound { .. } => self.not_found += 1,
            RecordOutcome::Untouched => self.untouched += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Distinct filenames that had no identifier, in first-seen order.
    pub fn missing_filenames(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                RecordOutcome::NotFound { filename } => Some(filename.as_str()),
                _ => None,
            })
            .filter(|f| seen.insert(*f))
            .collect()
    }
}

/// Substitutes every record's `image` filename with its catalog identifier.
///
/// Returns a new collection of the same length and order; `records` is left as is.
/// A filename missing from the index is reported, not treated as a failure. An
/// `image` value that is neither a string nor null fails the whole pass.
#[instrument(skip_all, fields(records = records.len(), index = index.len()))]
pub fn apply_mapping(
    index: &ImageIndex,
    records: &[Record],
) -> Result<(RecordCollection, OutcomeReport)> {
    let mut output = Vec::with_capacity(records.len());
    let mut report = OutcomeReport::default();

    for (position, record) in records.iter().enumerate() {
        let (mapped, outcome) = map_record(index, position, record)?;
        match &outcome {
            RecordOutcome::Translated { filename, identifier } => {
                debug!(position, %filename, %identifier, "Translated image reference");
            }
            RecordOutcome::NotFound { filename } => {
                warn!(position, %filename, "No image id found for filename");
            }
            RecordOutcome::Untouched => {}
        }
        output.push(mapped);
        report.record(outcome);
    }

    mapping_metrics::pass_completed(report.translated, report.not_found, report.untouched);
    info!(
        translated = report.translated,
        not_found = report.not_found,
        untouched = report.untouched,
        "Mapping pass finished"
    );
    Ok((output, report))
}

fn map_record(index: &ImageIndex, position: usize, record: &Record) -> Result<(Record, RecordOutcome)> {
    let fields = record.as_object().ok_or_else(|| SyncError::MalformedRecord {
        position,
        reason: format!("expected a JSON object, found {}", json_kind(record)),
    })?;

    let filename = match fields.get(IMAGE_FIELD) {
        None | Some(Value::Null) => return Ok((record.clone(), RecordOutcome::Untouched)),
        Some(Value::String(s)) if s.is_empty() => {
            return Ok((record.clone(), RecordOutcome::Untouched))
        }
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(SyncError::MalformedRecord {
                position,
                reason: format!("`{}` must be a string, found {}", IMAGE_FIELD, json_kind(other)),
            })
        }
    };

    match index.get(filename) {
        Some(identifier) => {
            let mut mapped = fields.clone();
            mapped.insert(IMAGE_FIELD.to_string(), Value::String(identifier.to_string()));
            Ok((
                Value::Object(mapped),
                RecordOutcome::Translated {
                    filename: filename.clone(),
                    identifier: identifier.to_string(),
                },
            ))
        }
        None => Ok((
            record.clone(),
            RecordOutcome::NotFound {
                filename: filename.clone(),
            },
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
