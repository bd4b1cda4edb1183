use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single record from the local dataset. Records are opaque JSON objects;
/// only the `image` field is ever inspected.
pub type Record = serde_json::Value;

/// Ordered record set, as read from the input file.
pub type RecordCollection = Vec<Record>;

/// One uploaded image as listed by the image service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub filename: String,
    #[serde(rename = "id")]
    pub identifier: String,
}

impl ImageEntry {
    pub fn new(filename: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            identifier: identifier.into(),
        }
    }
}

/// Filename -> identifier lookup built from the remote catalog.
///
/// Backed by a `BTreeMap` so dumps and log output come out in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageIndex {
    entries: BTreeMap<String, String>,
}

impl ImageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry; a later entry for the same filename replaces the earlier one.
    /// Returns the identifier that was replaced, if any.
    pub fn insert(&mut self, entry: ImageEntry) -> Option<String> {
        self.entries.insert(entry.filename, entry.identifier)
    }

    pub fn get(&self, filename: &str) -> Option<&str> {
        self.entries.get(filename).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<ImageEntry> for ImageIndex {
    fn from_iter<I: IntoIterator<Item = ImageEntry>>(iter: I) -> Self {
        let mut index = ImageIndex::new();
        for entry in iter {
            index.insert(entry);
        }
        index
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ImageIndex {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(k, v)| ImageEntry::new(k, v))
            .collect()
    }
}

/// Error or informational message inside a service envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for ApiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Response envelope returned by the image listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
}

/// Pagination metadata. The images endpoint does not always send it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultInfo {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// `result` payload of a successful listing. `images` stays `None` when the
/// service left the list out, which is not the same as an empty page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagesPage {
    #[serde(default)]
    pub images: Option<Vec<ImageEntry>>,
}

impl ImagesPage {
    pub fn new(images: Vec<ImageEntry>) -> Self {
        Self {
            images: Some(images),
        }
    }
}

pub type ListImagesResponse = ApiEnvelope<ImagesPage>;
