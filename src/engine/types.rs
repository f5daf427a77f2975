//! Wire-level types shared by every engine backend.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Column name to value mapping attached to a document. Keeps column order.
pub type Metadata = IndexMap<String, String>;

/// Name and metadata of a collection as listed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl CollectionInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: Metadata::new(),
        }
    }
}

/// Fields a query may return besides ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Include {
    Documents,
    Metadatas,
    Distances,
    Embeddings,
}

impl Include {
    /// Include set used when callers don't ask for anything specific.
    pub const DEFAULT: [Include; 3] = [Include::Documents, Include::Metadatas, Include::Distances];

    pub fn as_str(self) -> &'static str {
        match self {
            Include::Documents => "documents",
            Include::Metadatas => "metadatas",
            Include::Distances => "distances",
            Include::Embeddings => "embeddings",
        }
    }
}

/// Similarity query response.
///
/// Every field is a list with one entry per query text; each entry lists the
/// hits for that text by ascending distance. Fields that were not requested
/// are `None` and serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    #[serde(default)]
    pub documents: Option<Vec<Vec<String>>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Vec<Metadata>>>,
    #[serde(default)]
    pub distances: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    pub embeddings: Option<Vec<Vec<Vec<f32>>>>,
}

impl QueryResult {
    /// Documents returned for the first query text.
    pub fn first_documents(&self) -> &[String] {
        self.documents
            .as_ref()
            .and_then(|docs| docs.first())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Ids returned for the first query text.
    pub fn first_ids(&self) -> &[String] {
        self.ids.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Bounded row set returned by `peek`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeekResult {
    pub ids: Vec<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub metadatas: Vec<Metadata>,
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}

impl PeekResult {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
