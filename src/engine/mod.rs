//! Vector-store engine capability.
//!
//! The collection store and the query cursor only talk to the engine through
//! [`VectorEngine`] and [`Collection`]. Two backends implement them:
//! - [`LocalEngine`] keeps collections in process, optionally persisted as JSON
//! - [`HttpEngine`] talks to a Chroma server over its REST API
//!
//! Every call is blocking.

pub mod embedding;
pub mod error;
pub mod http;
pub mod local;
pub mod types;

pub use embedding::{Embedder, HashEmbedder};
pub use error::{EngineError, EngineResult};
pub use http::HttpEngine;
pub use local::LocalEngine;
pub use types::{CollectionInfo, Include, Metadata, PeekResult, QueryResult};

use std::sync::Arc;

use crate::config::{ConnectionMode, DatabaseConfig, EmbeddingConfig};

/// Number of rows `peek` returns when the caller has no preference.
pub const DEFAULT_PEEK_LIMIT: usize = 10;

/// Shared handle to one collection.
pub type CollectionHandle = Arc<dyn Collection>;

/// Collection-level operations of a vector store.
pub trait VectorEngine: Send + Sync {
    /// Check that the engine is reachable.
    fn heartbeat(&self) -> EngineResult<()>;

    /// Collections in engine listing order.
    fn list_collections(&self) -> EngineResult<Vec<CollectionInfo>>;

    /// Create a collection. Fails if the exact name is taken.
    fn create_collection(&self, name: &str) -> EngineResult<CollectionHandle>;

    /// Open a collection by exact name.
    fn get_collection(&self, name: &str) -> EngineResult<CollectionHandle>;

    /// Delete a collection by exact name.
    fn delete_collection(&self, name: &str) -> EngineResult<()>;
}

/// Document-level operations on one collection.
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Add new records. Every id must be unused.
    fn add(&self, documents: &[String], metadatas: &[Metadata], ids: &[String])
    -> EngineResult<()>;

    /// Nearest records for each query text.
    fn query(
        &self,
        query_texts: &[String],
        n_results: usize,
        include: &[Include],
    ) -> EngineResult<QueryResult>;

    /// Replace document and metadata of existing ids.
    fn update(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
    ) -> EngineResult<()>;

    /// Remove records by id.
    fn delete(&self, ids: &[String]) -> EngineResult<()>;

    /// First `limit` records in insertion order, embeddings included.
    fn peek(&self, limit: usize) -> EngineResult<PeekResult>;

    fn count(&self) -> EngineResult<usize>;
}

/// Open the engine selected by the database settings.
pub fn connect(
    database: &DatabaseConfig,
    embedding: &EmbeddingConfig,
) -> EngineResult<Arc<dyn VectorEngine>> {
    let embedder = embedder_from_settings(embedding)?;

    let engine: Arc<dyn VectorEngine> = match database.mode {
        ConnectionMode::Persistent => Arc::new(LocalEngine::persistent(&database.path, embedder)?),
        ConnectionMode::Ephemeral => Arc::new(LocalEngine::ephemeral(embedder)),
        ConnectionMode::Remote => Arc::new(HttpEngine::new(database, embedder)?),
    };

    crate::debug_event!("engine", "connected", "{:?} mode", database.mode);
    Ok(engine)
}

/// Build the embedder named in settings.
pub fn embedder_from_settings(config: &EmbeddingConfig) -> EngineResult<Arc<dyn Embedder>> {
    if config.model == "hash" {
        return Ok(Arc::new(HashEmbedder::with_dimension(config.dimension)));
    }

    #[cfg(feature = "fastembed")]
    {
        Ok(Arc::new(embedding::FastEmbedder::from_settings(
            &config.model,
        )?))
    }

    #[cfg(not(feature = "fastembed"))]
    {
        Err(EngineError::Embedding(format!(
            "model '{}' requires the `fastembed` feature",
            config.model
        )))
    }
}

/// Check a collection name against the rules Chroma enforces.
///
/// 3 to 63 characters from `[A-Za-z0-9._-]`, starting and ending with an
/// alphanumeric character, no `..`.
pub fn validate_collection_name(name: &str) -> EngineResult<()> {
    let invalid = |reason: &str| EngineError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if !(3..=63).contains(&name.len()) {
        return Err(invalid("must be between 3 and 63 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(invalid("only ASCII letters, digits, '.', '_' and '-' are allowed"));
    }
    let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let ends_ok = name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if !starts_ok || !ends_ok {
        return Err(invalid("must start and end with a letter or digit"));
    }
    if name.contains("..") {
        return Err(invalid("must not contain '..'"));
    }

    Ok(())
}

/// Check that the three parallel sequences of a write line up.
pub(crate) fn check_lengths(
    ids: &[String],
    documents: &[String],
    metadatas: &[Metadata],
) -> EngineResult<()> {
    if ids.len() != documents.len() || ids.len() != metadatas.len() {
        return Err(EngineError::LengthMismatch {
            ids: ids.len(),
            documents: documents.len(),
            metadatas: metadatas.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_collection_names() {
        for name in ["abc_collection", "crm-2024", "faq.v2", "a1b"] {
            assert!(validate_collection_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_invalid_collection_names() {
        for name in ["ab", "_abc", "abc_", "a..b", "with space", "../etc", "ñandu"] {
            assert!(validate_collection_name(name).is_err(), "{name}");
        }
        let long = "a".repeat(64);
        assert!(validate_collection_name(&long).is_err());
    }

    #[test]
    fn test_check_lengths() {
        let ids = vec!["1".to_string()];
        let docs = vec!["doc".to_string()];
        assert!(check_lengths(&ids, &docs, &[Metadata::new()]).is_ok());
        assert!(matches!(
            check_lengths(&ids, &docs, &[]),
            Err(EngineError::LengthMismatch { metadatas: 0, .. })
        ));
    }

    #[test]
    fn test_hash_model_needs_no_feature() {
        let config = EmbeddingConfig {
            model: "hash".to_string(),
            dimension: 16,
        };
        let embedder = embedder_from_settings(&config).unwrap();
        assert_eq!(embedder.dimension(), 16);
        assert_eq!(embedder.name(), "hash");
    }
}
