//! Record-level access through a bound collection.

use std::sync::Arc;

use super::manager::snapshot_of;
use super::snapshot::CollectionSnapshot;
use super::tolerant_match;
use crate::config::{DatabaseConfig, EmbeddingConfig};
use crate::dataset::DatasetRecord;
use crate::engine::{
    self, CollectionHandle, CollectionInfo, EngineError, EngineResult, Include, QueryResult,
    VectorEngine,
};
use crate::{log_event, warn_event};

/// Engine connection plus an optional bound collection (the cursor).
///
/// Record operations act on the bound collection and do nothing while no
/// collection is bound.
pub struct CursorClient {
    engine: Option<Arc<dyn VectorEngine>>,
    cursor: Option<CollectionHandle>,
}

impl CursorClient {
    pub fn connect(database: &DatabaseConfig) -> EngineResult<Self> {
        Self::connect_with(database, &EmbeddingConfig::default())
    }

    pub fn connect_with(
        database: &DatabaseConfig,
        embedding: &EmbeddingConfig,
    ) -> EngineResult<Self> {
        Ok(Self::with_engine(engine::connect(database, embedding)?))
    }

    /// Share an open engine, e.g. with a [`CollectionStore`](super::CollectionStore).
    pub fn with_engine(engine: Arc<dyn VectorEngine>) -> Self {
        Self {
            engine: Some(engine),
            cursor: None,
        }
    }

    fn engine(&self) -> EngineResult<&Arc<dyn VectorEngine>> {
        self.engine.as_ref().ok_or(EngineError::Disconnected)
    }

    pub fn is_connected(&self) -> bool {
        self.engine.is_some()
    }

    /// Name of the bound collection.
    pub fn cursor_name(&self) -> Option<&str> {
        self.cursor.as_ref().map(|c| c.name())
    }

    pub fn list_collections(&self) -> EngineResult<Vec<CollectionInfo>> {
        self.engine()?.list_collections()
    }

    /// Bind the first collection whose name contains `name`.
    ///
    /// Returns `false` and keeps the current binding when nothing matches.
    pub fn set_cursor(&mut self, name: &str) -> EngineResult<bool> {
        let engine = self.engine()?;
        let collections = engine.list_collections()?;

        let Some(matched) = tolerant_match(&collections, name) else {
            log_event!("cursor", "not found", "collection '{name}'");
            return Ok(false);
        };

        let handle = engine.get_collection(&matched.name)?;
        log_event!("cursor", "bound", "'{}'", matched.name);
        self.cursor = Some(handle);
        Ok(true)
    }

    /// Query the bound collection. `None` when unbound.
    pub fn execute_query(
        &self,
        text: &str,
        n_results: usize,
        include: &[Include],
    ) -> EngineResult<Option<QueryResult>> {
        let Some(ref collection) = self.cursor else {
            return Ok(None);
        };
        collection
            .query(&[text.to_string()], n_results, include)
            .map(Some)
    }

    /// Add one record. Engine failures are logged and yield `false`.
    pub fn insert_data(&self, record: &DatasetRecord) -> bool {
        let Some(ref collection) = self.cursor else {
            return false;
        };

        match collection.add(
            std::slice::from_ref(&record.document),
            std::slice::from_ref(&record.metadata),
            std::slice::from_ref(&record.id),
        ) {
            Ok(()) => true,
            Err(e) => {
                warn_event!("cursor", "insert failed", "{e}");
                false
            }
        }
    }

    /// Replace the document and metadata stored under `record.id`.
    pub fn update_data(&self, record: &DatasetRecord) -> EngineResult<()> {
        let Some(ref collection) = self.cursor else {
            return Ok(());
        };
        collection.update(
            std::slice::from_ref(&record.id),
            std::slice::from_ref(&record.document),
            std::slice::from_ref(&record.metadata),
        )
    }

    pub fn delete_data(&self, id: &str) -> EngineResult<()> {
        let Some(ref collection) = self.cursor else {
            return Ok(());
        };
        collection.delete(&[id.to_string()])
    }

    /// Preview of the bound collection.
    pub fn get_cursor_info(
        &self,
        ignore_embeddings: bool,
        n_rows: usize,
    ) -> EngineResult<Option<CollectionSnapshot>> {
        let Some(ref collection) = self.cursor else {
            return Ok(None);
        };
        snapshot_of(collection, n_rows, ignore_embeddings).map(Some)
    }

    /// Drop the engine handle and the binding together.
    pub fn disconnect(&mut self) {
        self.cursor = None;
        if self.engine.take().is_some() {
            log_event!("cursor", "disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{HashEmbedder, LocalEngine, Metadata};

    fn client_with(names: &[&str]) -> CursorClient {
        let engine: Arc<dyn VectorEngine> =
            Arc::new(LocalEngine::ephemeral(Arc::new(HashEmbedder::with_dimension(64))));
        for name in names {
            engine.create_collection(name).unwrap();
        }
        CursorClient::with_engine(engine)
    }

    #[test]
    fn test_unbound_operations_are_noops() {
        let client = client_with(&[]);
        let record = DatasetRecord::with_random_id("q", Metadata::new());

        assert!(client.execute_query("q", 1, &Include::DEFAULT).unwrap().is_none());
        assert!(!client.insert_data(&record));
        assert!(client.update_data(&record).is_ok());
        assert!(client.delete_data("missing").is_ok());
        assert!(client.get_cursor_info(true, 5).unwrap().is_none());
    }

    #[test]
    fn test_failed_set_cursor_keeps_binding() {
        let mut client = client_with(&["abc_collection"]);
        assert!(client.set_cursor("abc").unwrap());
        assert!(!client.set_cursor("nothing").unwrap());
        assert_eq!(client.cursor_name(), Some("abc_collection"));
    }

    #[test]
    fn test_disconnect_clears_cursor() {
        let mut client = client_with(&["abc_collection"]);
        client.set_cursor("abc_collection").unwrap();
        client.disconnect();

        assert!(client.cursor_name().is_none());
        assert!(!client.is_connected());
        assert!(matches!(client.set_cursor("abc"), Err(EngineError::Disconnected)));
    }
}
