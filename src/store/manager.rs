//! Collection lifecycle on top of a vector engine.

use std::sync::Arc;

use serde::Serialize;

use super::operator::{ConsoleOperator, Operator};
use super::report::{BuildOutcome, DeleteOutcome, IngestReport, RecordOutcome};
use super::snapshot::CollectionSnapshot;
use super::tolerant_match;
use crate::config::{ConnectionMode, DatabaseConfig, EmbeddingConfig};
use crate::dataset::DatasetPayload;
use crate::engine::{
    self, CollectionHandle, CollectionInfo, DEFAULT_PEEK_LIMIT, EngineError, EngineResult,
    Include, QueryResult, VectorEngine,
};
use crate::io::{ConsoleProgress, ProgressReporter};
use crate::{error_event, log_event, warn_event};

/// Collections currently known to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionListing {
    pub collections: Vec<CollectionInfo>,
    pub names: Vec<String>,
}

impl CollectionListing {
    fn new(collections: Vec<CollectionInfo>) -> Self {
        let names = collections.iter().map(|c| c.name.clone()).collect();
        Self { collections, names }
    }
}

/// Creates, fills, inspects and deletes collections.
///
/// Name lookups are tolerant: the first collection, in engine listing order,
/// whose name contains the requested string wins. Use
/// [`find_exact`](Self::find_exact) when that is too loose.
pub struct CollectionStore {
    engine: Arc<dyn VectorEngine>,
    cached: Vec<CollectionInfo>,
    operator: Arc<dyn Operator>,
    progress: Arc<dyn ProgressReporter>,
}

impl CollectionStore {
    /// Connect with the default embedder.
    pub fn connect(database: &DatabaseConfig) -> EngineResult<Self> {
        Self::connect_with(database, &EmbeddingConfig::default())
    }

    /// Connect to the engine the database settings select.
    ///
    /// In persistent mode the collection list is read once and cached.
    pub fn connect_with(
        database: &DatabaseConfig,
        embedding: &EmbeddingConfig,
    ) -> EngineResult<Self> {
        let mut store = Self::with_engine(engine::connect(database, embedding)?);
        if database.mode == ConnectionMode::Persistent {
            store.cached = store.engine.list_collections()?;
        }
        log_event!("store", "connected", "{:?} mode", database.mode);
        Ok(store)
    }

    /// Wrap an already open engine.
    pub fn with_engine(engine: Arc<dyn VectorEngine>) -> Self {
        Self {
            engine,
            cached: Vec::new(),
            operator: Arc::new(ConsoleOperator::new()),
            progress: Arc::new(ConsoleProgress::default()),
        }
    }

    pub fn with_operator(mut self, operator: Arc<dyn Operator>) -> Self {
        self.operator = operator;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn engine(&self) -> &Arc<dyn VectorEngine> {
        &self.engine
    }

    /// Collection list read at connect time (persistent mode only).
    pub fn cached_collections(&self) -> &[CollectionInfo] {
        &self.cached
    }

    /// Fresh collection list from the engine.
    pub fn list_collections(&self) -> EngineResult<CollectionListing> {
        Ok(CollectionListing::new(self.engine.list_collections()?))
    }

    /// Name of the first collection containing `name`.
    pub fn resolve_name(&self, name: &str) -> EngineResult<Option<String>> {
        let collections = self.engine.list_collections()?;
        Ok(tolerant_match(&collections, name).map(|info| info.name.clone()))
    }

    /// Tolerant lookup. A miss is logged and yields `None`.
    pub fn get_collection(&self, name: &str) -> EngineResult<Option<CollectionHandle>> {
        match self.resolve_name(name)? {
            Some(matched) => Ok(Some(self.engine.get_collection(&matched)?)),
            None => {
                log_event!("store", "not found", "collection '{name}'");
                Ok(None)
            }
        }
    }

    /// Exact-name lookup.
    pub fn find_exact(&self, name: &str) -> EngineResult<Option<CollectionHandle>> {
        match self.engine.get_collection(name) {
            Ok(handle) => Ok(Some(handle)),
            Err(EngineError::CollectionNotFound(_) | EngineError::InvalidName { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create an empty collection unless a collection containing `name` exists.
    pub fn create_collection(&self, name: &str) -> EngineResult<Option<CollectionHandle>> {
        if let Some(existing) = self.resolve_name(name)? {
            log_event!("store", "already exists", "'{name}' matches collection '{existing}'");
            return Ok(None);
        }
        self.engine.create_collection(name).map(Some)
    }

    /// Create the payload's collection and insert every record.
    ///
    /// On failure the error is logged, the operator is asked to acknowledge
    /// it, and `None` is returned. Records inserted before the failure stay.
    pub fn build_collection(&self, payload: &DatasetPayload) -> Option<CollectionHandle> {
        match self.build_collection_with_report(payload) {
            BuildOutcome::Built { collection, .. } => Some(collection),
            BuildOutcome::AlreadyExists => None,
            BuildOutcome::Aborted { report, error } => {
                self.operator.acknowledge(&format!(
                    "Build of '{}' aborted: {error} ({report})",
                    report.collection()
                ));
                None
            }
        }
    }

    /// Same routine as [`build_collection`](Self::build_collection), reporting
    /// the outcome of each record instead of prompting.
    pub fn build_collection_with_report(&self, payload: &DatasetPayload) -> BuildOutcome {
        let name = payload.collection_name();
        let total = payload.count();
        let mut report = IngestReport::pending(name, payload.ids());

        let collection = match self.create_collection(name) {
            Ok(Some(collection)) => collection,
            Ok(None) => return BuildOutcome::AlreadyExists,
            Err(error) => {
                error_event!("store", "build aborted", "creating '{name}': {error}");
                return BuildOutcome::Aborted { report, error };
            }
        };

        for (index, (document, metadata, id)) in payload.iter().enumerate() {
            let inserted = collection.add(
                std::slice::from_ref(document),
                std::slice::from_ref(metadata),
                std::slice::from_ref(id),
            );

            if let Err(error) = inserted {
                report.set(index, RecordOutcome::Failed(error.to_string()));
                self.progress.finish(index, total);
                error_event!(
                    "store",
                    "build aborted",
                    "'{name}' at record {} of {total} (id {id}): {error}",
                    index + 1
                );
                return BuildOutcome::Aborted { report, error };
            }

            report.set(index, RecordOutcome::Inserted);
            self.progress.report(index + 1, total);
        }

        self.progress.finish(total, total);
        log_event!("store", "built", "{report}");
        BuildOutcome::Built { collection, report }
    }

    /// Delete a collection.
    ///
    /// Unless `ignore_warnings` is set the operator must confirm first, and the
    /// name is resolved tolerantly. With `ignore_warnings` the exact name is
    /// deleted without asking. Failures are logged and reported, never raised.
    pub fn delete_collection(&self, name: &str, ignore_warnings: bool) -> DeleteOutcome {
        if ignore_warnings {
            return match self.engine.delete_collection(name) {
                Ok(()) => {
                    log_event!("store", "deleted", "collection '{name}'");
                    DeleteOutcome::Deleted(name.to_string())
                }
                Err(e) => {
                    warn_event!("store", "delete failed", "collection '{name}': {e}");
                    DeleteOutcome::Failed(e.to_string())
                }
            };
        }

        if !self
            .operator
            .confirm(&format!("Delete collection '{name}'? This cannot be undone."))
        {
            log_event!("store", "delete aborted", "collection '{name}'");
            return DeleteOutcome::Aborted;
        }

        let matched = match self.resolve_name(name) {
            Ok(Some(matched)) => matched,
            Ok(None) => {
                log_event!("store", "not found", "collection '{name}'");
                return DeleteOutcome::NotFound;
            }
            Err(e) => {
                warn_event!("store", "delete failed", "collection '{name}': {e}");
                return DeleteOutcome::Failed(e.to_string());
            }
        };

        match self.engine.delete_collection(&matched) {
            Ok(()) => {
                log_event!("store", "deleted", "collection '{matched}'");
                DeleteOutcome::Deleted(matched)
            }
            Err(e) => {
                warn_event!("store", "delete failed", "collection '{matched}': {e}");
                DeleteOutcome::Failed(e.to_string())
            }
        }
    }

    /// Preview of the first rows, as many as the engine peeks by default.
    pub fn get_collection_info(
        &self,
        name: &str,
        skip_embeddings: bool,
    ) -> EngineResult<Option<CollectionSnapshot>> {
        self.peek_collection(name, DEFAULT_PEEK_LIMIT, skip_embeddings)
    }

    /// Preview of at most `n_rows` rows.
    pub fn peek_collection(
        &self,
        name: &str,
        n_rows: usize,
        skip_embeddings: bool,
    ) -> EngineResult<Option<CollectionSnapshot>> {
        let Some(collection) = self.get_collection(name)? else {
            return Ok(None);
        };
        snapshot_of(&collection, n_rows, skip_embeddings).map(Some)
    }

    /// Nearest documents to `text` in the collection matching `name`.
    pub fn query_collection(
        &self,
        name: &str,
        text: &str,
        n_results: usize,
    ) -> EngineResult<Option<QueryResult>> {
        let Some(collection) = self.get_collection(name)? else {
            return Ok(None);
        };
        collection
            .query(&[text.to_string()], n_results, &Include::DEFAULT)
            .map(Some)
    }
}

impl Drop for CollectionStore {
    fn drop(&mut self) {
        log_event!("store", "disconnected");
    }
}

/// Snapshot of one collection handle.
pub(crate) fn snapshot_of(
    collection: &CollectionHandle,
    n_rows: usize,
    skip_embeddings: bool,
) -> EngineResult<CollectionSnapshot> {
    let total = collection.count()?;
    let peek = collection.peek(n_rows)?;
    Ok(CollectionSnapshot::from_peek(
        collection.name(),
        total,
        peek,
        skip_embeddings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{HashEmbedder, LocalEngine};
    use crate::io::NoProgress;
    use crate::store::AutoOperator;

    fn store() -> CollectionStore {
        let engine = Arc::new(LocalEngine::ephemeral(Arc::new(HashEmbedder::with_dimension(64))));
        CollectionStore::with_engine(engine)
            .with_operator(Arc::new(AutoOperator::yes()))
            .with_progress(Arc::new(NoProgress))
    }

    #[test]
    fn test_tolerant_lookup_resolves_substring() {
        let store = store();
        store.create_collection("abc_collection").unwrap().unwrap();

        let found = store.get_collection("abc").unwrap().unwrap();
        assert_eq!(found.name(), "abc_collection");
        assert!(store.get_collection("zzz").unwrap().is_none());
        assert!(store.find_exact("abc").unwrap().is_none());
        assert!(store.find_exact("abc_collection").unwrap().is_some());
    }

    #[test]
    fn test_create_refuses_contained_name() {
        let store = store();
        store.create_collection("crm_collection").unwrap().unwrap();
        assert!(store.create_collection("crm").unwrap().is_none());
        assert_eq!(store.list_collections().unwrap().names, ["crm_collection"]);
    }

    #[test]
    fn test_declined_delete_keeps_collection() {
        let engine = Arc::new(LocalEngine::ephemeral(Arc::new(HashEmbedder::with_dimension(8))));
        let operator = Arc::new(AutoOperator::no());
        let store = CollectionStore::with_engine(engine).with_operator(operator.clone());
        store.create_collection("faq_collection").unwrap();

        assert_eq!(store.delete_collection("faq", false), DeleteOutcome::Aborted);
        assert_eq!(operator.prompts().len(), 1);
        assert_eq!(store.list_collections().unwrap().names.len(), 1);
    }
}
