//! In-process engine with optional on-disk persistence.
//!
//! Collections live in memory behind `parking_lot` locks. In persistent mode
//! every collection has a snapshot at `<root>/collections/<name>.json` and an
//! append-only log at `<name>.jsonl`. Mutations append one log line before
//! touching memory; opening the engine replays the log and folds it back into
//! the snapshot.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::embedding::{Embedder, squared_l2};
use super::error::{EngineError, EngineResult};
use super::types::{CollectionInfo, Include, Metadata, PeekResult, QueryResult};
use super::{Collection, CollectionHandle, VectorEngine, check_lengths, validate_collection_name};
use crate::utils::get_utc_timestamp;

const COLLECTIONS_DIR: &str = "collections";
const LOG_EXTENSION: &str = "jsonl";

/// One stored row.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    id: String,
    document: String,
    metadata: Metadata,
    embedding: Vec<f32>,
}

/// On-disk layout of a collection snapshot.
#[derive(Serialize, Deserialize)]
struct CollectionFile {
    name: String,
    #[serde(default)]
    metadata: Metadata,
    created_at: u64,
    sequence: u64,
    records: Vec<StoredRecord>,
}

/// One line of the mutation log.
///
/// Replaying is idempotent: `Put` overwrites, `Delete` ignores unknown ids.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum LogEntry {
    Put { records: Vec<StoredRecord> },
    Delete { ids: Vec<String> },
}

impl LogEntry {
    fn apply(self, records: &mut IndexMap<String, StoredRecord>) {
        match self {
            LogEntry::Put { records: puts } => {
                for record in puts {
                    records.insert(record.id.clone(), record);
                }
            }
            LogEntry::Delete { ids } => {
                for id in &ids {
                    records.shift_remove(id);
                }
            }
        }
    }
}

fn log_path(snapshot: &Path) -> PathBuf {
    snapshot.with_extension(LOG_EXTENSION)
}

/// Apply every readable log line to `records`. Returns how many were
/// applied, or `None` when there is no log.
fn replay_log(
    snapshot: &Path,
    records: &mut IndexMap<String, StoredRecord>,
) -> EngineResult<Option<usize>> {
    let path = log_path(snapshot);
    let file = match std::fs::File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut applied = 0;
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LogEntry>(&line) {
            Ok(entry) => {
                entry.apply(records);
                applied += 1;
            }
            // A torn final line from an interrupted append lands here.
            Err(e) => crate::warn_event!(
                "engine",
                "skipped log line",
                "{}:{}: {e}",
                path.display(),
                number + 1
            ),
        }
    }
    Ok(Some(applied))
}

#[derive(Debug, Default)]
struct CollectionState {
    records: IndexMap<String, StoredRecord>,
    dropped: bool,
}

/// A collection owned by [`LocalEngine`].
pub struct LocalCollection {
    name: String,
    metadata: Metadata,
    created_at: u64,
    sequence: u64,
    state: RwLock<CollectionState>,
    file: Option<PathBuf>,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for LocalCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCollection")
            .field("name", &self.name)
            .field("records", &self.state.read().records.len())
            .field("persistent", &self.file.is_some())
            .finish()
    }
}

impl LocalCollection {
    fn info(&self) -> CollectionInfo {
        CollectionInfo {
            name: self.name.clone(),
            metadata: self.metadata.clone(),
        }
    }

    fn not_found(&self) -> EngineError {
        EngineError::CollectionNotFound(self.name.clone())
    }

    /// Rewrite the snapshot from `records`.
    fn write_snapshot(&self, records: &IndexMap<String, StoredRecord>) -> EngineResult<()> {
        let Some(ref path) = self.file else {
            return Ok(());
        };

        let file = CollectionFile {
            name: self.name.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
            sequence: self.sequence,
            records: records.values().cloned().collect(),
        };

        let content = serde_json::to_string(&file)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Append one entry to the log. Caller holds the state write lock and
    /// applies the entry to memory only when this returns `Ok`.
    fn append(&self, entry: &LogEntry) -> EngineResult<()> {
        let Some(ref path) = self.file else {
            return Ok(());
        };

        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path(path))?;
        let start = file.metadata()?.len();
        if let Err(e) = file.write_all(&line).and_then(|()| file.flush()) {
            // Drop the partial line so a later replay does not see it.
            let _ = file.set_len(start);
            return Err(e.into());
        }
        Ok(())
    }

    /// Start a fresh snapshot with no log behind it.
    fn initialize(&self) -> EngineResult<()> {
        let Some(ref path) = self.file else {
            return Ok(());
        };

        let log = log_path(path);
        if log.exists() {
            std::fs::remove_file(&log)?;
        }
        self.write_snapshot(&IndexMap::new())
    }

    fn load(path: &Path, embedder: Arc<dyn Embedder>) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: CollectionFile = serde_json::from_str(&content)?;

        let mut records: IndexMap<String, StoredRecord> = file
            .records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        let replayed = replay_log(path, &mut records)?;

        let collection = Self {
            name: file.name,
            metadata: file.metadata,
            created_at: file.created_at,
            sequence: file.sequence,
            state: RwLock::new(CollectionState {
                records,
                dropped: false,
            }),
            file: Some(path.to_path_buf()),
            embedder,
        };

        // Any log is folded in and removed, even one with nothing replayable.
        if let Some(replayed) = replayed {
            collection.write_snapshot(&collection.state.read().records)?;
            std::fs::remove_file(log_path(path))?;
            crate::debug_event!(
                "engine",
                "compacted",
                "{}: {replayed} log entries",
                collection.name
            );
        }

        Ok(collection)
    }
}

impl Collection for LocalCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(
        &self,
        documents: &[String],
        metadatas: &[Metadata],
        ids: &[String],
    ) -> EngineResult<()> {
        check_lengths(ids, documents, metadatas)?;

        let texts: Vec<&str> = documents.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed(&texts)?;

        let mut state = self.state.write();
        if state.dropped {
            return Err(self.not_found());
        }

        // Reject the whole batch before touching anything.
        for (position, id) in ids.iter().enumerate() {
            if state.records.contains_key(id) || ids[..position].contains(id) {
                return Err(EngineError::DuplicateId {
                    collection: self.name.clone(),
                    id: id.clone(),
                });
            }
        }

        let entry = LogEntry::Put {
            records: stored_records(ids, documents, metadatas, embeddings),
        };
        self.append(&entry)?;
        entry.apply(&mut state.records);
        Ok(())
    }

    fn query(
        &self,
        query_texts: &[String],
        n_results: usize,
        include: &[Include],
    ) -> EngineResult<QueryResult> {
        let texts: Vec<&str> = query_texts.iter().map(String::as_str).collect();
        let query_vectors = self.embedder.embed(&texts)?;

        let state = self.state.read();
        if state.dropped {
            return Err(self.not_found());
        }

        let wants = |field: Include| include.contains(&field);
        let mut result = QueryResult {
            ids: Vec::with_capacity(query_vectors.len()),
            documents: wants(Include::Documents).then(Vec::new),
            metadatas: wants(Include::Metadatas).then(Vec::new),
            distances: wants(Include::Distances).then(Vec::new),
            embeddings: wants(Include::Embeddings).then(Vec::new),
        };

        for query_vector in &query_vectors {
            let mut scored: Vec<(f32, &StoredRecord)> = state
                .records
                .values()
                .map(|record| (squared_l2(query_vector, &record.embedding), record))
                .collect();

            // Stable sort keeps insertion order among equal distances.
            scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(n_results);

            result
                .ids
                .push(scored.iter().map(|(_, r)| r.id.clone()).collect());
            if let Some(ref mut documents) = result.documents {
                documents.push(scored.iter().map(|(_, r)| r.document.clone()).collect());
            }
            if let Some(ref mut metadatas) = result.metadatas {
                metadatas.push(scored.iter().map(|(_, r)| r.metadata.clone()).collect());
            }
            if let Some(ref mut distances) = result.distances {
                distances.push(scored.iter().map(|(d, _)| *d).collect());
            }
            if let Some(ref mut embeddings) = result.embeddings {
                embeddings.push(scored.iter().map(|(_, r)| r.embedding.clone()).collect());
            }
        }

        Ok(result)
    }

    fn update(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
    ) -> EngineResult<()> {
        check_lengths(ids, documents, metadatas)?;

        let texts: Vec<&str> = documents.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed(&texts)?;

        let mut state = self.state.write();
        if state.dropped {
            return Err(self.not_found());
        }

        if let Some(missing) = ids.iter().find(|id| !state.records.contains_key(*id)) {
            return Err(EngineError::IdNotFound {
                collection: self.name.clone(),
                id: missing.clone(),
            });
        }

        let entry = LogEntry::Put {
            records: stored_records(ids, documents, metadatas, embeddings),
        };
        self.append(&entry)?;
        entry.apply(&mut state.records);
        Ok(())
    }

    fn delete(&self, ids: &[String]) -> EngineResult<()> {
        let mut state = self.state.write();
        if state.dropped {
            return Err(self.not_found());
        }

        if let Some(missing) = ids.iter().find(|id| !state.records.contains_key(*id)) {
            return Err(EngineError::IdNotFound {
                collection: self.name.clone(),
                id: missing.clone(),
            });
        }

        let entry = LogEntry::Delete { ids: ids.to_vec() };
        self.append(&entry)?;
        entry.apply(&mut state.records);
        Ok(())
    }

    fn peek(&self, limit: usize) -> EngineResult<PeekResult> {
        let state = self.state.read();
        if state.dropped {
            return Err(self.not_found());
        }

        let mut peek = PeekResult::default();
        for record in state.records.values().take(limit) {
            peek.ids.push(record.id.clone());
            peek.documents.push(record.document.clone());
            peek.metadatas.push(record.metadata.clone());
            peek.embeddings.push(record.embedding.clone());
        }
        Ok(peek)
    }

    fn count(&self) -> EngineResult<usize> {
        let state = self.state.read();
        if state.dropped {
            return Err(self.not_found());
        }
        Ok(state.records.len())
    }
}

fn stored_records(
    ids: &[String],
    documents: &[String],
    metadatas: &[Metadata],
    embeddings: Vec<Vec<f32>>,
) -> Vec<StoredRecord> {
    ids.iter()
        .zip(documents)
        .zip(metadatas)
        .zip(embeddings)
        .map(|(((id, document), metadata), embedding)| StoredRecord {
            id: id.clone(),
            document: document.clone(),
            metadata: metadata.clone(),
            embedding,
        })
        .collect()
}

/// In-process vector engine.
pub struct LocalEngine {
    /// Directory holding collection files; `None` for ephemeral engines.
    root: Option<PathBuf>,
    collections: RwLock<IndexMap<String, Arc<LocalCollection>>>,
    next_sequence: RwLock<u64>,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEngine")
            .field("root", &self.root)
            .field("collection_count", &self.collections.read().len())
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

impl LocalEngine {
    /// Engine that forgets everything when dropped.
    pub fn ephemeral(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            root: None,
            collections: RwLock::new(IndexMap::new()),
            next_sequence: RwLock::new(1),
            embedder,
        }
    }

    /// Open or create an engine rooted at `path`.
    pub fn persistent(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> EngineResult<Self> {
        let root = path.as_ref().join(COLLECTIONS_DIR);
        std::fs::create_dir_all(&root)?;

        let mut loaded = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match LocalCollection::load(&path, embedder.clone()) {
                Ok(collection) => loaded.push(collection),
                Err(e) => {
                    crate::warn_event!("engine", "skipped unreadable file", "{}: {e}", path.display());
                }
            }
        }

        loaded.sort_by_key(|c| c.sequence);
        let next_sequence = loaded.last().map(|c| c.sequence + 1).unwrap_or(1);

        let collections = loaded
            .into_iter()
            .map(|c| (c.name.clone(), Arc::new(c)))
            .collect::<IndexMap<_, _>>();

        crate::debug_event!(
            "engine",
            "opened",
            "{} collections from {}",
            collections.len(),
            root.display()
        );

        Ok(Self {
            root: Some(root),
            collections: RwLock::new(collections),
            next_sequence: RwLock::new(next_sequence),
            embedder,
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.root.is_some()
    }
}

impl VectorEngine for LocalEngine {
    fn heartbeat(&self) -> EngineResult<()> {
        Ok(())
    }

    fn list_collections(&self) -> EngineResult<Vec<CollectionInfo>> {
        Ok(self.collections.read().values().map(|c| c.info()).collect())
    }

    fn create_collection(&self, name: &str) -> EngineResult<CollectionHandle> {
        validate_collection_name(name)?;

        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(EngineError::CollectionExists(name.to_string()));
        }

        let sequence = {
            let mut next = self.next_sequence.write();
            let current = *next;
            *next += 1;
            current
        };

        let mut metadata = Metadata::new();
        metadata.insert("embedding_model".to_string(), self.embedder.name().to_string());

        let collection = Arc::new(LocalCollection {
            name: name.to_string(),
            metadata,
            created_at: get_utc_timestamp(),
            sequence,
            state: RwLock::new(CollectionState::default()),
            file: self.root.as_ref().map(|root| root.join(format!("{name}.json"))),
            embedder: self.embedder.clone(),
        });

        collection.initialize()?;
        collections.insert(name.to_string(), collection.clone());

        Ok(collection)
    }

    fn get_collection(&self, name: &str) -> EngineResult<CollectionHandle> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .map(|c| c as CollectionHandle)
            .ok_or_else(|| EngineError::CollectionNotFound(name.to_string()))
    }

    fn delete_collection(&self, name: &str) -> EngineResult<()> {
        let removed = self
            .collections
            .write()
            .shift_remove(name)
            .ok_or_else(|| EngineError::CollectionNotFound(name.to_string()))?;

        removed.state.write().dropped = true;

        if let Some(ref path) = removed.file {
            for file in [log_path(path), path.clone()] {
                if file.exists() {
                    std::fs::remove_file(&file)?;
                }
            }
        }

        Ok(())
    }
}
