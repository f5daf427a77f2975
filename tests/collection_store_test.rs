use std::sync::Arc;

use faqstore::config::DatabaseConfig;
use faqstore::engine::Metadata;
use faqstore::io::{NoProgress, RecordingProgress};
use faqstore::store::RecordOutcome;
use faqstore::{
    AutoOperator, BuildOutcome, CollectionStore, DatasetLoader, DatasetPayload, DatasetRecord,
    DatasetVariant, DeleteOutcome, HashEmbedder, LocalEngine,
};
use tempfile::TempDir;

const ABC: &str = "pregunta|respuesta
¿Qué es el ABC?|Un trámite de alta
¿Cómo pago la cuota mensual?|Con el volante de pago
¿Dónde cambio mi domicilio fiscal?|En la web del organismo
¿Qué es el ABC?|Duplicado
¿Puedo darme de baja?|Sí, desde el portal
";

fn payload(collection: &str) -> DatasetPayload {
    DatasetLoader::from_reader(ABC.as_bytes(), DatasetVariant::Plain, collection)
        .unwrap()
        .get_data()
}

fn store_with(operator: Arc<AutoOperator>) -> CollectionStore {
    let engine = Arc::new(LocalEngine::ephemeral(Arc::new(HashEmbedder::new())));
    CollectionStore::with_engine(engine)
        .with_operator(operator)
        .with_progress(Arc::new(NoProgress))
}

fn store() -> CollectionStore {
    store_with(Arc::new(AutoOperator::yes()))
}

#[test]
fn test_build_then_peek_without_embeddings() {
    let store = store();
    let payload = payload("abc_collection");
    assert_eq!(payload.count(), 4);

    let collection = store.build_collection(&payload).unwrap();
    assert_eq!(collection.count().unwrap(), 4);

    let snapshot = store.peek_collection("abc", 2, true).unwrap().unwrap();
    assert_eq!(snapshot.collection(), "abc_collection");
    assert_eq!(snapshot.total(), 4);
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.columns(), ["ids", "documents", "metadatas"]);
    assert!(snapshot.rows().iter().all(|row| row.embedding.is_none()));
    assert_eq!(snapshot.rows()[0].document, "¿Qué es el ABC?");

    let with_embeddings = store.get_collection_info("abc", false).unwrap().unwrap();
    assert_eq!(with_embeddings.len(), 4);
    assert!(with_embeddings.columns().iter().any(|c| c == "embeddings"));
    assert!(with_embeddings.rows().iter().all(|row| row.embedding.is_some()));
}

#[test]
fn test_build_on_existing_name_inserts_nothing() {
    let store = store();
    store.create_collection("abc_collection").unwrap().unwrap();

    let outcome = store.build_collection_with_report(&payload("abc_collection"));
    assert!(matches!(outcome, BuildOutcome::AlreadyExists));
    assert!(store.build_collection(&payload("abc_collection")).is_none());

    let existing = store.find_exact("abc_collection").unwrap().unwrap();
    assert_eq!(existing.count().unwrap(), 0);
}

#[test]
fn test_create_is_tolerant_of_substrings() {
    let store = store();
    store.create_collection("abc_collection").unwrap().unwrap();

    // "abc" is contained in an existing name.
    assert!(store.create_collection("abc").unwrap().is_none());
    assert!(store.create_collection("crm_collection").unwrap().is_some());
    assert_eq!(
        store.list_collections().unwrap().names,
        ["abc_collection", "crm_collection"]
    );
}

#[test]
fn test_query_returns_nearest_documents() {
    let store = store();
    store.build_collection(&payload("abc_collection")).unwrap();

    let result = store
        .query_collection("abc", "cuota mensual pago", 2)
        .unwrap()
        .unwrap();
    let documents = result.first_documents();
    assert!(documents.len() <= 2);
    assert_eq!(documents[0], "¿Cómo pago la cuota mensual?");
    assert!(result.metadatas.is_some());
    assert!(result.distances.is_some());

    assert!(store.query_collection("zzz", "anything", 2).unwrap().is_none());
}

#[test]
fn test_delete_missing_name_reports_failure() {
    let store = store();
    let outcome = store.delete_collection("missing_collection", true);
    assert!(matches!(outcome, DeleteOutcome::Failed(_)));
}

#[test]
fn test_delete_requires_confirmation() {
    let declining = Arc::new(AutoOperator::no());
    let store = store_with(declining.clone());
    store.build_collection(&payload("abc_collection")).unwrap();

    assert_eq!(store.delete_collection("abc", false), DeleteOutcome::Aborted);
    assert_eq!(declining.prompts().len(), 1);
    assert!(store.find_exact("abc_collection").unwrap().is_some());

    assert_eq!(
        store.delete_collection("abc_collection", true),
        DeleteOutcome::Deleted("abc_collection".to_string())
    );
    assert!(store.find_exact("abc_collection").unwrap().is_none());
}

#[test]
fn test_confirmed_delete_resolves_substring() {
    let store = store();
    store.build_collection(&payload("abc_collection")).unwrap();

    assert_eq!(
        store.delete_collection("abc", false),
        DeleteOutcome::Deleted("abc_collection".to_string())
    );
    assert_eq!(store.delete_collection("abc", false), DeleteOutcome::NotFound);
}

#[test]
fn test_partial_build_is_reported() {
    let records = vec![
        DatasetRecord::new("uno", Metadata::new(), "id-1"),
        DatasetRecord::new("dos", Metadata::new(), "id-2"),
        DatasetRecord::new("tres", Metadata::new(), "id-1"),
        DatasetRecord::new("cuatro", Metadata::new(), "id-4"),
    ];
    let payload = DatasetPayload::from_records("broken_collection", vec![], &records);

    let progress = Arc::new(RecordingProgress::new());
    let engine = Arc::new(LocalEngine::ephemeral(Arc::new(HashEmbedder::new())));
    let store = CollectionStore::with_engine(engine)
        .with_operator(Arc::new(AutoOperator::yes()))
        .with_progress(progress.clone());

    let outcome = store.build_collection_with_report(&payload);
    let BuildOutcome::Aborted { report, .. } = outcome else {
        panic!("expected an aborted build");
    };

    assert_eq!(report.inserted(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.not_attempted(), 1);
    assert!(!report.is_complete());
    assert_eq!(report.missing_ids(), ["id-1", "id-4"]);
    assert!(matches!(report.entries()[2].outcome, RecordOutcome::Failed(_)));

    assert_eq!(progress.reports(), [(1, 4), (2, 4)]);
    assert_eq!(progress.finished(), Some((2, 4)));

    // Rows inserted before the failure stay.
    let kept = store.find_exact("broken_collection").unwrap().unwrap();
    assert_eq!(kept.count().unwrap(), 2);
}

#[test]
fn test_aborted_build_is_acknowledged() {
    let records = vec![
        DatasetRecord::new("uno", Metadata::new(), "same"),
        DatasetRecord::new("dos", Metadata::new(), "same"),
    ];
    let payload = DatasetPayload::from_records("broken_collection", vec![], &records);

    let operator = Arc::new(AutoOperator::yes());
    let store = store_with(operator.clone());

    assert!(store.build_collection(&payload).is_none());
    let acknowledged = operator.acknowledged();
    assert_eq!(acknowledged.len(), 1);
    assert!(acknowledged[0].contains("broken_collection"));
}

#[test]
fn test_successful_build_reports_progress() {
    let progress = Arc::new(RecordingProgress::new());
    let engine = Arc::new(LocalEngine::ephemeral(Arc::new(HashEmbedder::new())));
    let store = CollectionStore::with_engine(engine)
        .with_operator(Arc::new(AutoOperator::yes()))
        .with_progress(progress.clone());

    let outcome = store.build_collection_with_report(&payload("abc_collection"));
    let report = outcome.report().unwrap();
    assert!(report.is_complete());
    assert_eq!(report.to_string(), "abc_collection: 4/4 inserted");

    assert_eq!(progress.reports().len(), 4);
    assert_eq!(progress.finished(), Some((4, 4)));
}

#[test]
fn test_persistent_store_survives_reconnect() {
    let temp_dir = TempDir::new().unwrap();
    let database = DatabaseConfig::persistent(temp_dir.path().join("database"));

    {
        let store = CollectionStore::connect(&database)
            .unwrap()
            .with_operator(Arc::new(AutoOperator::yes()))
            .with_progress(Arc::new(NoProgress));
        store.build_collection(&payload("abc_collection")).unwrap();
    }

    let store = CollectionStore::connect(&database).unwrap();
    let cached: Vec<&str> = store
        .cached_collections()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(cached, ["abc_collection"]);

    let result = store
        .query_collection("abc", "domicilio fiscal", 1)
        .unwrap()
        .unwrap();
    assert_eq!(result.first_documents(), ["¿Dónde cambio mi domicilio fiscal?"]);
}

#[test]
fn test_ephemeral_store_does_not_cache() {
    let store = CollectionStore::connect(&DatabaseConfig::ephemeral()).unwrap();
    assert!(store.cached_collections().is_empty());
    assert!(store.list_collections().unwrap().names.is_empty());
}

#[test]
fn test_large_persistent_build_reopens_complete() {
    let temp_dir = TempDir::new().unwrap();
    let database = DatabaseConfig::persistent(temp_dir.path().join("database"));

    let mut content = String::from("pregunta|respuesta\n");
    for i in 0..300 {
        content.push_str(&format!("¿Pregunta número {i}?|Respuesta {i}\n"));
    }
    let payload =
        DatasetLoader::from_reader(content.as_bytes(), DatasetVariant::Plain, "big_collection")
            .unwrap()
            .get_data();

    {
        let store = CollectionStore::connect(&database)
            .unwrap()
            .with_operator(Arc::new(AutoOperator::yes()))
            .with_progress(Arc::new(NoProgress));
        let collection = store.build_collection(&payload).unwrap();
        assert_eq!(collection.count().unwrap(), 300);
    }

    let store = CollectionStore::connect(&database).unwrap();
    let collection = store.get_collection("big").unwrap().unwrap();
    assert_eq!(collection.count().unwrap(), 300);
    assert_eq!(collection.peek(1).unwrap().ids, &payload.ids()[..1]);

    let files = temp_dir.path().join("database/collections");
    assert!(files.join("big_collection.json").exists());
    assert!(!files.join("big_collection.jsonl").exists());
}
