//! Records and the batch payload handed to collection builds.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::engine::Metadata;

/// One accepted dataset row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Question text; unique within one load
    pub document: String,
    pub metadata: Metadata,
    /// Random UUID v4
    pub id: String,
}

impl DatasetRecord {
    pub fn new(document: impl Into<String>, metadata: Metadata, id: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            metadata,
            id: id.into(),
        }
    }

    /// Record with a fresh random id.
    pub fn with_random_id(document: impl Into<String>, metadata: Metadata) -> Self {
        Self::new(document, metadata, uuid::Uuid::new_v4().to_string())
    }
}

/// Parallel sequences ready for ingestion.
///
/// Built from one record list, so `documents`, `metadatas` and `ids` always
/// line up index by index.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetPayload {
    collection_name: String,
    doc_info: Vec<String>,
    documents: Vec<String>,
    metadatas: Vec<Metadata>,
    ids: Vec<String>,
}

impl DatasetPayload {
    pub fn from_records(
        collection_name: impl Into<String>,
        doc_info: Vec<String>,
        records: &[DatasetRecord],
    ) -> Self {
        let mut documents = Vec::with_capacity(records.len());
        let mut metadatas = Vec::with_capacity(records.len());
        let mut ids = Vec::with_capacity(records.len());

        for record in records {
            documents.push(record.document.clone());
            metadatas.push(record.metadata.clone());
            ids.push(record.id.clone());
        }

        Self {
            collection_name: collection_name.into(),
            doc_info,
            documents,
            metadatas,
            ids,
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Metadata keys every record carries.
    pub fn doc_info(&self) -> &[String] {
        &self.doc_info
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn metadatas(&self) -> &[Metadata] {
        &self.metadatas
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn count(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// `(document, metadata, id)` triples in payload order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Metadata, &String)> {
        self.documents
            .iter()
            .zip(self.metadatas.iter())
            .zip(self.ids.iter())
            .map(|((document, metadata), id)| (document, metadata, id))
    }
}

impl Serialize for DatasetPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DatasetPayload", 6)?;
        state.serialize_field("collection_name", &self.collection_name)?;
        state.serialize_field("doc_info", &self.doc_info)?;
        state.serialize_field("documents", &self.documents)?;
        state.serialize_field("metadatas", &self.metadatas)?;
        state.serialize_field("ids", &self.ids)?;
        state.serialize_field("count", &self.count())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(question: &str) -> DatasetRecord {
        let mut metadata = Metadata::new();
        metadata.insert("pregunta".to_string(), question.to_string());
        DatasetRecord::with_random_id(question, metadata)
    }

    #[test]
    fn test_payload_sequences_line_up() {
        let records = vec![record("a"), record("b")];
        let payload = DatasetPayload::from_records("faq", vec!["pregunta".to_string()], &records);

        assert_eq!(payload.count(), 2);
        assert_eq!(payload.ids().len(), payload.metadatas().len());
        let triples: Vec<_> = payload.iter().map(|(d, _, id)| (d.clone(), id.clone())).collect();
        assert_eq!(triples[1], ("b".to_string(), records[1].id.clone()));
    }

    #[test]
    fn test_payload_serializes_count() {
        let payload = DatasetPayload::from_records("faq", vec![], &[record("a")]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["collection_name"], "faq");
        assert_eq!(value["metadatas"][0]["pregunta"], "a");
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(record("a").id, record("a").id);
    }
}
