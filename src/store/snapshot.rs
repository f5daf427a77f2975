//! Tabular preview of a collection.

use std::fmt;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;

use crate::engine::{Metadata, PeekResult};
use crate::utils::truncate_chars;

const CELL_WIDTH: usize = 60;
const EMBEDDING_PREVIEW: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Row count plus the first rows of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSnapshot {
    collection: String,
    total: usize,
    columns: Vec<String>,
    rows: Vec<SnapshotRow>,
}

impl CollectionSnapshot {
    /// Build from a peek. With `skip_embeddings` the `embeddings` column and
    /// every row's embedding are dropped.
    pub fn from_peek(
        collection: impl Into<String>,
        total: usize,
        peek: PeekResult,
        skip_embeddings: bool,
    ) -> Self {
        let mut columns: Vec<String> = ["ids", "documents", "metadatas"]
            .into_iter()
            .map(str::to_string)
            .collect();
        if !skip_embeddings {
            columns.push("embeddings".to_string());
        }

        let mut documents = peek.documents.into_iter();
        let mut metadatas = peek.metadatas.into_iter();
        let mut embeddings = peek.embeddings.into_iter();

        let rows = peek
            .ids
            .into_iter()
            .map(|id| {
                let document = documents.next().unwrap_or_default();
                let metadata = metadatas.next().unwrap_or_default();
                let embedding = embeddings.next();
                SnapshotRow {
                    id,
                    document,
                    metadata,
                    embedding: if skip_embeddings { None } else { embedding },
                }
            })
            .collect();

        Self {
            collection: collection.into(),
            total,
            columns,
            rows,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Rows in the whole collection, not just the preview.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[SnapshotRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(self.columns.clone());

        for row in &self.rows {
            let mut cells = vec![
                row.id.clone(),
                truncate_chars(&row.document, CELL_WIDTH),
                truncate_chars(&format_metadata(&row.metadata), CELL_WIDTH),
            ];
            if let Some(ref embedding) = row.embedding {
                cells.push(format_embedding(embedding));
            }
            table.add_row(cells);
        }
        table
    }
}

impl fmt::Display for CollectionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({} of {} rows)",
            self.collection,
            self.rows.len(),
            self.total
        )?;
        write!(f, "{}", self.to_table())
    }
}

fn format_metadata(metadata: &Metadata) -> String {
    metadata
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// First few components and the dimension, e.g. `[0.120, -0.031, … (384)]`.
fn format_embedding(embedding: &[f32]) -> String {
    let head: Vec<String> = embedding
        .iter()
        .take(EMBEDDING_PREVIEW)
        .map(|x| format!("{x:.3}"))
        .collect();
    format!("[{}, … ({})]", head.join(", "), embedding.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peek(n: usize) -> PeekResult {
        PeekResult {
            ids: (0..n).map(|i| format!("id-{i}")).collect(),
            documents: (0..n).map(|i| format!("question {i}")).collect(),
            metadatas: (0..n)
                .map(|i| {
                    let mut m = Metadata::new();
                    m.insert("respuesta".to_string(), format!("answer {i}"));
                    m
                })
                .collect(),
            embeddings: (0..n).map(|_| vec![0.5, -0.25, 0.0, 1.0]).collect(),
        }
    }

    #[test]
    fn test_skip_embeddings_drops_column() {
        let snapshot = CollectionSnapshot::from_peek("faq", 10, peek(2), true);
        assert_eq!(snapshot.columns(), ["ids", "documents", "metadatas"]);
        assert!(snapshot.rows().iter().all(|row| row.embedding.is_none()));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["rows"][0].get("embedding").is_none());
    }

    #[test]
    fn test_with_embeddings() {
        let snapshot = CollectionSnapshot::from_peek("faq", 2, peek(2), false);
        assert_eq!(snapshot.columns().len(), 4);
        assert_eq!(snapshot.rows()[1].embedding.as_ref().unwrap().len(), 4);
        assert_eq!(format_embedding(&[0.5, -0.25, 0.0, 1.0]), "[0.500, -0.250, 0.000, … (4)]");
    }

    #[test]
    fn test_display_mentions_counts() {
        let snapshot = CollectionSnapshot::from_peek("faq", 7, peek(3), true);
        let rendered = snapshot.to_string();
        assert!(rendered.starts_with("faq (3 of 7 rows)"));
        assert!(rendered.contains("respuesta: answer 0"));
    }
}
