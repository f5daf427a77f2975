//! Query command.

use anyhow::{Context, bail};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use super::open_store;
use crate::config::Settings;
use crate::engine::QueryResult;
use crate::utils::truncate_chars;

const ANSWER_WIDTH: usize = 80;

pub fn run(
    settings: &Settings,
    collection: &str,
    text: &str,
    n_results: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let n_results = n_results.unwrap_or(settings.query.n_results);

    let Some(result) = store
        .query_collection(collection, text, n_results)
        .with_context(|| format!("query against '{collection}' failed"))?
    else {
        bail!("collection '{collection}' not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result_table(&result));
    }
    Ok(())
}

/// Hits of the first query text: rank, distance, question, answer.
pub fn result_table(result: &QueryResult) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Distance", "Question", "Answer"]);

    let distances = result.distances.as_ref().and_then(|d| d.first());
    let metadatas = result.metadatas.as_ref().and_then(|m| m.first());

    for (rank, document) in result.first_documents().iter().enumerate() {
        let distance = distances
            .and_then(|d| d.get(rank))
            .map(|d| format!("{d:.4}"))
            .unwrap_or_default();
        let answer = metadatas
            .and_then(|m| m.get(rank))
            .and_then(|m| m.get("respuesta"))
            .map(|a| truncate_chars(a, ANSWER_WIDTH))
            .unwrap_or_default();
        table.add_row(vec![
            (rank + 1).to_string(),
            distance,
            document.clone(),
            answer,
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Metadata;

    #[test]
    fn test_result_table_rows() {
        let mut metadata = Metadata::new();
        metadata.insert("respuesta".to_string(), "Con clave fiscal.".to_string());
        let result = QueryResult {
            ids: vec![vec!["1".to_string()]],
            documents: Some(vec![vec!["¿Cómo ingreso?".to_string()]]),
            metadatas: Some(vec![vec![metadata]]),
            distances: Some(vec![vec![0.25]]),
            embeddings: None,
        };

        let rendered = result_table(&result).to_string();
        assert!(rendered.contains("0.2500"));
        assert!(rendered.contains("Con clave fiscal."));
    }
}
