//! Single-record commands through a cursor.

use anyhow::{Context, bail};

use crate::cli::args::RecordArgs;
use crate::config::Settings;
use crate::dataset::DatasetRecord;
use crate::engine::Metadata;
use crate::store::CursorClient;

fn bind_cursor(settings: &Settings, collection: &str) -> anyhow::Result<CursorClient> {
    let mut client = CursorClient::connect_with(&settings.database, &settings.embedding)
        .context("failed to connect to the database")?;
    if !client.set_cursor(collection)? {
        bail!("collection '{collection}' not found");
    }
    Ok(client)
}

/// Record from CLI fields. The document doubles as `pregunta` unless given.
fn record_from(args: &RecordArgs, id: String) -> DatasetRecord {
    let mut metadata = Metadata::new();
    metadata.insert("pregunta".to_string(), args.document.clone());
    for (key, value) in &args.meta {
        metadata.insert(key.clone(), value.clone());
    }
    DatasetRecord::new(args.document.clone(), metadata, id)
}

pub fn run_insert(settings: &Settings, args: &RecordArgs) -> anyhow::Result<()> {
    let client = bind_cursor(settings, &args.collection)?;
    let id = args
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let record = record_from(args, id);

    if !client.insert_data(&record) {
        bail!("insert of '{}' failed", record.id);
    }
    println!(
        "Inserted '{}' into '{}'",
        record.id,
        client.cursor_name().unwrap_or_default()
    );
    Ok(())
}

pub fn run_update(settings: &Settings, args: &RecordArgs) -> anyhow::Result<()> {
    let Some(id) = args.id.clone() else {
        bail!("--id is required for update");
    };
    let client = bind_cursor(settings, &args.collection)?;
    let record = record_from(args, id);

    client
        .update_data(&record)
        .with_context(|| format!("update of '{}' failed", record.id))?;
    println!("Updated '{}'", record.id);
    Ok(())
}

pub fn run_delete(settings: &Settings, collection: &str, id: &str) -> anyhow::Result<()> {
    let client = bind_cursor(settings, collection)?;
    client
        .delete_data(id)
        .with_context(|| format!("delete of '{id}' failed"))?;
    println!("Deleted '{id}'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_args_keeps_question() {
        let args = RecordArgs {
            collection: "abc".to_string(),
            id: None,
            document: "¿Qué es?".to_string(),
            meta: vec![("respuesta".to_string(), "Un régimen".to_string())],
        };
        let record = record_from(&args, "id-1".to_string());
        assert_eq!(record.metadata["pregunta"], "¿Qué es?");
        assert_eq!(record.metadata["respuesta"], "Un régimen");
        assert_eq!(record.id, "id-1");
    }
}
