//! Collection management commands.

use std::sync::Arc;

use anyhow::{Context, bail};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;

use super::open_store;
use crate::config::Settings;
use crate::io::{ConsoleProgress, NoProgress, ProgressReporter};
use crate::store::{BuildOutcome, DeleteOutcome};

pub fn run_list(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let listing = store.list_collections()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }
    if listing.names.is_empty() {
        println!("No collections. Build one with: faqstore collections build <KEY>");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Collection", "Records"]);
    for name in &listing.names {
        let records = store
            .find_exact(name)?
            .map(|collection| collection.count())
            .transpose()?
            .unwrap_or_default();
        table.add_row(vec![name.clone(), records.to_string()]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_create(settings: &Settings, name: &str) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    match store
        .create_collection(name)
        .with_context(|| format!("failed to create '{name}'"))?
    {
        Some(collection) => println!("Created collection '{}'", collection.name()),
        None => println!("A collection matching '{name}' already exists"),
    }
    Ok(())
}

/// Build the collections of the given dataset keys.
pub fn run_build(
    settings: &Settings,
    keys: &[String],
    all: bool,
    rebuild: bool,
    no_progress: bool,
) -> anyhow::Result<()> {
    let keys: Vec<String> = if all {
        settings.datasets.keys().cloned().collect()
    } else {
        keys.to_vec()
    };

    let progress: Arc<dyn ProgressReporter> = if no_progress {
        Arc::new(NoProgress)
    } else {
        Arc::new(ConsoleProgress::default())
    };
    let store = open_store(settings)?.with_progress(progress);

    let mut failures = 0;
    for key in &keys {
        let dataset = settings
            .dataset(key)
            .with_context(|| format!("unknown dataset '{key}'"))?;
        let loader = dataset
            .load()
            .with_context(|| format!("failed to load dataset '{key}'"))?;
        let payload = loader.get_data();

        if rebuild && store.find_exact(payload.collection_name())?.is_some() {
            if let DeleteOutcome::Failed(reason) =
                store.delete_collection(payload.collection_name(), true)
            {
                bail!("could not drop '{}': {reason}", payload.collection_name());
            }
        }

        println!(
            "Building '{}' from {} ({} records, {} duplicates dropped)",
            payload.collection_name(),
            loader.source().display(),
            payload.count(),
            loader.duplicate_count()
        );

        match store.build_collection_with_report(&payload) {
            BuildOutcome::Built { report, .. } => println!("{report}"),
            BuildOutcome::AlreadyExists => println!(
                "Skipped: a collection matching '{}' already exists (use --rebuild)",
                payload.collection_name()
            ),
            BuildOutcome::Aborted { report, error } => {
                eprintln!("Build aborted: {error}");
                eprintln!("{report}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} build(s) aborted");
    }
    Ok(())
}

pub fn run_delete(settings: &Settings, name: &str, yes: bool) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    match store.delete_collection(name, yes) {
        DeleteOutcome::Deleted(deleted) => println!("Deleted collection '{deleted}'"),
        DeleteOutcome::Aborted => println!("Deletion aborted"),
        DeleteOutcome::NotFound => println!("No collection matches '{name}'"),
        DeleteOutcome::Failed(reason) => bail!("could not delete '{name}': {reason}"),
    }
    Ok(())
}

pub fn run_info(
    settings: &Settings,
    name: &str,
    rows: Option<usize>,
    with_embeddings: bool,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let rows = rows.unwrap_or(settings.query.peek_rows);

    let Some(snapshot) = store.peek_collection(name, rows, !with_embeddings)? else {
        bail!("collection '{name}' not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{snapshot}");
    }
    Ok(())
}
