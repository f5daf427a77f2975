//! Dataset inspection commands.

use anyhow::Context;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;

use crate::config::Settings;

pub fn run_list(settings: &Settings) -> anyhow::Result<()> {
    if settings.datasets.is_empty() {
        println!("No datasets configured. Add one under [datasets.<key>] in settings.toml.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Key", "File", "Variant", "Collection", "Present"]);

    for (key, dataset) in &settings.datasets {
        table.add_row(vec![
            key.clone(),
            dataset.path.display().to_string(),
            dataset.variant.to_string(),
            dataset.collection.clone(),
            if dataset.path.exists() { "yes" } else { "no" }.to_string(),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Parse one dataset and print counts, duplicates or the whole payload.
pub fn run_inspect(
    settings: &Settings,
    key: &str,
    show_duplicates: bool,
    json: bool,
) -> anyhow::Result<()> {
    let dataset = settings
        .dataset(key)
        .with_context(|| format!("unknown dataset '{key}'"))?;
    let loader = dataset
        .load()
        .with_context(|| format!("failed to load dataset '{key}'"))?;
    let payload = loader.get_data();

    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("Dataset:     {key}");
    println!("File:        {}", loader.source().display());
    println!("Variant:     {}", loader.variant());
    println!("Collection:  {}", payload.collection_name());
    println!("Records:     {}", payload.count());
    println!("Duplicates:  {}", loader.duplicate_count());
    println!("Fields:      {}", payload.doc_info().join(", "));

    if show_duplicates && loader.duplicate_count() > 0 {
        println!();
        println!("Dropped duplicate questions:");
        for question in loader.duplicates() {
            println!("  - {question}");
        }
    }
    Ok(())
}
