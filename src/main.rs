use std::path::Path;

use anyhow::{anyhow, bail};
use clap::Parser;

use faqstore::Settings;
use faqstore::cli::commands::{collections, datasets, init, mount, query, records, serve, stress};
use faqstore::cli::{Cli, CollectionAction, Commands, DatasetAction, RecordAction};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    match config {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found: {}", path.display());
            }
            Settings::load_from(path)
        }
        None => Settings::load(),
    }
    .map_err(|e| anyhow!("Configuration error: {e}"))
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { force } = cli.command {
        return init::run_init(force);
    }

    let settings = load_settings(cli.config.as_deref())?;
    faqstore::logging::init_with_config(&settings.logging);
    if cli.config.is_none() {
        if let Err(warning) = Settings::check_init() {
            faqstore::debug_event!("config", "using defaults", "{warning}");
        }
    }

    dispatch(cli.command, &settings)
}

fn dispatch(command: Commands, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => init::run_init(force),
        Commands::Config => init::run_config(settings),
        Commands::Datasets { action } => match action {
            DatasetAction::List => datasets::run_list(settings),
            DatasetAction::Inspect {
                key,
                duplicates,
                json,
            } => datasets::run_inspect(settings, &key, duplicates, json),
        },
        Commands::Collections { action } => match action {
            CollectionAction::List { json } => collections::run_list(settings, json),
            CollectionAction::Create { name } => collections::run_create(settings, &name),
            CollectionAction::Build {
                keys,
                all,
                rebuild,
                no_progress,
            } => collections::run_build(settings, &keys, all, rebuild, no_progress),
            CollectionAction::Delete { name, yes } => {
                collections::run_delete(settings, &name, yes)
            }
            CollectionAction::Info {
                name,
                rows,
                with_embeddings,
                json,
            } => collections::run_info(settings, &name, rows, with_embeddings, json),
        },
        Commands::Query {
            collection,
            text,
            n_results,
            json,
        } => query::run(settings, &collection, &text, n_results, json),
        Commands::Records { action } => match action {
            RecordAction::Insert(args) => records::run_insert(settings, &args),
            RecordAction::Update(args) => records::run_update(settings, &args),
            RecordAction::Delete { collection, id } => {
                records::run_delete(settings, &collection, &id)
            }
        },
        Commands::Mount => mount::run(settings),
        Commands::Stress {
            collection,
            intervals,
            text,
        } => stress::run(settings, collection.as_deref(), &intervals, &text),
        Commands::Serve { bind } => serve::run(settings, bind),
    }
}
