//! CLI argument parsing using clap.
//!
//! Contains the Cli struct, Commands enum, and all subcommand enums.

use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::utils::parse_key_value;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const AFTER_HELP: &str = "Quick Start:
  $ faqstore init                          # Create .faqstore/settings.toml
  $ faqstore collections build --all       # Load every configured dataset
  $ faqstore query abc \"¿Cómo me inscribo?\" # Ask a collection
  $ faqstore serve                         # Answer questions over HTTP";

/// FAQ retrieval over a vector store
#[derive(Parser)]
#[command(
    name = "faqstore",
    version = env!("CARGO_PKG_VERSION"),
    about = "FAQ retrieval over a vector store",
    long_about = "Load pipe-delimited FAQ datasets into vector collections and query them by similarity.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create .faqstore/settings.toml with default configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Inspect configured dataset files
    Datasets {
        #[command(subcommand)]
        action: DatasetAction,
    },

    /// Create, build, inspect and delete collections
    Collections {
        #[command(subcommand)]
        action: CollectionAction,
    },

    /// Ask a collection for its nearest questions
    Query {
        /// Collection name (substring match)
        collection: String,

        /// Question text
        text: String,

        /// Number of results (overrides config)
        #[arg(short, long)]
        n_results: Option<usize>,

        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Insert, update or delete single records
    Records {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// Run a local Chroma server on the configured database path
    Mount,

    /// Measure sequential query throughput
    Stress {
        /// Collection name (substring match); first listed collection if omitted
        collection: Option<String>,

        /// Query counts to time, comma separated
        #[arg(long, value_delimiter = ',', default_values_t = [10, 20, 30, 50, 100])]
        intervals: Vec<usize>,

        /// Query text
        #[arg(long, default_value = "default_query")]
        text: String,
    },

    /// Serve collection queries over HTTP
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum DatasetAction {
    /// List configured datasets
    List,

    /// Parse a dataset and summarize it
    Inspect {
        /// Dataset key from [datasets]
        key: String,

        /// List the duplicate questions that were dropped
        #[arg(long)]
        duplicates: bool,

        /// Print the full payload as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum CollectionAction {
    /// List collections in the store
    List {
        #[arg(long)]
        json: bool,
    },

    /// Create an empty collection
    Create { name: String },

    /// Build collections from configured datasets
    Build {
        /// Dataset keys to build
        #[arg(value_name = "KEY", required_unless_present = "all")]
        keys: Vec<String>,

        /// Build every configured dataset
        #[arg(long)]
        all: bool,

        /// Delete an existing collection first
        #[arg(long)]
        rebuild: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Delete a collection
    Delete {
        /// Collection name; substring match unless --yes
        name: String,

        /// Skip confirmation and delete the exact name
        #[arg(short, long)]
        yes: bool,
    },

    /// Show row count and the first rows
    Info {
        /// Collection name (substring match)
        name: String,

        /// Rows to show (overrides config)
        #[arg(long)]
        rows: Option<usize>,

        /// Include embeddings
        #[arg(long)]
        with_embeddings: bool,

        #[arg(long)]
        json: bool,
    },
}

/// Document fields for insert and update.
#[derive(Args)]
pub struct RecordArgs {
    /// Collection name (substring match)
    pub collection: String,

    /// Record id; insert generates one when omitted
    #[arg(long)]
    pub id: Option<String>,

    /// Document (question) text
    #[arg(long)]
    pub document: String,

    /// Metadata entries, repeatable
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub meta: Vec<(String, String)>,
}

#[derive(Subcommand)]
pub enum RecordAction {
    /// Add a record
    Insert(RecordArgs),

    /// Replace the document and metadata of a record
    Update(RecordArgs),

    /// Remove a record
    Delete {
        /// Collection name (substring match)
        collection: String,

        #[arg(long)]
        id: String,
    },
}
