//! Error types for dataset loading.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Cannot read dataset '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset '{}' is empty: missing header row", path.display())]
    MissingHeader { path: PathBuf },

    #[error(
        "Malformed row in '{}' at line {line}: expected {expected} columns, found {found}",
        path.display()
    )]
    MalformedRow {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Cannot decode dataset '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Unknown dataset variant '{0}' (expected plain, extended or categorized)")]
    UnknownVariant(String),
}

pub type DatasetResult<T> = Result<T, DatasetError>;
