//! Eager parser for `|`-delimited FAQ files.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::error::{DatasetError, DatasetResult};
use super::types::{DatasetPayload, DatasetRecord};
use super::variant::DatasetVariant;

/// Parsed dataset. Construction reads the whole source.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    source: PathBuf,
    variant: DatasetVariant,
    collection_name: String,
    records: Vec<DatasetRecord>,
    duplicates: Vec<String>,
}

impl DatasetLoader {
    /// Parse the file at `path`.
    pub fn load(
        path: impl AsRef<Path>,
        variant: DatasetVariant,
        collection_name: &str,
    ) -> DatasetResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(file, path.to_path_buf(), variant, collection_name)
    }

    /// Parse any reader, e.g. an in-memory buffer.
    pub fn from_reader<R: Read>(
        reader: R,
        variant: DatasetVariant,
        collection_name: &str,
    ) -> DatasetResult<Self> {
        Self::parse(reader, PathBuf::from("<reader>"), variant, collection_name)
    }

    fn parse<R: Read>(
        reader: R,
        source: PathBuf,
        variant: DatasetVariant,
        collection_name: &str,
    ) -> DatasetResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'|')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut rows = csv_reader.records();
        let decode_error = |source: &Path, error: csv::Error| DatasetError::Csv {
            path: source.to_path_buf(),
            source: error,
        };

        // Header row: required, never inspected.
        match rows.next() {
            Some(header) => {
                header.map_err(|e| decode_error(&source, e))?;
            }
            None => return Err(DatasetError::MissingHeader { path: source }),
        }

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut duplicates = Vec::new();

        for row in rows {
            let row = row.map_err(|e| decode_error(&source, e))?;
            if row.len() < variant.columns() {
                return Err(DatasetError::MalformedRow {
                    path: source,
                    line: row.position().map(|p| p.line()).unwrap_or_default(),
                    expected: variant.columns(),
                    found: row.len(),
                });
            }

            let question = row.get(variant.question_column()).unwrap_or_default();
            if !seen.insert(question.to_string()) {
                duplicates.push(question.to_string());
                continue;
            }

            records.push(DatasetRecord::with_random_id(question, variant.metadata(&row)));
        }

        if !duplicates.is_empty() {
            let file_name = source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| source.display().to_string());
            crate::warn_event!(
                "dataset",
                "duplicates filtered",
                "{} duplicate rows in \"{file_name}\"",
                duplicates.len()
            );
        }

        Ok(Self {
            source,
            variant,
            collection_name: collection_name.to_string(),
            records,
            duplicates,
        })
    }

    /// Collection-ready payload. Pure projection of the parsed records.
    pub fn get_data(&self) -> DatasetPayload {
        let doc_info = self
            .variant
            .metadata_keys()
            .into_iter()
            .map(str::to_string)
            .collect();
        DatasetPayload::from_records(&self.collection_name, doc_info, &self.records)
    }

    pub fn records(&self) -> &[DatasetRecord] {
        &self.records
    }

    /// Number of rows dropped because their question was already seen.
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }

    /// Questions of dropped rows, in file order.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn variant(&self) -> DatasetVariant {
        self.variant
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }
}
