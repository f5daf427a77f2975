//! Per-record outcome of a collection build.

use std::fmt;

use serde::Serialize;

use crate::engine::{CollectionHandle, EngineError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RecordOutcome {
    Inserted,
    Failed(String),
    /// The build stopped before reaching this record.
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestEntry {
    pub id: String,
    pub outcome: RecordOutcome,
}

/// Outcome of every payload record, in payload order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    collection: String,
    entries: Vec<IngestEntry>,
}

impl IngestReport {
    /// Report with every id still pending.
    pub fn pending(collection: &str, ids: &[String]) -> Self {
        Self {
            collection: collection.to_string(),
            entries: ids
                .iter()
                .map(|id| IngestEntry {
                    id: id.clone(),
                    outcome: RecordOutcome::NotAttempted,
                })
                .collect(),
        }
    }

    pub(crate) fn set(&mut self, index: usize, outcome: RecordOutcome) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.outcome = outcome;
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn entries(&self) -> &[IngestEntry] {
        &self.entries
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    fn count(&self, pred: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }

    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Inserted))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Failed(_)))
    }

    pub fn not_attempted(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::NotAttempted))
    }

    pub fn is_complete(&self) -> bool {
        self.inserted() == self.total()
    }

    /// Ids that did not make it in, for a retry.
    pub fn missing_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.outcome != RecordOutcome::Inserted)
            .map(|e| e.id.as_str())
            .collect()
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} inserted",
            self.collection,
            self.inserted(),
            self.total()
        )?;
        if self.failed() > 0 {
            write!(f, ", {} failed", self.failed())?;
        }
        if self.not_attempted() > 0 {
            write!(f, ", {} not attempted", self.not_attempted())?;
        }
        Ok(())
    }
}

/// Result of [`CollectionStore::build_collection_with_report`](super::CollectionStore::build_collection_with_report).
pub enum BuildOutcome {
    Built {
        collection: CollectionHandle,
        report: IngestReport,
    },
    /// A collection whose name contains the payload's name already exists.
    AlreadyExists,
    /// Creation or an insertion failed. Records inserted before the failure remain.
    Aborted {
        report: IngestReport,
        error: EngineError,
    },
}

impl BuildOutcome {
    pub fn report(&self) -> Option<&IngestReport> {
        match self {
            BuildOutcome::Built { report, .. } | BuildOutcome::Aborted { report, .. } => {
                Some(report)
            }
            BuildOutcome::AlreadyExists => None,
        }
    }

    pub fn into_collection(self) -> Option<CollectionHandle> {
        match self {
            BuildOutcome::Built { collection, .. } => Some(collection),
            _ => None,
        }
    }
}

impl fmt::Debug for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildOutcome::Built { collection, report } => f
                .debug_struct("Built")
                .field("collection", &collection.name())
                .field("report", report)
                .finish(),
            BuildOutcome::AlreadyExists => f.write_str("AlreadyExists"),
            BuildOutcome::Aborted { report, error } => f
                .debug_struct("Aborted")
                .field("report", report)
                .field("error", error)
                .finish(),
        }
    }
}

/// Result of [`CollectionStore::delete_collection`](super::CollectionStore::delete_collection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Name of the collection actually removed.
    Deleted(String),
    /// The operator declined.
    Aborted,
    NotFound,
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let mut report = IngestReport::pending("faq", &ids);
        report.set(0, RecordOutcome::Inserted);
        report.set(1, RecordOutcome::Failed("duplicate".to_string()));

        assert_eq!(report.inserted(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.not_attempted(), 1);
        assert!(!report.is_complete());
        assert_eq!(report.missing_ids(), ["b", "c"]);
        assert_eq!(
            report.to_string(),
            "faq: 1/3 inserted, 1 failed, 1 not attempted"
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(RecordOutcome::Failed("boom".to_string())).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "boom");
    }
}
