//! Collection management and record access.
//!
//! [`CollectionStore`] owns the collection lifecycle (create, build from a
//! dataset, inspect, query, delete). [`CursorClient`] binds one collection and
//! works on single records. Both resolve names with [`tolerant_match`].

pub mod cursor;
pub mod manager;
pub mod operator;
pub mod report;
pub mod snapshot;

pub use cursor::CursorClient;
pub use manager::{CollectionListing, CollectionStore};
pub use operator::{AutoOperator, ConsoleOperator, Operator};
pub use report::{BuildOutcome, DeleteOutcome, IngestEntry, IngestReport, RecordOutcome};
pub use snapshot::{CollectionSnapshot, SnapshotRow};

use crate::engine::CollectionInfo;

/// First collection, in listing order, whose name contains `name`.
pub fn tolerant_match<'a>(
    collections: &'a [CollectionInfo],
    name: &str,
) -> Option<&'a CollectionInfo> {
    collections.iter().find(|info| info.name.contains(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerant_match_prefers_listing_order() {
        let collections = vec![
            CollectionInfo::new("crm_collection"),
            CollectionInfo::new("abc_collection"),
        ];
        assert_eq!(
            tolerant_match(&collections, "collection").unwrap().name,
            "crm_collection"
        );
        assert_eq!(tolerant_match(&collections, "abc").unwrap().name, "abc_collection");
        assert!(tolerant_match(&collections, "monotributo").is_none());
    }
}
