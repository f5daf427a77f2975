//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod collections;
pub mod datasets;
pub mod init;
pub mod mount;
pub mod query;
pub mod records;
pub mod serve;
pub mod stress;

use anyhow::Context;

use crate::config::Settings;
use crate::store::CollectionStore;

/// Connect a collection store using the active settings.
pub(crate) fn open_store(settings: &Settings) -> anyhow::Result<CollectionStore> {
    CollectionStore::connect_with(&settings.database, &settings.embedding).with_context(|| {
        format!(
            "failed to connect to the {:?} database",
            settings.database.mode
        )
    })
}
