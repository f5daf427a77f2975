pub mod cli;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod io;
pub mod logging;
#[cfg(feature = "http-server")]
pub mod server;
pub mod store;
pub mod utils;

pub use config::Settings;
pub use dataset::{DatasetError, DatasetLoader, DatasetPayload, DatasetRecord, DatasetVariant};
pub use engine::{
    Collection, CollectionHandle, EngineError, EngineResult, HashEmbedder, Include, LocalEngine,
    QueryResult, VectorEngine,
};
pub use store::{
    AutoOperator, BuildOutcome, CollectionSnapshot, CollectionStore, CursorClient,
    DeleteOutcome, IngestReport, Operator,
};
