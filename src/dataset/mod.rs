//! FAQ dataset files.
//!
//! A dataset is a `|`-delimited text file with a header row and one of three
//! column layouts ([`DatasetVariant`]). Loading drops rows whose question was
//! already seen and gives every kept row a random UUID.

pub mod error;
pub mod loader;
pub mod types;
pub mod variant;

pub use error::{DatasetError, DatasetResult};
pub use loader::DatasetLoader;
pub use types::{DatasetPayload, DatasetRecord};
pub use variant::DatasetVariant;
