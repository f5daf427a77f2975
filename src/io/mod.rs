//! Terminal-facing output helpers.

pub mod progress;

pub use progress::{
    BarStyle, ConsoleProgress, NoProgress, ProgressLine, ProgressReporter, RecordingProgress,
};
