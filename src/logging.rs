//! Timestamped logging with per-module levels.
//!
//! Output goes to stderr so command output on stdout stays machine-readable.
//!
//! # Configuration
//!
//! ```toml
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! "faqstore::store" = "info"
//! ```
//!
//! `RUST_LOG` takes precedence over config:
//! ```bash
//! RUST_LOG=info faqstore collections build abc
//! RUST_LOG=faqstore::engine=debug faqstore query abc "monotributo"
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Filter directives for a config: default level, then module overrides.
pub fn filter_directives(config: &LoggingConfig) -> String {
    config
        .modules
        .iter()
        .fold(config.default.clone(), |mut directives, (module, level)| {
            directives.push_str(&format!(",{module}={level}"));
            directives
        })
}

/// Install the global subscriber. Only the first call has an effect.
///
/// Levels used across the crate:
/// - `error` - aborted ingestion
/// - `warn` - duplicate dataset rows, failed deletions (default level)
/// - `info` - not-found and already-exists notices, connection lifecycle
/// - `debug` - per-call engine detail
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directives(config))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Initialize with `LoggingConfig::default()` (warn).
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// Info-level `[component] event: detail` line.
///
/// # Examples
/// ```ignore
/// log_event!("store", "not found", "{name}");
/// log_event!("cursor", "disconnected");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-level variant of [`log_event!`].
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Warn-level variant of [`log_event!`].
#[macro_export]
macro_rules! warn_event {
    ($component:expr, $event:expr) => {
        tracing::warn!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::warn!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Error-level variant of [`log_event!`].
#[macro_export]
macro_rules! error_event {
    ($component:expr, $event:expr) => {
        tracing::error!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::error!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}
