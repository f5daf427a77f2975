//! Layered configuration for faqstore.
//!
//! Sources, lowest to highest precedence:
//! - Built-in defaults
//! - `.faqstore/settings.toml` (nearest ancestor of the working directory)
//! - Environment variables
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `FAQ_` and use double underscores
//! to separate nested levels:
//! - `FAQ_DATABASE__MODE=remote` sets `database.mode`
//! - `FAQ_DATABASE__PORT=9000` sets `database.port`
//! - `FAQ_QUERY__N_RESULTS=3` sets `query.n_results`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dataset::{DatasetLoader, DatasetResult, DatasetVariant};

const CONFIG_DIR: &str = ".faqstore";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "FAQ_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Vector store connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding model used for documents and queries
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Named datasets that can be built into collections
    #[serde(default = "default_datasets")]
    pub datasets: IndexMap<String, DatasetConfig>,

    #[serde(default)]
    pub query: QueryConfig,

    /// HTTP query boundary
    #[serde(default)]
    pub server: ServerConfig,

    /// Launching a local Chroma server
    #[serde(default)]
    pub mount: MountConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the store reaches its engine.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// In-process engine persisted under `database.path`
    Persistent,
    /// In-process engine, nothing written to disk
    Ephemeral,
    /// Chroma server at `database.host:database.port`
    Remote,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_mode")]
    pub mode: ConnectionMode,

    /// Storage directory for persistent mode
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Use https for remote mode
    #[serde(default)]
    pub ssl: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Request timeout for remote mode, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// `hash`, or a fastembed model name such as `AllMiniLML6V2`
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector size of the `hash` model
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

/// One named dataset file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub variant: DatasetVariant,
    /// Collection the dataset is built into
    pub collection: String,
}

impl DatasetConfig {
    pub fn new(path: impl Into<PathBuf>, variant: DatasetVariant, collection: &str) -> Self {
        Self {
            path: path.into(),
            variant,
            collection: collection.to_string(),
        }
    }

    /// Parse the dataset file.
    pub fn load(&self) -> DatasetResult<DatasetLoader> {
        DatasetLoader::load(&self.path, self.variant, &self.collection)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QueryConfig {
    /// Hits returned when the caller gives no count
    #[serde(default = "default_n_results")]
    pub n_results: usize,

    /// Rows shown by `collections info`
    #[serde(default = "default_peek_rows")]
    pub peek_rows: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Allow any origin
    #[serde(default = "default_true")]
    pub cors: bool,

    #[serde(default = "default_server_n_results")]
    pub n_results: usize,

    /// Route path to collection name
    #[serde(default = "default_routes")]
    pub routes: IndexMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MountConfig {
    /// Chroma executable
    #[serde(default = "default_mount_command")]
    pub command: String,

    #[serde(default = "default_mount_log_path")]
    pub log_path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Level for everything without a module override
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module levels, e.g. `store = "debug"`
    #[serde(default)]
    pub modules: IndexMap<String, String>,
}

// Default value functions
fn default_version() -> u32 { 1 }
fn default_true() -> bool { true }
fn default_mode() -> ConnectionMode { ConnectionMode::Persistent }
fn default_database_path() -> PathBuf { PathBuf::from("./database") }
fn default_host() -> String { "localhost".to_string() }
fn default_port() -> u16 { 8000 }
fn default_timeout_secs() -> u64 { 30 }
fn default_embedding_model() -> String { "hash".to_string() }
fn default_dimension() -> usize { crate::engine::embedding::DEFAULT_DIMENSION }
fn default_n_results() -> usize { 5 }
fn default_peek_rows() -> usize { crate::engine::DEFAULT_PEEK_LIMIT }
fn default_bind() -> String { "127.0.0.1:3000".to_string() }
fn default_server_n_results() -> usize { 5 }
fn default_mount_command() -> String { "chroma".to_string() }
fn default_mount_log_path() -> PathBuf { PathBuf::from("logs/chroma.log") }
fn default_log_level() -> String { "warn".to_string() }

fn default_datasets() -> IndexMap<String, DatasetConfig> {
    let mut datasets = IndexMap::new();
    datasets.insert(
        "abc".to_string(),
        DatasetConfig::new("data/abc.csv", DatasetVariant::Plain, "abc_collection"),
    );
    datasets.insert(
        "crm".to_string(),
        DatasetConfig::new("data/crm.csv", DatasetVariant::Extended, "crm_collection"),
    );
    datasets.insert(
        "monotributo".to_string(),
        DatasetConfig::new(
            "data/monotributo.csv",
            DatasetVariant::Categorized,
            "monotributo_collection",
        ),
    );
    datasets
}

fn default_routes() -> IndexMap<String, String> {
    let mut routes = IndexMap::new();
    routes.insert("/abc_consultas_frecuentes".to_string(), "abc_collection".to_string());
    routes.insert("/crm_respuestas".to_string(), "crm_collection".to_string());
    routes.insert(
        "/monotributo_respuestas".to_string(),
        "monotributo_collection".to_string(),
    );
    routes
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: DatabaseConfig::default(),
            embedding: EmbeddingConfig::default(),
            datasets: default_datasets(),
            query: QueryConfig::default(),
            server: ServerConfig::default(),
            mount: MountConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            path: default_database_path(),
            host: default_host(),
            port: default_port(),
            ssl: false,
            tenant: None,
            database: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    pub fn ephemeral() -> Self {
        Self {
            mode: ConnectionMode::Ephemeral,
            ..Default::default()
        }
    }

    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: ConnectionMode::Persistent,
            path: path.into(),
            ..Default::default()
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_dimension(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            n_results: default_n_results(),
            peek_rows: default_peek_rows(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors: true,
            n_results: default_server_n_results(),
            routes: default_routes(),
        }
    }
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            command: default_mount_command(),
            log_path: default_mount_log_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: IndexMap::new(),
        }
    }
}

/// `FAQ_` variables, with `__` marking a nested key.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().replace("__", ".").into())
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config().unwrap_or_else(Self::default_config_path);
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file. A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(env_provider())
            .extract()
            .map_err(Box::new)
    }

    /// `.faqstore/settings.toml` relative to the working directory.
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Nearest `.faqstore/settings.toml` from the current directory up to root.
    pub fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Check that a readable, valid settings file exists.
    pub fn check_init() -> Result<(), String> {
        let config_path = Self::find_workspace_config().unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Cannot read configuration file: {e}"))?;
        toml::from_str::<Settings>(&content).map_err(|e| {
            format!(
                "Configuration file is corrupted: {e}\nRun 'faqstore init --force' to regenerate."
            )
        })?;

        Ok(())
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write the default settings file under `dir`.
    pub fn init_config_file_in(
        dir: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = dir.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }

    /// Write the default settings file in the working directory.
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        Self::init_config_file_in(".", force)
    }

    /// Dataset entry by key.
    pub fn dataset(&self, key: &str) -> Option<&DatasetConfig> {
        self.datasets.get(key)
    }
}
