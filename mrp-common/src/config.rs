//! Configuration loading and root folder resolution
//!
//! TOML settings are optional: a missing file logs a warning and the compiled
//! defaults are used. Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `MRP_ROOT_FOLDER` environment variable
//! 3. TOML `root_folder` key
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MRP_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "MRP_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "mrp.db";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Root folder holding the database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub resolver: ResolverSettings,

    #[serde(default)]
    pub plans: PlanDefaults,
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default tracing level (overridden by RUST_LOG)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5740
}

/// `[resolver]` section: tunables for well identity resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverSettings {
    /// Minimum cleaned name length (exclusive) before the statewide exact-name
    /// strategy is attempted
    pub exact_name_min_len: usize,

    /// Maximum candidates returned by any strategy
    pub max_candidates: usize,

    /// Above this many candidates the row is reported as too broad
    pub ambiguous_list_limit: usize,

    /// Score at or above which a single candidate dominates an ambiguous set
    pub dominant_score: u8,

    /// Maximum rows accepted in one validate/commit request
    pub max_batch_rows: usize,

    /// Rows resolved concurrently within one batch
    pub max_concurrent_rows: usize,

    /// Per-row deadline for registry queries
    pub row_timeout_ms: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            exact_name_min_len: 10,
            max_candidates: 15,
            ambiguous_list_limit: 10,
            dominant_score: 90,
            max_batch_rows: 2000,
            max_concurrent_rows: 8,
            row_timeout_ms: 10_000,
        }
    }
}

/// `[plans]` section: limits applied to users without an explicit plan row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanDefaults {
    pub default_plan: String,

    /// `0` means unlimited
    pub default_well_limit: usize,
}

impl PlanDefaults {
    /// Limit for users without a plan row; `None` means unlimited
    pub fn well_limit(&self) -> Option<usize> {
        (self.default_well_limit > 0).then_some(self.default_well_limit)
    }
}

impl Default for PlanDefaults {
    fn default() -> Self {
        Self {
            default_plan: "free".to_string(),
            default_well_limit: 25,
        }
    }
}

/// Default config file location for a module: `<config_dir>/mrp/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mrp").join(format!("{}.toml", module_name)))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Write a TOML config file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Locate and load configuration
///
/// Priority: explicit path → `MRP_CONFIG` → default location. An explicit path
/// (argument or env) that cannot be parsed is an error; a missing default file
/// falls back to compiled defaults.
pub fn load_config(explicit: Option<&Path>, module_name: &str) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        info!("Loading config from {}", path.display());
        return load_toml_config(path);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        info!("Loading config from {} ({})", path.display(), CONFIG_ENV_VAR);
        return load_toml_config(&path);
    }

    match default_config_path(module_name) {
        Some(path) if path.exists() => {
            info!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        Some(path) => {
            warn!(
                "Config file not found at {} - using compiled defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory - using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Resolve the root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mrp"))
        .unwrap_or_else(|| PathBuf::from("./mrp_data"))
}

/// Creates the root folder and derives file locations inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder: {}", self.root_folder.display());
            std::fs::create_dir_all(&self.root_folder)?;
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}
