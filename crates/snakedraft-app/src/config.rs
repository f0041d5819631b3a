// Configuration loading and parsing (draft.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use snakedraft_core::draft::DraftRules;

/// File name of the draft configuration under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "draft.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub draft: DraftConfig,
    pub catalog_path: String,
    pub ws_port: u16,
    /// Explicit database path. `None` means the platform data directory.
    pub db_path: Option<String>,
    pub export_dir: String,
}

impl Config {
    /// Draft limits handed to the engine.
    pub fn rules(&self) -> DraftRules {
        DraftRules {
            min_rounds: self.draft.min_rounds,
            max_rounds: self.draft.max_rounds,
            board_size: self.draft.board_size,
            admins: self.draft.admins.clone(),
        }
    }

    /// Where the draft database lives.
    ///
    /// Falls back to `snakedraft.db` in the platform data directory, and to
    /// the working directory when no home directory can be determined.
    pub fn resolved_db_path(&self) -> PathBuf {
        if let Some(path) = &self.db_path {
            return PathBuf::from(path);
        }
        directories::ProjectDirs::from("", "", "snakedraft")
            .map(|dirs| dirs.data_dir().join("snakedraft.db"))
            .unwrap_or_else(|| PathBuf::from("snakedraft.db"))
    }
}

// ---------------------------------------------------------------------------
// draft.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire draft.toml file.
#[derive(Debug, Clone, Deserialize)]
struct DraftFile {
    draft: DraftConfig,
    catalog: CatalogSection,
    websocket: WebsocketSection,
    #[serde(default)]
    database: DatabaseSection,
    #[serde(default)]
    export: ExportSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftConfig {
    pub min_rounds: u32,
    pub max_rounds: u32,
    #[serde(default = "default_board_size")]
    pub board_size: usize,
    #[serde(default)]
    pub admins: Vec<String>,
}

fn default_board_size() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WebsocketSection {
    port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExportSection {
    dir: String,
}

impl Default for ExportSection {
    fn default() -> Self {
        ExportSection {
            dir: "exports".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draft.toml` relative to the
/// given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: DraftFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        draft: file.draft,
        catalog_path: file.catalog.path,
        ws_port: file.websocket.port,
        db_path: file.database.path,
        export_dir: file.export.dir,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy `defaults/draft.toml` to `config/draft.toml` unless the config file
/// already exists. Returns the copied path, if any.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let source = base_dir.join("defaults").join(CONFIG_FILE);
    let config_dir = base_dir.join("config");
    let target = config_dir.join(CONFIG_FILE);

    if target.exists() {
        return Ok(vec![]);
    }
    if !source.exists() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither defaults/{CONFIG_FILE} nor config/{CONFIG_FILE} found in {}; \
                 run from the crate root or ensure defaults/ is present",
                base_dir.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;
    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    })?;
    Ok(vec![target])
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let draft = &config.draft;
    if draft.min_rounds == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.min_rounds".into(),
            message: "must be at least 1".into(),
        });
    }
    if draft.min_rounds > draft.max_rounds {
        return Err(ConfigError::ValidationError {
            field: "draft.max_rounds".into(),
            message: format!(
                "must be >= min_rounds ({}), got {}",
                draft.min_rounds, draft.max_rounds
            ),
        });
    }
    if draft.board_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.board_size".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.ws_port == 0 {
        return Err(ConfigError::ValidationError {
            field: "websocket.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.catalog_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "catalog.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
