use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_fetch_concurrency() -> usize {
    4
}

fn default_fetch_max_attempts() -> usize {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

fn default_retry_max_delay_ms() -> u64 {
    5_000
}

fn default_write_max_attempts() -> usize {
    3
}

/// Batch ingestion tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Most file store fetches in flight at once.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Attempts per fetch when the file store reports a transient error.
    #[serde(default = "default_fetch_max_attempts")]
    pub fetch_max_attempts: usize,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Times an account's reconciliation restarts from load after losing a
    /// write race.
    #[serde(default = "default_write_max_attempts")]
    pub write_max_attempts: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: default_fetch_concurrency(),
            fetch_max_attempts: default_fetch_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            write_max_attempts: default_write_max_attempts(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Root of the local file store (holds `manifest.toml`). If relative,
    /// resolved from the config file location. Defaults to `<data_dir>/inbox`.
    pub inbox_dir: Option<PathBuf>,

    /// Batch ingestion settings.
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        resolve_dir(self.data_dir.as_deref(), config_dir)
            .unwrap_or_else(|| config_dir.to_path_buf())
    }

    pub fn resolve_inbox_dir(&self, config_dir: &Path) -> PathBuf {
        resolve_dir(self.inbox_dir.as_deref(), config_dir)
            .unwrap_or_else(|| self.resolve_data_dir(config_dir).join("inbox"))
    }
}

fn resolve_dir(dir: Option<&Path>, config_dir: &Path) -> Option<PathBuf> {
    match dir {
        Some(dir) if dir.is_absolute() => Some(dir.to_path_buf()),
        Some(dir) => Some(config_dir.join(dir)),
        None => None,
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Where partitions and the processed-file ledger live.
    pub data_dir: PathBuf,

    /// Root of the local file store.
    pub inbox_dir: PathBuf,

    pub ingest: IngestConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./numifocus.toml` if it exists in current directory
/// 2. `~/.local/share/numifocus/numifocus.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("numifocus.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("numifocus").join("numifocus.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// Directories are resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self::resolve(config, config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// A missing config file's intended parent directory becomes the data
    /// directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };
        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Self::resolve(Config::default(), config_dir))
    }

    fn resolve(config: Config, config_dir: &Path) -> Self {
        Self {
            data_dir: config.resolve_data_dir(config_dir),
            inbox_dir: config.resolve_inbox_dir(config_dir),
            ingest: config.ingest,
        }
    }
}
