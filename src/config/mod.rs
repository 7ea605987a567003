//! Configuration management.

use crate::observability::{LogFormat, LoggingConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default in-memory archive limit (50 MiB).
pub const DEFAULT_ARCHIVE_MEMORY_LIMIT: u64 = 50 * 1024 * 1024;

/// Main configuration for stockpile.
#[derive(Debug, Clone)]
pub struct StockpileConfig {
    /// Root data directory.
    pub data_dir: PathBuf,
    /// Path to the `SQLite` inventory database.
    pub database_path: PathBuf,
    /// Persistent image store directory.
    pub image_dir: PathBuf,
    /// Directory receiving finished exports.
    pub export_dir: PathBuf,
    /// Parent of per-call staging directories.
    pub staging_root: PathBuf,
    /// Batching, pacing, and compression settings.
    pub transfer: TransferSettings,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Batching, pacing, and compression knobs for the transfer pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    /// Records rendered per append when writing CSV.
    pub write_batch_size: usize,
    /// Item rows processed between yield points on import.
    pub item_yield_interval: usize,
    /// Transaction rows processed between yield points on import.
    pub transaction_yield_interval: usize,
    /// Images packaged between yield points.
    pub image_yield_interval: usize,
    /// Pause taken at each yield point. Zero only yields the thread.
    pub batch_pause: Duration,
    /// Deflate level for archive entries.
    pub compression_level: i64,
    /// Archives above this size are routed to manual extraction.
    pub archive_memory_limit: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            write_batch_size: 100,
            item_yield_interval: 50,
            transaction_yield_interval: 100,
            image_yield_interval: 5,
            batch_pause: Duration::from_millis(5),
            compression_level: 6,
            archive_memory_limit: DEFAULT_ARCHIVE_MEMORY_LIMIT,
        }
    }
}

impl TransferSettings {
    /// Settings with no pauses, for tests and batch tooling.
    #[must_use]
    pub fn unpaced() -> Self {
        Self {
            batch_pause: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Validates that every interval is non-zero and the level is in range.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] naming the offending field.
    pub fn validate(&self) -> crate::Result<()> {
        let intervals = [
            ("write_batch_size", self.write_batch_size),
            ("item_yield_interval", self.item_yield_interval),
            ("transaction_yield_interval", self.transaction_yield_interval),
            ("image_yield_interval", self.image_yield_interval),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(crate::Error::InvalidInput(format!("{name} must be at least 1")));
        }
        if !(0..=9).contains(&self.compression_level) {
            return Err(crate::Error::InvalidInput(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        Ok(())
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Database path.
    pub database_path: Option<String>,
    /// Image store directory.
    pub image_dir: Option<String>,
    /// Export output directory.
    pub export_dir: Option<String>,
    /// Staging root.
    pub staging_root: Option<String>,
    /// Transfer section.
    pub transfer: Option<ConfigFileTransfer>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Transfer section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileTransfer {
    /// Records per CSV append.
    pub write_batch_size: Option<usize>,
    /// Item rows between yields.
    pub item_yield_interval: Option<usize>,
    /// Transaction rows between yields.
    pub transaction_yield_interval: Option<usize>,
    /// Images between yields.
    pub image_yield_interval: Option<usize>,
    /// Pause per yield in milliseconds.
    pub batch_pause_ms: Option<u64>,
    /// Deflate level.
    pub compression_level: Option<i64>,
    /// In-memory archive limit in megabytes.
    pub archive_memory_limit_mb: Option<u64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Filter directive, e.g. `info` or `stockpile=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Optional log file path.
    pub file: Option<String>,
}

impl Default for StockpileConfig {
    fn default() -> Self {
        Self::with_data_dir_defaults(PathBuf::from(".stockpile"))
    }
}

impl StockpileConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with every path placed under `data_dir`.
    #[must_use]
    pub fn with_data_dir_defaults(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            database_path: data_dir.join("inventory.db"),
            image_dir: data_dir.join("images"),
            export_dir: data_dir.join("exports"),
            staging_root: data_dir.join("staging"),
            data_dir,
            transfer: TransferSettings::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::failed("read_config_file", e))?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::failed("parse_config_file", e))?;

        let config = Self::from_config_file(file);
        config.transfer.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Looks for `config.toml` in the platform config directory
    /// (`~/.config/stockpile/` on Linux) and falls back to defaults rooted
    /// at the platform data directory.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(dirs) = directories::ProjectDirs::from("", "", "stockpile") else {
            return Self::default();
        };

        let config_path = dirs.config_dir().join("config.toml");
        if config_path.exists() {
            match Self::load_from_file(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(
                        path = %config_path.display(),
                        error = %e,
                        "Ignoring unreadable config file"
                    );
                },
            }
        }

        Self::with_data_dir_defaults(dirs.data_dir())
    }

    /// Converts a `ConfigFile` to `StockpileConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = file
            .data_dir
            .map_or_else(Self::default, Self::with_data_dir_defaults);

        if let Some(path) = file.database_path {
            config.database_path = PathBuf::from(path);
        }
        if let Some(path) = file.image_dir {
            config.image_dir = PathBuf::from(path);
        }
        if let Some(path) = file.export_dir {
            config.export_dir = PathBuf::from(path);
        }
        if let Some(path) = file.staging_root {
            config.staging_root = PathBuf::from(path);
        }
        if let Some(transfer) = file.transfer {
            let t = &mut config.transfer;
            if let Some(v) = transfer.write_batch_size {
                t.write_batch_size = v;
            }
            if let Some(v) = transfer.item_yield_interval {
                t.item_yield_interval = v;
            }
            if let Some(v) = transfer.transaction_yield_interval {
                t.transaction_yield_interval = v;
            }
            if let Some(v) = transfer.image_yield_interval {
                t.image_yield_interval = v;
            }
            if let Some(ms) = transfer.batch_pause_ms {
                t.batch_pause = Duration::from_millis(ms);
            }
            if let Some(v) = transfer.compression_level {
                t.compression_level = v;
            }
            if let Some(mb) = transfer.archive_memory_limit_mb {
                t.archive_memory_limit = mb.saturating_mul(1024 * 1024);
            }
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                config.logging.filter = level;
            }
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format);
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }

    /// Replaces the transfer settings.
    #[must_use]
    pub fn with_transfer(mut self, transfer: TransferSettings) -> Self {
        self.transfer = transfer;
        self
    }
}
