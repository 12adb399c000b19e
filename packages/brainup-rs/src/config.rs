use crate::file_readers::{DecodeOptions, DEFAULT_TABULAR_SAMPLE_RATE};
use crate::montage::topography::{DEFAULT_RESOLUTION, MAX_RESOLUTION, MIN_RESOLUTION};
use crate::montage::TopographyOptions;
use crate::signal_processing::DEFAULT_FILTER_ORDER;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const LEDGER_FILE_NAME: &str = "temp_files.json";

const DEFAULT_UPLOAD_TTL_SECS: u64 = 5 * 60;
const DEFAULT_ARTIFACT_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60 * 60;

/// Temporary storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root for session directories and shared files
    pub data_dir: PathBuf,
    /// Ledger location; `<data_dir>/temp_files.json` when unset
    pub ledger_path: Option<PathBuf>,
    /// Lifetime of raw uploads in seconds
    pub upload_ttl_secs: u64,
    /// Lifetime of derived artifacts (exports, images) in seconds
    pub artifact_ttl_secs: u64,
    /// Pause between sweeper passes in seconds
    pub sweep_interval_secs: u64,
    /// Extra wait after a data file is synced, in milliseconds
    pub settle_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ledger_path: None,
            upload_ttl_secs: DEFAULT_UPLOAD_TTL_SECS,
            artifact_ttl_secs: DEFAULT_ARTIFACT_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            settle_delay_ms: 0,
        }
    }
}

impl StoreConfig {
    /// Defaults rooted at `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(LEDGER_FILE_NAME))
    }

    pub fn upload_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_ttl_secs)
    }

    pub fn artifact_ttl(&self) -> Duration {
        Duration::from_secs(self.artifact_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Analysis defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sample rate assumed for CSV/Excel uploads
    pub tabular_sample_rate: f64,
    /// Topography panel edge in pixels
    pub topomap_resolution: u32,
    /// Butterworth order for band filters
    pub filter_order: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tabular_sample_rate: DEFAULT_TABULAR_SAMPLE_RATE,
            topomap_resolution: DEFAULT_RESOLUTION,
            filter_order: DEFAULT_FILTER_ORDER,
        }
    }
}

impl AnalysisConfig {
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            tabular_sample_rate: self.tabular_sample_rate,
        }
    }

    pub fn topography_options(&self) -> TopographyOptions {
        TopographyOptions {
            resolution: self.topomap_resolution,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainupConfig {
    pub store: StoreConfig,
    pub analysis: AnalysisConfig,
}

/// `dirs::data_dir()/brainup`, or `./brainup-data` where no data dir exists.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("brainup"))
        .unwrap_or_else(|| PathBuf::from("brainup-data"))
}

impl BrainupConfig {
    /// Load configuration from `BRAINUP_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load a JSON configuration file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| ConfigError::InvalidValue(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            store: StoreConfig {
                data_dir: lookup("BRAINUP_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.store.data_dir),
                ledger_path: lookup("BRAINUP_LEDGER_PATH").map(PathBuf::from),
                upload_ttl_secs: parse_var(&lookup, "BRAINUP_UPLOAD_TTL_SECS", defaults.store.upload_ttl_secs)?,
                artifact_ttl_secs: parse_var(&lookup, "BRAINUP_ARTIFACT_TTL_SECS", defaults.store.artifact_ttl_secs)?,
                sweep_interval_secs: parse_var(
                    &lookup,
                    "BRAINUP_SWEEP_INTERVAL_SECS",
                    defaults.store.sweep_interval_secs,
                )?,
                settle_delay_ms: parse_var(&lookup, "BRAINUP_SETTLE_DELAY_MS", defaults.store.settle_delay_ms)?,
            },
            analysis: AnalysisConfig {
                tabular_sample_rate: parse_var(
                    &lookup,
                    "BRAINUP_TABULAR_SAMPLE_RATE",
                    defaults.analysis.tabular_sample_rate,
                )?,
                topomap_resolution: parse_var(
                    &lookup,
                    "BRAINUP_TOPOMAP_RESOLUTION",
                    defaults.analysis.topomap_resolution,
                )?,
                filter_order: parse_var(&lookup, "BRAINUP_FILTER_ORDER", defaults.analysis.filter_order)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.analysis.tabular_sample_rate.is_finite() && self.analysis.tabular_sample_rate > 0.0) {
            return Err(ConfigError::InvalidValue(format!(
                "tabular sample rate must be positive, got {}",
                self.analysis.tabular_sample_rate
            )));
        }
        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&self.analysis.topomap_resolution) {
            return Err(ConfigError::InvalidValue(format!(
                "topomap resolution must be {}-{} px, got {}",
                MIN_RESOLUTION, MAX_RESOLUTION, self.analysis.topomap_resolution
            )));
        }
        if self.analysis.filter_order == 0 {
            return Err(ConfigError::InvalidValue("filter order must be at least 1".to_string()));
        }
        if self.store.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("sweep interval must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}='{}'", key, raw))),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    #[error("Cannot read configuration file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
}
