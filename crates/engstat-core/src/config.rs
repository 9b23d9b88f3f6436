//! Configuration for engstat-core
//!
//! Everything an analysis needs to know besides the data itself: how to
//! read the source, which column carries the condition code, which columns
//! stay out of the correlation matrix, and how histograms are binned.

use std::path::Path;

use engstat_io::CsvOptions;
use engstat_stats::{BinMethod, HistogramConfig, OutOfRangePolicy, DEFAULT_NUM_BINS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column holding the engine condition code in the engine telemetry data
pub const DEFAULT_GROUP_COLUMN: &str = "engine_condition";

/// Analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Discrete column used for grouped statistics
    pub group_column: String,
    /// Columns left out of the correlation matrix and the all-column histograms
    pub exclude_columns: Vec<String>,
    /// How to read the input
    pub source: SourceConfig,
    /// Histogram binning
    pub histogram: HistogramSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            group_column: DEFAULT_GROUP_COLUMN.to_string(),
            exclude_columns: Vec::new(),
            source: SourceConfig::default(),
            histogram: HistogramSettings::default(),
        }
    }
}

/// Delimited-text source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub delimiter: char,
    pub has_header: bool,
    /// snake_case the header names
    pub normalize_headers: bool,
    /// Columns dropped at read time, such as a timestamp
    pub skip_columns: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
            normalize_headers: true,
            skip_columns: Vec::new(),
        }
    }
}

impl SourceConfig {
    /// Reader options for these settings
    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: u8::try_from(self.delimiter).unwrap_or(b','),
            has_header: self.has_header,
            normalize_headers: self.normalize_headers,
            skip_columns: self.skip_columns.clone(),
        }
    }
}

/// Histogram settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramSettings {
    /// Target column; every numeric column when unset
    pub column: Option<String>,
    pub num_bins: usize,
    pub method: BinMethod,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub bin_width: Option<f64>,
    pub out_of_range: OutOfRangePolicy,
    /// Measure the target range with an extra pass when no range is set
    pub prescan_range: bool,
}

impl Default for HistogramSettings {
    fn default() -> Self {
        Self {
            column: None,
            num_bins: DEFAULT_NUM_BINS,
            method: BinMethod::Fixed,
            min_value: None,
            max_value: None,
            bin_width: None,
            out_of_range: OutOfRangePolicy::Exclude,
            prescan_range: true,
        }
    }
}

impl HistogramSettings {
    /// Accumulator configuration for these settings
    pub fn histogram_config(&self) -> HistogramConfig {
        HistogramConfig {
            num_bins: self.num_bins,
            method: self.method,
            min_value: self.min_value,
            max_value: self.max_value,
            bin_width: self.bin_width,
            expected_count: None,
            out_of_range: self.out_of_range,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a configuration file, TOML or JSON by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let config = match extension.as_str() {
            "toml" => Self::from_toml(&contents)?,
            "json" => Self::from_json(&contents)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.source.delimiter.is_ascii() {
            return Err(ConfigError::InvalidValue(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.source.delimiter
            )));
        }

        if self.group_column.trim().is_empty() {
            return Err(ConfigError::MissingField("group_column".to_string()));
        }

        let histogram = &self.histogram;
        if histogram.num_bins == 0 {
            return Err(ConfigError::OutOfRange(
                "histogram.num_bins must be positive".to_string(),
            ));
        }

        match (histogram.min_value, histogram.max_value) {
            (Some(lo), Some(hi)) if !(lo < hi) => {
                return Err(ConfigError::OutOfRange(format!(
                    "histogram.min_value ({}) must be below histogram.max_value ({})",
                    lo, hi
                )));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::MissingField(
                    "histogram.min_value and histogram.max_value must be set together"
                        .to_string(),
                ));
            }
            _ => {}
        }

        if let Some(width) = histogram.bin_width {
            if !(width > 0.0) {
                return Err(ConfigError::OutOfRange(
                    "histogram.bin_width must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Value is not acceptable
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Required field is missing
    #[error("Missing field: {0}")]
    MissingField(String),

    /// The file could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The file could not be read
    #[error("Cannot read configuration: {0}")]
    Io(String),

    #[error("Unsupported configuration format: '{0}' (expected toml or json)")]
    UnsupportedFormat(String),
}
