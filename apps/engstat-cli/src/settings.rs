//! Effective configuration
//!
//! Precedence: command-line flags, then the configuration file, then the
//! built-in defaults.

use std::path::{Path, PathBuf};

use engstat_core::{AnalysisConfig, ConfigError};
use engstat_stats::{BinMethod, OutOfRangePolicy};

/// Default configuration file, `<config dir>/engstat/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("engstat").join("config.toml"))
}

/// Load the configuration file
///
/// An explicit path must exist. Without one, the default location is used
/// when a file is there, and the built-in defaults otherwise.
pub fn load(explicit: Option<&Path>) -> Result<(AnalysisConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = explicit {
        return Ok((AnalysisConfig::load(path)?, Some(path.to_path_buf())));
    }

    match default_config_path() {
        Some(path) if path.is_file() => Ok((AnalysisConfig::load(&path)?, Some(path))),
        _ => Ok((AnalysisConfig::default(), None)),
    }
}

/// Settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub delimiter: Option<char>,
    pub skip_columns: Vec<String>,
    pub exclude_columns: Vec<String>,
    pub group_column: Option<String>,
    pub histogram_column: Option<String>,
    pub num_bins: Option<usize>,
    pub method: Option<BinMethod>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub bin_width: Option<f64>,
    pub reject_out_of_range: bool,
    pub no_prescan: bool,
}

impl Overrides {
    /// Apply on top of `config`
    pub fn apply(self, mut config: AnalysisConfig) -> AnalysisConfig {
        if let Some(delimiter) = self.delimiter {
            config.source.delimiter = delimiter;
        }
        config.source.skip_columns.extend(self.skip_columns);
        config.exclude_columns.extend(self.exclude_columns);
        if let Some(column) = self.group_column {
            config.group_column = column;
        }

        let histogram = &mut config.histogram;
        if let Some(column) = self.histogram_column {
            histogram.column = Some(column);
        }
        if let Some(num_bins) = self.num_bins {
            histogram.num_bins = num_bins;
        }
        if let Some(method) = self.method {
            histogram.method = method;
        }
        if self.min_value.is_some() || self.max_value.is_some() {
            histogram.min_value = self.min_value;
            histogram.max_value = self.max_value;
        }
        if let Some(width) = self.bin_width {
            histogram.bin_width = Some(width);
            if self.method.is_none() {
                histogram.method = BinMethod::FixedWidth;
            }
        }
        if self.reject_out_of_range {
            histogram.out_of_range = OutOfRangePolicy::Reject;
        }
        if self.no_prescan {
            histogram.prescan_range = false;
        }
        config
    }
}
