//! Single-pass analysis
//!
//! [`Analysis`] resolves every requested column up front, then reads the
//! source once and feeds each row to all requested accumulators. Results
//! match the per-statistic functions in [`crate::compute`] on the same data.
//!
//! A column that cannot be resolved fails the run before any row is read,
//! except for a group column requested with
//! [`Analysis::with_grouped_if_present`]: that only drops the grouped
//! statistics.

use engstat_io::{DataSchema, IoError, RowSource};
use engstat_stats::{
    CorrelationAccumulator, CorrelationMatrix, GroupedAccumulator, GroupedReport, HistogramConfig,
    HistogramResult, MomentAccumulator, MomentSummary, StreamingHistogram,
};
use serde::{Deserialize, Serialize};

use crate::compute::{
    column_names, compute_moments, drive, group_key, pick, resolve_column, row_values,
    with_expected_count, ColumnMoments, ColumnSelection, MomentReport,
};
use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;

/// Histogram of a named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnHistogram {
    pub column: String,
    pub result: HistogramResult,
}

/// Results of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Format of the source that was read
    pub source_format: String,
    /// Source column names
    pub columns: Vec<String>,
    pub rows_read: u64,
    /// Malformed rows skipped by every statistic
    pub rows_skipped: u64,
    pub moments: Option<MomentReport>,
    pub correlation: Option<CorrelationMatrix>,
    pub grouped: Option<GroupedReport>,
    /// Why optional grouped statistics were not computed
    #[serde(default)]
    pub grouped_error: Option<String>,
    /// Rows left out of the grouped statistics for lack of an integral key
    pub group_rows_skipped: u64,
    pub histograms: Vec<ColumnHistogram>,
}

impl AnalysisReport {
    /// Histogram for a column, looked up by base name
    pub fn histogram(&self, column: &str) -> Option<&HistogramResult> {
        let column = engstat_io::base_name(column);
        self.histograms
            .iter()
            .find(|h| engstat_io::base_name(&h.column) == column)
            .map(|h| &h.result)
    }
}

/// Builder for a single-pass analysis
#[derive(Debug, Clone)]
pub struct Analysis {
    config: AnalysisConfig,
    moments: bool,
    correlation: bool,
    grouped: Option<String>,
    grouped_optional: bool,
    histograms: Vec<String>,
    all_histograms: bool,
}

impl Analysis {
    /// Create an analysis that computes nothing yet
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            moments: false,
            correlation: false,
            grouped: None,
            grouped_optional: false,
            histograms: Vec::new(),
            all_histograms: false,
        }
    }

    /// Every statistic the configuration describes
    ///
    /// Grouped statistics are skipped when the source has no group column.
    /// Histograms cover the configured column, or every selected column
    /// when none is configured.
    pub fn everything(config: AnalysisConfig) -> Self {
        let group_column = config.group_column.clone();
        let histogram_column = config.histogram.column.clone();

        let analysis = Self::new(config)
            .with_moments()
            .with_correlation()
            .with_grouped_if_present(group_column);
        match histogram_column {
            Some(column) => analysis.with_histogram(column),
            None => analysis.with_all_histograms(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Per-column moments of every column
    pub fn with_moments(mut self) -> Self {
        self.moments = true;
        self
    }

    /// Correlation matrix of the selected columns
    pub fn with_correlation(mut self) -> Self {
        self.correlation = true;
        self
    }

    /// Statistics per value of `column`
    pub fn with_grouped(mut self, column: impl Into<String>) -> Self {
        self.grouped = Some(column.into());
        self.grouped_optional = false;
        self
    }

    /// Statistics per value of `column`, if the source has it
    pub fn with_grouped_if_present(mut self, column: impl Into<String>) -> Self {
        self.grouped = Some(column.into());
        self.grouped_optional = true;
        self
    }

    /// Histogram of `column`
    pub fn with_histogram(mut self, column: impl Into<String>) -> Self {
        self.histograms.push(column.into());
        self
    }

    /// Histogram of every selected column
    pub fn with_all_histograms(mut self) -> Self {
        self.all_histograms = true;
        self
    }

    /// Columns for correlation and all-column histograms
    pub fn selection(&self) -> ColumnSelection {
        ColumnSelection::excluding(self.config.exclude_columns.iter().cloned())
            .exclude(self.config.group_column.clone())
    }

    /// Run the analysis
    ///
    /// Fails before reading any row if the configuration is invalid or a
    /// requested column cannot be resolved.
    pub fn run<S: RowSource + ?Sized>(&self, source: &mut S) -> AnalysisResult<AnalysisReport> {
        self.config.validate()?;

        let schema = source.schema().clone();
        let width = schema.num_columns();
        let selected = self.selection().resolve(&schema);

        let mut grouped_error = None;
        let grouped_key = match self.grouped.as_deref() {
            Some(column) => match resolve_column(&schema, column) {
                Ok(index) => Some(index),
                Err(e) if self.grouped_optional => {
                    tracing::warn!("Skipping grouped statistics: {}", e);
                    grouped_error = Some(e.to_string());
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        let mut targets = Vec::new();
        for column in &self.histograms {
            let index = resolve_column(&schema, column)?;
            if !targets.contains(&index) {
                targets.push(index);
            }
        }
        if self.all_histograms {
            for &index in &selected {
                if !targets.contains(&index) {
                    targets.push(index);
                }
            }
        }

        let configs = self.histogram_configs(source, &schema, &targets)?;

        let mut moments = self
            .moments
            .then(|| vec![MomentAccumulator::new(); width]);
        let mut correlation = self
            .correlation
            .then(|| CorrelationAccumulator::new(column_names(&schema, &selected)));
        let mut grouped = grouped_key.map(|key_index| {
            let indices: Vec<usize> = (0..width).filter(|&i| i != key_index).collect();
            let accumulator = GroupedAccumulator::new(column_names(&schema, &indices));
            (key_index, indices, accumulator)
        });
        let mut histograms = Vec::with_capacity(targets.len());
        for (&index, config) in targets.iter().zip(configs) {
            histograms.push((index, StreamingHistogram::new(config)?));
        }

        tracing::info!(
            "Running analysis over {} columns ({} histograms)",
            width,
            histograms.len()
        );

        let mut group_rows_skipped = 0u64;
        let mut values = Vec::with_capacity(width);
        let mut picked = Vec::with_capacity(width);
        let pass = drive(source, |n, row| {
            row_values(row, width, n, &mut values)?;

            if let Some(accumulators) = moments.as_mut() {
                for (acc, &value) in accumulators.iter_mut().zip(&values) {
                    acc.add_value(value);
                }
            }

            if let Some(acc) = correlation.as_mut() {
                pick(&values, &selected, &mut picked);
                acc.add_row(&picked)?;
            }

            for (index, histogram) in histograms.iter_mut() {
                histogram.add_value(values[*index])?;
            }

            if let Some((key_index, indices, acc)) = grouped.as_mut() {
                match group_key(row, *key_index) {
                    Some(key) => {
                        pick(&values, indices, &mut picked);
                        acc.add_row(key, &picked)?;
                    }
                    None => {
                        let error = IoError::MalformedRow {
                            row: n,
                            message: "group value is not integral".to_string(),
                        };
                        tracing::warn!("Leaving row out of grouped statistics: {}", error);
                        group_rows_skipped += 1;
                    }
                }
            }

            Ok(())
        })?;

        tracing::info!(
            "Analysis finished: {} rows read, {} skipped",
            pass.rows_read,
            pass.rows_skipped
        );

        Ok(AnalysisReport {
            source_format: source.format_name().to_string(),
            columns: schema.column_names().iter().map(|s| s.to_string()).collect(),
            rows_read: pass.rows_read,
            rows_skipped: pass.rows_skipped,
            moments: moments.map(|accumulators| MomentReport {
                columns: schema
                    .columns
                    .iter()
                    .zip(accumulators)
                    .map(|(column, acc)| ColumnMoments {
                        name: column.name.clone(),
                        summary: acc.finalize(),
                    })
                    .collect(),
                rows_read: pass.rows_read,
                rows_skipped: pass.rows_skipped,
            }),
            correlation: correlation.map(CorrelationAccumulator::finalize),
            grouped: grouped.map(|(_, _, acc)| acc.finalize()),
            grouped_error,
            group_rows_skipped,
            histograms: targets
                .iter()
                .zip(histograms)
                .map(|(&index, (_, histogram))| ColumnHistogram {
                    column: schema.columns[index].name.clone(),
                    result: histogram.finalize(),
                })
                .collect(),
        })
    }

    /// Histogram configuration per target, pre-scanning the range if needed
    fn histogram_configs<S: RowSource + ?Sized>(
        &self,
        source: &mut S,
        schema: &DataSchema,
        targets: &[usize],
    ) -> AnalysisResult<Vec<HistogramConfig>> {
        let settings = &self.config.histogram;
        let base = with_expected_count(schema, settings.histogram_config());

        let prescan = settings.prescan_range && base.range().is_none() && !targets.is_empty();
        if !prescan {
            return Ok(vec![base; targets.len()]);
        }

        tracing::debug!("Pre-scanning {} histogram columns", targets.len());
        let report = compute_moments(source)?;
        Ok(targets
            .iter()
            .map(|&index| prescanned(&base, &report.columns[index].summary))
            .collect())
    }
}

/// Fix the bin range to the observed range
///
/// Left lazy when the column is empty or constant, or holds an infinity.
fn prescanned(base: &HistogramConfig, summary: &MomentSummary) -> HistogramConfig {
    let mut config = base.clone();
    config.expected_count = Some(summary.count);
    if let (Some(lo), Some(hi)) = (summary.min, summary.max) {
        if lo.is_finite() && hi.is_finite() && lo < hi {
            config.min_value = Some(lo);
            config.max_value = Some(hi);
        }
    }
    config
}
