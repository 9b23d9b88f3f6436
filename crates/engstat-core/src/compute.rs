//! Per-statistic passes
//!
//! Each `compute_*` function rewinds the source and makes its own pass over
//! it. Use [`crate::Analysis`] to feed several statistics from one pass.
//!
//! Rows the source reports as malformed are skipped with a warning and
//! counted; every other source error aborts the computation.

use engstat_io::{base_name, DataSchema, IoError, Row, RowSource};
use engstat_stats::{
    CorrelationAccumulator, CorrelationMatrix, GroupKey, GroupedAccumulator, GroupedReport,
    HistogramConfig, HistogramResult, MomentAccumulator, MomentSummary, StreamingHistogram,
};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Columns that take part in a multi-column statistic
///
/// Every column is selected unless its base name is excluded. Excluded
/// names that match nothing are ignored, so a selection can be shared
/// between sources with slightly different columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSelection {
    pub exclude: Vec<String>,
}

impl ColumnSelection {
    /// Select every column
    pub fn all() -> Self {
        Self::default()
    }

    /// Select every column except `names`
    pub fn excluding<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Also exclude `name`
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude.push(name.into());
        self
    }

    /// Whether a column is excluded
    pub fn is_excluded(&self, name: &str) -> bool {
        let name = base_name(name);
        self.exclude.iter().any(|e| base_name(e) == name)
    }

    /// Indices of the selected columns, in schema order
    pub fn resolve(&self, schema: &DataSchema) -> Vec<usize> {
        schema
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !self.is_excluded(&c.name))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Moments of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMoments {
    pub name: String,
    pub summary: MomentSummary,
}

/// Per-column moments of a source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentReport {
    pub columns: Vec<ColumnMoments>,
    /// Rows consumed
    pub rows_read: u64,
    /// Malformed rows skipped
    pub rows_skipped: u64,
}

impl MomentReport {
    /// Summary for a column, looked up by base name
    pub fn column(&self, name: &str) -> Option<&MomentSummary> {
        let name = base_name(name);
        self.columns
            .iter()
            .find(|c| base_name(&c.name) == name)
            .map(|c| &c.summary)
    }
}

/// Row counts of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PassStats {
    pub rows_read: u64,
    pub rows_skipped: u64,
}

/// Rewind `source` and hand every row to `visit`
///
/// `visit` receives the 1-based row number. A recoverable error, from the
/// source or from `visit`, skips the row.
pub(crate) fn drive<S, F>(source: &mut S, mut visit: F) -> AnalysisResult<PassStats>
where
    S: RowSource + ?Sized,
    F: FnMut(u64, &Row) -> AnalysisResult<()>,
{
    source.rewind()?;

    let mut pass = PassStats::default();
    let mut row_number = 0u64;
    while let Some(next) = source.next_row() {
        row_number += 1;
        let outcome = match next {
            Ok(row) => visit(row_number, &row),
            Err(e) => Err(e.into()),
        };
        match outcome {
            Ok(()) => pass.rows_read += 1,
            Err(e) if e.is_recoverable() => {
                tracing::warn!("Skipping row {}: {}", row_number, e);
                pass.rows_skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::debug!(
        "Finished {} pass: {} rows read, {} skipped",
        source.format_name(),
        pass.rows_read,
        pass.rows_skipped
    );
    Ok(pass)
}

/// Resolve a column name, mapping failures to a schema error
pub(crate) fn resolve_column(schema: &DataSchema, name: &str) -> AnalysisResult<usize> {
    schema
        .resolve(name)
        .map_err(|e| AnalysisError::schema(name, e))
}

/// Copy every value of `row` into `out`, checking the row width
pub(crate) fn row_values(
    row: &Row,
    width: usize,
    row_number: u64,
    out: &mut Vec<f64>,
) -> AnalysisResult<()> {
    if row.len() != width {
        return Err(IoError::MalformedRow {
            row: row_number,
            message: format!("expected {} values, got {}", width, row.len()),
        }
        .into());
    }
    out.clear();
    out.extend(row.values.iter().map(|v| v.as_f64()));
    Ok(())
}

/// Copy `values[i]` for each index into `out`
pub(crate) fn pick(values: &[f64], indices: &[usize], out: &mut Vec<f64>) {
    out.clear();
    out.extend(indices.iter().map(|&i| values[i]));
}

/// Group key of a row, `None` when the value is not integral
pub(crate) fn group_key(row: &Row, key_index: usize) -> Option<GroupKey> {
    row.get(key_index).and_then(|v| v.as_key())
}

/// Column names at `indices`
pub(crate) fn column_names(schema: &DataSchema, indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .map(|&i| schema.columns[i].name.clone())
        .collect()
}

/// Fill in the sample size hint from the schema when it is missing
pub(crate) fn with_expected_count(schema: &DataSchema, mut config: HistogramConfig) -> HistogramConfig {
    if config.expected_count.is_none() {
        config.expected_count = schema.num_records.map(|n| n as u64);
    }
    config
}

/// Mean, variance, skewness and kurtosis of every column
pub fn compute_moments<S: RowSource + ?Sized>(source: &mut S) -> AnalysisResult<MomentReport> {
    let schema = source.schema().clone();
    let width = schema.num_columns();

    let mut accumulators = vec![MomentAccumulator::new(); width];
    let mut values = Vec::with_capacity(width);
    let pass = drive(source, |n, row| {
        row_values(row, width, n, &mut values)?;
        for (acc, &value) in accumulators.iter_mut().zip(&values) {
            acc.add_value(value);
        }
        Ok(())
    })?;

    tracing::info!("Computed moments for {} columns", width);

    Ok(MomentReport {
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
    })
}

/// Pearson correlation matrix of the selected columns
pub fn compute_correlation<S: RowSource + ?Sized>(
    source: &mut S,
    selection: &ColumnSelection,
) -> AnalysisResult<CorrelationMatrix> {
    let schema = source.schema().clone();
    let width = schema.num_columns();
    let indices = selection.resolve(&schema);

    let mut accumulator = CorrelationAccumulator::new(column_names(&schema, &indices));
    let mut values = Vec::with_capacity(width);
    let mut picked = Vec::with_capacity(indices.len());
    drive(source, |n, row| {
        row_values(row, width, n, &mut values)?;
        pick(&values, &indices, &mut picked);
        accumulator.add_row(&picked)?;
        Ok(())
    })?;

    tracing::info!(
        "Computed {}x{} correlation matrix",
        accumulator.width(),
        accumulator.width()
    );
    Ok(accumulator.finalize())
}

/// Statistics of every other column, per value of `group_column`
///
/// Rows whose group value is not integral are skipped.
pub fn compute_grouped<S: RowSource + ?Sized>(
    source: &mut S,
    group_column: &str,
) -> AnalysisResult<GroupedReport> {
    let schema = source.schema().clone();
    let width = schema.num_columns();
    let key_index = resolve_column(&schema, group_column)?;
    let indices: Vec<usize> = (0..width).filter(|&i| i != key_index).collect();

    let mut accumulator = GroupedAccumulator::new(column_names(&schema, &indices));
    let mut values = Vec::with_capacity(width);
    let mut picked = Vec::with_capacity(indices.len());
    drive(source, |n, row| {
        row_values(row, width, n, &mut values)?;
        let key = group_key(row, key_index).ok_or_else(|| IoError::MalformedRow {
            row: n,
            message: format!("group value in '{}' is not integral", group_column),
        })?;
        pick(&values, &indices, &mut picked);
        accumulator.add_row(key, &picked)?;
        Ok(())
    })?;

    tracing::info!("Computed statistics for {} groups", accumulator.keys().len());
    Ok(accumulator.finalize())
}

/// Histogram of one column
///
/// The schema's record count is used as the sample size hint unless the
/// configuration carries one.
pub fn compute_histogram<S: RowSource + ?Sized>(
    source: &mut S,
    target_column: &str,
    config: HistogramConfig,
) -> AnalysisResult<HistogramResult> {
    let schema = source.schema().clone();
    let width = schema.num_columns();
    let index = resolve_column(&schema, target_column)?;

    let mut histogram = StreamingHistogram::new(with_expected_count(&schema, config))?;
    let mut values = Vec::with_capacity(width);
    drive(source, |n, row| {
        row_values(row, width, n, &mut values)?;
        histogram.add_value(values[index])?;
        Ok(())
    })?;

    let result = histogram.finalize();
    tracing::info!(
        "Computed {}-bin histogram of {} ({} out of range)",
        result.num_bins(),
        target_column,
        result.out_of_range
    );
    Ok(result)
}
