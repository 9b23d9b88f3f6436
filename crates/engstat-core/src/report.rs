//! Text and JSON rendering of analysis results
//!
//! Each section prints its numbers through an explicit label table, so the
//! output layout does not depend on field order or naming in the result
//! types.

use std::fmt::Write;

use engstat_stats::{ColumnStats, CorrelationMatrix, GroupedReport, HistogramResult, MomentSummary};

use crate::compute::MomentReport;
use crate::dispatch::{AnalysisReport, ColumnHistogram};

type Field<T> = (&'static str, fn(&T) -> Option<f64>);

const MOMENT_FIELDS: &[Field<MomentSummary>] = &[
    ("Sum", |s: &MomentSummary| Some(s.sum)),
    ("Mean", |s: &MomentSummary| Some(s.mean)),
    ("Variance", |s: &MomentSummary| Some(s.variance)),
    ("StdDev", |s: &MomentSummary| Some(s.std_dev)),
    ("Skewness", |s: &MomentSummary| Some(s.skewness)),
    ("Kurtosis", |s: &MomentSummary| Some(s.kurtosis)),
    ("Min", |s: &MomentSummary| s.min),
    ("Max", |s: &MomentSummary| s.max),
];

const GROUP_FIELDS: &[Field<ColumnStats>] = &[
    ("Sum", |s: &ColumnStats| Some(s.sum)),
    ("Mean", |s: &ColumnStats| Some(s.mean)),
    ("Variance", |s: &ColumnStats| Some(s.variance)),
    ("StdDev", |s: &ColumnStats| Some(s.std_dev)),
    ("Min", |s: &ColumnStats| Some(s.min)),
    ("Max", |s: &ColumnStats| Some(s.max)),
    ("Median", |s: &ColumnStats| Some(s.median)),
    ("Q1", |s: &ColumnStats| Some(s.q1)),
    ("Q3", |s: &ColumnStats| Some(s.q3)),
    ("IQR", |s: &ColumnStats| Some(s.iqr)),
    ("Skewness", |s: &ColumnStats| Some(s.skewness)),
    ("Kurtosis", |s: &ColumnStats| Some(s.kurtosis)),
];

const HISTOGRAM_FIELDS: &[Field<HistogramResult>] = &[
    ("Count", |h: &HistogramResult| Some(h.summary.count as f64)),
    ("Mean", |h: &HistogramResult| Some(h.summary.mean)),
    ("StdDev", |h: &HistogramResult| Some(h.summary.std_dev)),
    ("Min", |h: &HistogramResult| h.summary.min),
    ("Max", |h: &HistogramResult| h.summary.max),
    ("Out of range", |h: &HistogramResult| Some(h.out_of_range as f64)),
];

/// Widest histogram bar, in characters
const BAR_WIDTH: u64 = 40;

/// Render every section present in the report as plain text
pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();

    if let Some(moments) = &report.moments {
        write_moments(&mut out, moments);
    }
    if let Some(matrix) = &report.correlation {
        write_correlation(&mut out, matrix);
    }
    if let Some(grouped) = &report.grouped {
        write_grouped(&mut out, grouped, report.group_rows_skipped);
    } else if let Some(reason) = &report.grouped_error {
        heading(&mut out, "Engine Condition Analysis");
        let _ = writeln!(out, "Skipped: {}\n", reason);
    }
    for histogram in &report.histograms {
        write_histogram(&mut out, histogram);
    }

    let _ = writeln!(
        out,
        "{} rows read, {} skipped ({})",
        report.rows_read, report.rows_skipped, report.source_format
    );
    out
}

/// Serialize the report as pretty-printed JSON
pub fn to_json(report: &AnalysisReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.len()));
    let _ = writeln!(out);
}

fn value(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{:.4}", v),
        None => "-".to_string(),
    }
}

fn write_moments(out: &mut String, report: &MomentReport) {
    heading(out, "Column Statistics");
    for column in &report.columns {
        let summary = &column.summary;
        if !summary.variance_defined || !summary.shape_defined {
            tracing::debug!(
                "Column {} has undefined moments (count {}), reported as 0",
                column.name,
                summary.count
            );
        }
        let _ = writeln!(out, "{}:", column.name);
        let _ = writeln!(out, "  Count: {}", summary.count);
        if summary.missing > 0 {
            let _ = writeln!(out, "  Missing: {}", summary.missing);
        }
        for (label, field) in MOMENT_FIELDS {
            let _ = writeln!(out, "  {}: {}", label, value(field(summary)));
        }
    }
    let _ = writeln!(out);
}

fn write_correlation(out: &mut String, matrix: &CorrelationMatrix) {
    heading(out, "Pearson Correlation");
    let _ = write!(out, "\t");
    for name in &matrix.columns {
        let _ = write!(out, "{}\t", name);
    }
    let _ = writeln!(out);
    for (name, row) in matrix.columns.iter().zip(matrix.rows()) {
        let _ = write!(out, "{}\t", name);
        for v in row {
            let _ = write!(out, "{:.4}\t", v);
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out);
}

fn write_grouped(out: &mut String, report: &GroupedReport, skipped: u64) {
    heading(out, "Engine Condition Analysis");
    for group in &report.groups {
        let _ = writeln!(out, "Condition {}:", group.key);
        let _ = writeln!(out, "  Count: {}", group.count);
        let _ = writeln!(out, "  Column Statistics:");
        for column in &group.columns {
            if !column.shape_defined {
                tracing::debug!(
                    "Condition {} column {} has undefined shape statistics",
                    group.key,
                    column.name
                );
            }
            let _ = writeln!(out, "    {}:", column.name);
            for (label, field) in GROUP_FIELDS {
                let _ = writeln!(out, "      {}: {}", label, value(field(column)));
            }
        }
        let _ = writeln!(out);
    }
    if skipped > 0 {
        let _ = writeln!(out, "{} rows without an integral condition value\n", skipped);
    }
}

fn write_histogram(out: &mut String, histogram: &ColumnHistogram) {
    let result = &histogram.result;
    heading(out, &format!("Histogram of {}", histogram.column));
    for (label, field) in HISTOGRAM_FIELDS {
        let _ = writeln!(out, "  {}: {}", label, value(field(result)));
    }
    let _ = writeln!(out);

    let peak = result.counts.iter().copied().max().unwrap_or(0).max(1);
    for bin in result.bins() {
        let bar = (bin.count * BAR_WIDTH).div_ceil(peak) as usize;
        let _ = writeln!(
            out,
            "  [{:>12.4}, {:>12.4}] {:>8} {}",
            bin.lower,
            bin.upper,
            bin.count,
            "#".repeat(bar)
        );
    }
    let _ = writeln!(out);
}
