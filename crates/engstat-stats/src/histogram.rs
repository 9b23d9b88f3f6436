//! Streaming histogram with lazily computed bin edges
//!
//! Bin edges are fixed once, when the first value arrives: from the
//! configured `[min_value, max_value]` if both are set, otherwise from the
//! range observed at that moment. They are never rebuilt. Values that later
//! fall outside the edges are handled by [`OutOfRangePolicy`]; they always
//! count towards the summary.
//!
//! Bins are half-open `[lo, hi)` except the last, which is closed.
//! Infinite values never fix the edges and always land out of range.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StatsError, StatsResult};
use crate::moments::MomentAccumulator;

/// Default number of bins
pub const DEFAULT_NUM_BINS: usize = 30;

/// Most bins a histogram may allocate
pub const MAX_BINS: usize = 1 << 20;

/// How the number of bins is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinMethod {
    /// Use `num_bins` as given
    #[default]
    #[serde(alias = "auto")]
    Fixed,
    /// `ceil(log2(n)) + 1`
    Sturges,
    /// `ceil(sqrt(n))`
    Sqrt,
    /// Width `2 * IQR / n^(1/3)`, IQR estimated as range / 4
    #[serde(alias = "fd")]
    FreedmanDiaconis,
    /// Width taken from `bin_width`
    FixedWidth,
}

impl BinMethod {
    pub fn name(&self) -> &'static str {
        match self {
            BinMethod::Fixed => "fixed",
            BinMethod::Sturges => "sturges",
            BinMethod::Sqrt => "sqrt",
            BinMethod::FreedmanDiaconis => "fd",
            BinMethod::FixedWidth => "fixed_width",
        }
    }
}

impl fmt::Display for BinMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BinMethod {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "auto" | "fixed" | "count" => Ok(BinMethod::Fixed),
            "sturges" => Ok(BinMethod::Sturges),
            "sqrt" => Ok(BinMethod::Sqrt),
            "fd" | "freedman_diaconis" => Ok(BinMethod::FreedmanDiaconis),
            "fixed_width" | "width" => Ok(BinMethod::FixedWidth),
            other => Err(StatsError::InvalidConfig(format!(
                "unknown bin method '{}'",
                other
            ))),
        }
    }
}

/// What to do with values outside the bin range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    /// Leave the value out of the bins and count it in `out_of_range`
    #[default]
    Exclude,
    /// Return [`StatsError::OutOfRange`] from `add_value`
    Reject,
}

/// Histogram configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Bin count for `Fixed`, and the fallback for the other methods
    pub num_bins: usize,
    pub method: BinMethod,
    /// Lower edge; only used when `max_value` is also set
    pub min_value: Option<f64>,
    /// Upper edge; only used when `min_value` is also set
    pub max_value: Option<f64>,
    /// Bin width for `FixedWidth`
    pub bin_width: Option<f64>,
    /// Sample size hint for the count-based methods
    ///
    /// Without it those methods only see the values observed before the
    /// bins are built, which is usually one.
    pub expected_count: Option<u64>,
    pub out_of_range: OutOfRangePolicy,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            num_bins: DEFAULT_NUM_BINS,
            method: BinMethod::Fixed,
            min_value: None,
            max_value: None,
            bin_width: None,
            expected_count: None,
            out_of_range: OutOfRangePolicy::Exclude,
        }
    }
}

impl HistogramConfig {
    /// Fixed number of bins over a fixed range
    pub fn with_range(num_bins: usize, min_value: f64, max_value: f64) -> Self {
        Self {
            num_bins,
            min_value: Some(min_value),
            max_value: Some(max_value),
            ..Self::default()
        }
    }

    /// Configured range, if both ends are set
    pub fn range(&self) -> Option<(f64, f64)> {
        Some((self.min_value?, self.max_value?))
    }

    pub fn validate(&self) -> StatsResult<()> {
        if self.num_bins == 0 || self.num_bins > MAX_BINS {
            return Err(StatsError::InvalidConfig(format!(
                "num_bins must be between 1 and {}, got {}",
                MAX_BINS, self.num_bins
            )));
        }

        match (self.min_value, self.max_value) {
            (Some(lo), Some(hi)) if !(lo.is_finite() && hi.is_finite() && lo < hi) => {
                return Err(StatsError::InvalidConfig(format!(
                    "min_value ({}) must be below max_value ({})",
                    lo, hi
                )));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(StatsError::InvalidConfig(
                    "min_value and max_value must be set together".to_string(),
                ));
            }
            _ => {}
        }

        if let Some(width) = self.bin_width {
            if !(width.is_finite() && width > 0.0) {
                return Err(StatsError::InvalidConfig(format!(
                    "bin_width must be positive, got {}",
                    width
                )));
            }
        }

        if let Some((lo, hi)) = self.range() {
            self.bin_count(self.expected_count.unwrap_or(1), lo, hi)?;
        }

        Ok(())
    }

    /// Number of bins for a sample of `count` values spanning `[lo, hi]`
    fn bin_count(&self, count: u64, lo: f64, hi: f64) -> StatsResult<usize> {
        let n = count.max(1) as f64;
        let range = span(lo, hi);
        let bins = match self.method {
            BinMethod::Fixed => self.num_bins,
            BinMethod::Sturges => n.log2().ceil() as usize + 1,
            BinMethod::Sqrt => n.sqrt().ceil() as usize,
            BinMethod::FreedmanDiaconis => {
                let iqr = range / 4.0;
                let width = 2.0 * iqr / n.cbrt();
                if iqr > 0.0 && width > 0.0 {
                    (range / width).ceil() as usize
                } else {
                    self.num_bins
                }
            }
            BinMethod::FixedWidth => match self.bin_width {
                Some(width) => {
                    let bins = (range / width).ceil();
                    if !(bins <= MAX_BINS as f64) {
                        return Err(StatsError::InvalidConfig(format!(
                            "bin_width {} over [{}, {}] needs more than {} bins",
                            width, lo, hi, MAX_BINS
                        )));
                    }
                    bins as usize
                }
                None => self.num_bins,
            },
        };
        Ok(bins.clamp(1, MAX_BINS))
    }
}

/// `hi - lo` without overflowing to infinity
fn span(lo: f64, hi: f64) -> f64 {
    let range = hi - lo;
    if range.is_finite() {
        range
    } else {
        f64::MAX
    }
}

/// Smallest `f64` above a finite `x`
fn next_up(x: f64) -> f64 {
    if x == 0.0 {
        f64::from_bits(1)
    } else if x > 0.0 {
        f64::from_bits(x.to_bits() + 1)
    } else {
        f64::from_bits(x.to_bits() - 1)
    }
}

/// Streaming histogram accumulator
#[derive(Debug, Clone)]
pub struct StreamingHistogram {
    config: HistogramConfig,
    summary: MomentAccumulator,
    bin_edges: Vec<f64>,
    counts: Vec<u64>,
    out_of_range: u64,
}

impl StreamingHistogram {
    /// Create an empty histogram
    pub fn new(config: HistogramConfig) -> StatsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            summary: MomentAccumulator::new(),
            bin_edges: Vec::new(),
            counts: Vec::new(),
            out_of_range: 0,
        })
    }

    pub fn config(&self) -> &HistogramConfig {
        &self.config
    }

    /// Edges built so far (empty until the first value)
    pub fn bin_edges(&self) -> &[f64] {
        &self.bin_edges
    }

    /// Add a value
    ///
    /// NaN is ignored. Under `OutOfRangePolicy::Reject` an out-of-range
    /// value is still added to the summary before the error is returned.
    pub fn add_value(&mut self, x: f64) -> StatsResult<()> {
        self.summary.add_value(x);
        if x.is_nan() {
            return Ok(());
        }

        if self.bin_edges.is_empty() && x.is_finite() {
            self.initialize_bins(x)?;
        }

        match self.find_bin(x) {
            Some(bin) => {
                self.counts[bin] += 1;
                Ok(())
            }
            None => {
                self.out_of_range += 1;
                match self.config.out_of_range {
                    OutOfRangePolicy::Exclude => Ok(()),
                    OutOfRangePolicy::Reject => Err(StatsError::OutOfRange {
                        value: x,
                        low: self.bin_edges.first().copied().unwrap_or(f64::NAN),
                        high: self.bin_edges.last().copied().unwrap_or(f64::NAN),
                    }),
                }
            }
        }
    }

    /// Add a batch of values, stopping at the first error
    pub fn add_batch(&mut self, values: &[f64]) -> StatsResult<()> {
        for &x in values {
            self.add_value(x)?;
        }
        Ok(())
    }

    /// Build the edges once `first`, a finite value, has arrived
    fn initialize_bins(&mut self, first: f64) -> StatsResult<()> {
        let (lo, hi) = match self.config.range() {
            Some(range) => range,
            None => match (self.summary.min(), self.summary.max()) {
                (Some(lo), Some(hi)) if lo.is_finite() && hi.is_finite() => (lo, hi),
                _ => (first, first),
            },
        };

        let count = self.config.expected_count.unwrap_or(self.summary.count());
        let num_bins = self.config.bin_count(count, lo, hi)?;

        let fixed_width = match (self.config.method, self.config.bin_width) {
            (BinMethod::FixedWidth, Some(width)) => Some(width),
            _ => None,
        };
        let mut width = fixed_width.unwrap_or(span(lo, hi) / num_bins as f64);
        let degenerate = !(width > 0.0 && width.is_finite());
        // Degenerate range: unit-width bins starting at lo
        if degenerate {
            width = 1.0;
        }

        let mut edges: Vec<f64> = (0..=num_bins).map(|i| lo + i as f64 * width).collect();
        if fixed_width.is_none() && !degenerate {
            // Pin the last edge so rounding cannot drop the maximum
            edges[num_bins] = hi;
        }
        // Widths below the spacing of f64 near lo collapse neighbouring
        // edges; step those up to the next representable value
        for i in 1..edges.len() {
            if !(edges[i] > edges[i - 1]) {
                edges[i] = next_up(edges[i - 1]);
            }
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(StatsError::InvalidConfig(format!(
                "bin edges starting at {} overflow",
                lo
            )));
        }

        self.bin_edges = edges;
        self.counts = vec![0; num_bins];
        Ok(())
    }

    /// Binary search for the bin holding `x`
    fn find_bin(&self, x: f64) -> Option<usize> {
        let first = *self.bin_edges.first()?;
        let last = *self.bin_edges.last()?;
        if x < first || x > last {
            return None;
        }
        if x == last {
            return Some(self.counts.len() - 1);
        }
        let idx = self.bin_edges.partition_point(|&edge| edge <= x);
        Some(idx - 1)
    }

    /// Finish accumulation
    pub fn finalize(self) -> HistogramResult {
        let summary = self.summary.summary();
        HistogramResult {
            bin_edges: self.bin_edges,
            counts: self.counts,
            out_of_range: self.out_of_range,
            summary: HistogramSummary {
                count: summary.count,
                sum: summary.sum,
                min: summary.min,
                max: summary.max,
                mean: summary.mean,
                variance: summary.variance,
                std_dev: summary.std_dev,
                skewness: None,
                kurtosis: None,
            },
            config: self.config,
        }
    }
}

/// Summary statistics carried alongside the bins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// All non-NaN values, binned or not
    pub count: u64,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    /// Always `None`: unsupported in streaming mode
    pub skewness: Option<f64>,
    /// Always `None`: unsupported in streaming mode
    pub kurtosis: Option<f64>,
}

/// One histogram bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

/// Finalized histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramResult {
    pub config: HistogramConfig,
    /// `num_bins + 1` strictly increasing edges (empty for empty input)
    pub bin_edges: Vec<f64>,
    pub counts: Vec<u64>,
    /// Values that fell outside the edges
    pub out_of_range: u64,
    pub summary: HistogramSummary,
}

impl HistogramResult {
    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    /// Number of values that landed in a bin
    pub fn binned(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Bins with their bounds
    pub fn bins(&self) -> Vec<Bin> {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| Bin {
                lower: self.bin_edges[i],
                upper: self.bin_edges[i + 1],
                count,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_range_counts() {
        let mut hist = StreamingHistogram::new(HistogramConfig::with_range(3, 0.0, 9.0)).unwrap();
        hist.add_batch(&[0.0, 1.0, 4.0, 4.0, 9.0]).unwrap();
        let result = hist.finalize();

        assert_eq!(result.bin_edges, vec![0.0, 3.0, 6.0, 9.0]);
        assert_eq!(result.counts, vec![2, 2, 1]);
        assert_eq!(result.out_of_range, 0);
        assert_eq!(result.binned(), result.summary.count);
    }

    #[test]
    fn test_degenerate_first_value_range() {
        let config = HistogramConfig {
            num_bins: 4,
            ..HistogramConfig::default()
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        hist.add_value(10.0).unwrap();
        assert_eq!(hist.bin_edges(), &[10.0, 11.0, 12.0, 13.0, 14.0]);
    }

    #[test]
    fn test_large_first_value_keeps_edges_increasing() {
        let config = HistogramConfig {
            num_bins: 4,
            ..HistogramConfig::default()
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        hist.add_batch(&[1e17, 1e17]).unwrap();
        let result = hist.finalize();

        assert_eq!(result.bin_edges.len(), 5);
        assert!(result.bin_edges.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(result.bin_edges[0], 1e17);
        assert_eq!(result.counts[0], 2);
        assert_eq!(result.out_of_range, 0);
    }

    #[test]
    fn test_narrow_range_at_large_magnitude() {
        let mut hist =
            StreamingHistogram::new(HistogramConfig::with_range(30, 1e17, 1e17 + 64.0)).unwrap();
        hist.add_batch(&[1e17, 1e17 + 32.0, 1e17 + 64.0]).unwrap();
        let result = hist.finalize();

        assert!(result.bin_edges.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(result.binned(), 3);
    }

    #[test]
    fn test_infinity_does_not_fix_edges() {
        let config = HistogramConfig {
            num_bins: 3,
            ..HistogramConfig::default()
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        hist.add_value(f64::INFINITY).unwrap();
        assert!(hist.bin_edges().is_empty());
        hist.add_batch(&[1.0, 2.0]).unwrap();
        let result = hist.finalize();

        assert_eq!(result.bin_edges, vec![1.0, 2.0, 3.0, 4.0]);
        assert!(result.bin_edges.iter().all(|e| e.is_finite()));
        assert_eq!(result.counts, vec![1, 1, 0]);
        assert_eq!(result.out_of_range, 1);
        assert_eq!(result.binned() + result.out_of_range, result.summary.count);
    }

    #[test]
    fn test_reject_infinity_before_edges() {
        let config = HistogramConfig {
            out_of_range: OutOfRangePolicy::Reject,
            ..HistogramConfig::default()
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        let err = hist.add_value(f64::NEG_INFINITY).unwrap_err();
        assert!(matches!(err, StatsError::OutOfRange { value, .. } if value == f64::NEG_INFINITY));
    }

    #[test]
    fn test_edges_are_not_rebuilt() {
        let config = HistogramConfig {
            num_bins: 2,
            ..HistogramConfig::default()
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        hist.add_batch(&[0.0, 1.5, 100.0, -3.0]).unwrap();
        let result = hist.finalize();

        assert_eq!(result.bin_edges, vec![0.0, 1.0, 2.0]);
        assert_eq!(result.counts, vec![1, 1]);
        assert_eq!(result.out_of_range, 2);
        // Out-of-range values still shape the summary
        assert_eq!(result.summary.count, 4);
        assert_eq!(result.summary.max, Some(100.0));
        assert_eq!(result.summary.min, Some(-3.0));
    }

    #[test]
    fn test_reject_policy() {
        let config = HistogramConfig {
            out_of_range: OutOfRangePolicy::Reject,
            ..HistogramConfig::with_range(2, 0.0, 1.0)
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        hist.add_value(0.5).unwrap();
        let err = hist.add_value(2.0).unwrap_err();
        assert_eq!(
            err,
            StatsError::OutOfRange {
                value: 2.0,
                low: 0.0,
                high: 1.0
            }
        );
        let result = hist.finalize();
        assert_eq!(result.summary.count, 2);
        assert_eq!(result.binned(), 1);
    }

    #[test]
    fn test_sturges_with_expected_count() {
        let config = HistogramConfig {
            method: BinMethod::Sturges,
            expected_count: Some(1000),
            ..HistogramConfig::with_range(30, 0.0, 1.0)
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        hist.add_value(0.5).unwrap();
        // ceil(log2(1000)) + 1 = 11
        assert_eq!(hist.finalize().num_bins(), 11);
    }

    #[test]
    fn test_sqrt_with_expected_count() {
        let config = HistogramConfig {
            method: BinMethod::Sqrt,
            expected_count: Some(50),
            ..HistogramConfig::with_range(30, 0.0, 1.0)
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        hist.add_value(0.5).unwrap();
        assert_eq!(hist.finalize().num_bins(), 8);
    }

    #[test]
    fn test_freedman_diaconis() {
        let config = HistogramConfig {
            method: BinMethod::FreedmanDiaconis,
            expected_count: Some(1000),
            ..HistogramConfig::with_range(30, 0.0, 100.0)
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        hist.add_value(1.0).unwrap();
        // width = 2 * 25 / 10 = 5
        assert_eq!(hist.finalize().num_bins(), 20);
    }

    #[test]
    fn test_freedman_diaconis_falls_back_on_zero_iqr() {
        let config = HistogramConfig {
            num_bins: 7,
            method: BinMethod::FreedmanDiaconis,
            ..HistogramConfig::default()
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        hist.add_value(3.0).unwrap();
        assert_eq!(hist.finalize().num_bins(), 7);
    }

    #[test]
    fn test_fixed_width() {
        let config = HistogramConfig {
            method: BinMethod::FixedWidth,
            bin_width: Some(2.5),
            ..HistogramConfig::with_range(30, 0.0, 10.0)
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        hist.add_batch(&[0.0, 2.5, 9.9, 10.0]).unwrap();
        let result = hist.finalize();
        assert_eq!(result.bin_edges, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
        assert_eq!(result.counts, vec![1, 1, 0, 2]);
    }

    #[test]
    fn test_empty_input() {
        let result = StreamingHistogram::new(HistogramConfig::default())
            .unwrap()
            .finalize();
        assert!(result.bin_edges.is_empty());
        assert!(result.counts.is_empty());
        assert!(result.bins().is_empty());
        assert_eq!(result.summary.count, 0);
        assert_eq!(result.summary.mean, 0.0);
        assert_eq!(result.summary.skewness, None);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(HistogramConfig {
            num_bins: 0,
            ..HistogramConfig::default()
        }
        .validate()
        .is_err());
        assert!(HistogramConfig::with_range(3, 5.0, 5.0).validate().is_err());
        assert!(HistogramConfig {
            min_value: Some(0.0),
            ..HistogramConfig::default()
        }
        .validate()
        .is_err());
        assert!(HistogramConfig {
            bin_width: Some(-1.0),
            ..HistogramConfig::default()
        }
        .validate()
        .is_err());
        assert!(HistogramConfig {
            num_bins: MAX_BINS + 1,
            ..HistogramConfig::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_fixed_width_bin_cap() {
        let config = HistogramConfig {
            method: BinMethod::FixedWidth,
            bin_width: Some(1e-9),
            ..HistogramConfig::with_range(30, 0.0, 1000.0)
        };
        assert!(matches!(
            StreamingHistogram::new(config),
            Err(StatsError::InvalidConfig(_))
        ));

        // A lone first value spans a single fixed-width bin
        let config = HistogramConfig {
            method: BinMethod::FixedWidth,
            bin_width: Some(1e-300),
            ..HistogramConfig::default()
        };
        let mut hist = StreamingHistogram::new(config).unwrap();
        assert!(hist.add_value(5.0).is_ok());
        assert_eq!(hist.finalize().num_bins(), 1);
    }

    #[test]
    fn test_bin_method_parsing() {
        assert_eq!("auto".parse::<BinMethod>().unwrap(), BinMethod::Fixed);
        assert_eq!("fd".parse::<BinMethod>().unwrap(), BinMethod::FreedmanDiaconis);
        assert_eq!(
            "fixed-width".parse::<BinMethod>().unwrap(),
            BinMethod::FixedWidth
        );
        assert!("bogus".parse::<BinMethod>().is_err());
    }
}
