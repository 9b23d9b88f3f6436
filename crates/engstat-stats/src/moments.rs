//! Online central moments (mean, variance, skewness, kurtosis)
//!
//! Uses the extended single-pass update: every value updates `M4`, then
//! `M3`, then `M2`, each from the pre-update lower moments. Swapping that
//! order biases the higher moments without any visible failure.
//!
//! # Degenerate input
//!
//! - `count <= 1`: variance is reported as `0` and `variance_defined` is false
//! - `count <= 2` or `M2 == 0`: skewness and kurtosis are reported as `0`
//!   and `shape_defined` is false

use serde::{Deserialize, Serialize};

/// Per-column streaming moment state
///
/// O(1) memory regardless of how many values are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentAccumulator {
    count: u64,
    missing: u64,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
    min: f64,
    max: f64,
    sum: f64,
}

impl Default for MomentAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl MomentAccumulator {
    /// Create an empty accumulator (all fields at their identity values)
    pub fn new() -> Self {
        Self {
            count: 0,
            missing: 0,
            mean: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
        }
    }

    /// Add a value
    ///
    /// NaN is counted as missing and otherwise ignored.
    pub fn add_value(&mut self, x: f64) {
        if x.is_nan() {
            self.missing += 1;
            return;
        }

        let n = self.count as f64;
        let n1 = n + 1.0;

        let delta = x - self.mean;
        let delta_n = delta / n1;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n;

        self.mean += delta_n;
        self.m4 += term1 * delta_n2 * (n1 * n1 - 3.0 * n1 + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n1 - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
        self.count += 1;

        self.sum += x;
        if x < self.min {
            self.min = x;
        }
        if x > self.max {
            self.max = x;
        }
    }

    /// Add every value from an iterator
    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for x in values {
            self.add_value(x);
        }
    }

    /// Number of (non-NaN) values seen
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of NaN values skipped
    pub fn missing(&self) -> u64 {
        self.missing
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Second central moment sum
    pub fn m2(&self) -> f64 {
        self.m2
    }

    /// Minimum, or `None` when empty
    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    /// Maximum, or `None` when empty
    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    /// Whether the sample variance is defined (`count > 1`)
    pub fn variance_defined(&self) -> bool {
        self.count > 1
    }

    /// Whether skewness and kurtosis are defined (`count > 2` and `M2 != 0`)
    pub fn shape_defined(&self) -> bool {
        self.count > 2 && self.m2 != 0.0
    }

    /// Sample variance `M2 / (n - 1)`, or 0 when `count <= 1`
    pub fn variance(&self) -> f64 {
        if self.variance_defined() {
            self.m2 / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Skewness `sqrt(n) * M3 / M2^1.5`, or 0 when undefined
    pub fn skewness(&self) -> f64 {
        if self.shape_defined() {
            (self.count as f64).sqrt() * self.m3 / self.m2.powf(1.5)
        } else {
            0.0
        }
    }

    /// Excess kurtosis `n * M4 / M2^2 - 3`, or 0 when undefined
    pub fn kurtosis(&self) -> f64 {
        if self.shape_defined() {
            self.count as f64 * self.m4 / (self.m2 * self.m2) - 3.0
        } else {
            0.0
        }
    }

    /// Snapshot the current state without consuming the accumulator
    pub fn summary(&self) -> MomentSummary {
        MomentSummary {
            count: self.count,
            missing: self.missing,
            sum: self.sum,
            mean: self.mean,
            variance: self.variance(),
            std_dev: self.std_dev(),
            skewness: self.skewness(),
            kurtosis: self.kurtosis(),
            min: self.min(),
            max: self.max(),
            variance_defined: self.variance_defined(),
            shape_defined: self.shape_defined(),
        }
    }

    /// Finish accumulation
    pub fn finalize(self) -> MomentSummary {
        self.summary()
    }
}

/// Immutable result of a [`MomentAccumulator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentSummary {
    pub count: u64,
    /// NaN values that were skipped
    pub missing: u64,
    pub sum: f64,
    pub mean: f64,
    /// Sample variance (n - 1 denominator)
    pub variance: f64,
    pub std_dev: f64,
    pub skewness: f64,
    /// Excess kurtosis (normal distribution = 0)
    pub kurtosis: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// False when `variance` is a substituted 0
    pub variance_defined: bool,
    /// False when `skewness`/`kurtosis` are substituted 0s
    pub shape_defined: bool,
}

impl MomentSummary {
    /// Range (max - min), `None` when empty
    pub fn range(&self) -> Option<f64> {
        Some(self.max? - self.min?)
    }
}
