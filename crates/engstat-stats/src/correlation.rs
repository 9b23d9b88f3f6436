//! Pairwise Pearson correlation
//!
//! Keeps `sum_x`, `sum_x2` per column and a dense `sum_xy` matrix, so
//! memory is O(n²) in the number of columns and every row costs O(n²)
//! updates. That quadratic cost is the scaling limit for wide tables.
//!
//! Every sum is taken over values shifted by the first accepted row.
//! Pearson's r does not change under a shift, and shifting keeps
//! `count * sum_x2 - sum_x^2` from cancelling away the spread of columns
//! whose mean is large next to their deviation, such as epoch timestamps.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{StatsError, StatsResult};

/// Relative spread of the shifted sums below which a column is constant
const CONSTANT_TOLERANCE: f64 = 64.0 * f64::EPSILON;

/// Streaming accumulator for a full correlation matrix
#[derive(Debug, Clone)]
pub struct CorrelationAccumulator {
    columns: Vec<String>,
    count: u64,
    /// Rows dropped for holding a NaN or an infinity
    missing: u64,
    /// First accepted row, subtracted from every value
    shift: Option<Array1<f64>>,
    sum_x: Array1<f64>,
    sum_x2: Array1<f64>,
    /// Accumulated per ordered pair; the diagonal is never written
    sum_xy: Array2<f64>,
}

impl CorrelationAccumulator {
    /// Create an accumulator over the named columns
    pub fn new(columns: Vec<String>) -> Self {
        let n = columns.len();
        Self {
            columns,
            count: 0,
            missing: 0,
            shift: None,
            sum_x: Array1::zeros(n),
            sum_x2: Array1::zeros(n),
            sum_xy: Array2::zeros((n, n)),
        }
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Rows accumulated so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Rows dropped because a value was NaN or infinite
    pub fn missing(&self) -> u64 {
        self.missing
    }

    /// Add one row; `values[i]` belongs to column `i`
    ///
    /// A row with a NaN or an infinity in any column is dropped as a whole.
    pub fn add_row(&mut self, values: &[f64]) -> StatsResult<()> {
        let n = self.width();
        if values.len() != n {
            return Err(StatsError::ArityMismatch {
                expected: n,
                actual: values.len(),
            });
        }

        if values.iter().any(|x| !x.is_finite()) {
            self.missing += 1;
            return Ok(());
        }

        let shift = self
            .shift
            .get_or_insert_with(|| Array1::from(values.to_vec()));
        let shifted: Vec<f64> = values.iter().zip(shift.iter()).map(|(x, k)| x - k).collect();

        self.count += 1;
        for (i, &x) in shifted.iter().enumerate() {
            self.sum_x[i] += x;
            self.sum_x2[i] += x * x;
            for (j, &y) in shifted.iter().enumerate() {
                if i != j {
                    self.sum_xy[[i, j]] += x * y;
                }
            }
        }
        Ok(())
    }

    /// Compute the correlation matrix
    ///
    /// Constant columns correlate 0 with everything else; the diagonal is
    /// always 1.
    pub fn finalize(self) -> CorrelationMatrix {
        let n = self.width();
        let count = self.count as f64;

        let spread: Vec<f64> = (0..n)
            .map(|i| {
                let scale = count * self.sum_x2[i];
                let radicand = scale - self.sum_x[i] * self.sum_x[i];
                // Rounding can leave a constant column slightly positive
                if !(radicand > CONSTANT_TOLERANCE * scale.abs()) {
                    0.0
                } else {
                    radicand.sqrt()
                }
            })
            .collect();

        let mut values = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                values[i][j] = if i == j {
                    1.0
                } else {
                    let denominator = spread[i] * spread[j];
                    if denominator == 0.0 {
                        0.0
                    } else {
                        (count * self.sum_xy[[i, j]] - self.sum_x[i] * self.sum_x[j]) / denominator
                    }
                };
            }
        }

        CorrelationMatrix {
            columns: self.columns,
            count: self.count,
            missing: self.missing,
            values,
        }
    }
}

/// Finalized Pearson correlation matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Column names, in matrix order
    pub columns: Vec<String>,
    /// Number of rows the matrix was computed from
    pub count: u64,
    /// Rows dropped for holding a NaN or an infinity
    pub missing: u64,
    /// Row-major coefficients
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Coefficient between columns `i` and `j`
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i)?.get(j).copied()
    }

    /// Coefficient between two named columns
    pub fn get_by_name(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.get(i, j)
    }

    /// Matrix rows
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
