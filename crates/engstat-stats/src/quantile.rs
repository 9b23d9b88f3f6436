//! Nearest-rank order statistics
//!
//! Median and quartiles cannot be computed from a single forward pass in
//! O(1) space. Callers that need them retain every observed value, and
//! this module sorts the sample once at finalization (O(n log n)).
//! This is the only O(n)-memory part of the crate.
//!
//! Quartiles use nearest rank, not interpolation:
//!
//! - `Q1 = sorted[n / 4]`
//! - `Q3 = sorted[3n / 4]`
//! - median is the middle element, or the mean of the two middle elements
//!   when `n` is even

use serde::{Deserialize, Serialize};

/// Median and quartiles of a retained sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl Quartiles {
    /// Compute from an ascending slice, `None` when empty
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        let n = sorted.len();
        if n == 0 {
            return None;
        }

        Some(Self {
            q1: sorted[n / 4],
            median: median_sorted(sorted)?,
            q3: sorted[3 * n / 4],
        })
    }

    /// Sort `values` in place and compute
    pub fn from_values(values: &mut [f64]) -> Option<Self> {
        sort_values(values);
        Self::from_sorted(values)
    }

    /// Interquartile range (Q3 - Q1)
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Median of an ascending slice
pub fn median_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        None
    } else if n % 2 == 0 {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Some(sorted[n / 2])
    }
}

/// Sort ascending with a total order (NaN sorts last)
pub fn sort_values(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_sample() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let q = Quartiles::from_sorted(&sorted).unwrap();
        assert_eq!(q.q1, 3.0);
        assert_eq!(q.q3, 7.0);
        assert_eq!(q.median, 4.5);
        assert_eq!(q.iqr(), 4.0);
    }

    #[test]
    fn test_odd_sample() {
        let sorted = [10.0, 20.0, 30.0, 40.0, 50.0];
        let q = Quartiles::from_sorted(&sorted).unwrap();
        assert_eq!(q.q1, 20.0);
        assert_eq!(q.median, 30.0);
        assert_eq!(q.q3, 40.0);
    }

    #[test]
    fn test_single_value() {
        let q = Quartiles::from_sorted(&[7.0]).unwrap();
        assert_eq!(q.q1, 7.0);
        assert_eq!(q.median, 7.0);
        assert_eq!(q.q3, 7.0);
        assert_eq!(q.iqr(), 0.0);
    }

    #[test]
    fn test_empty() {
        assert!(Quartiles::from_sorted(&[]).is_none());
        assert!(median_sorted(&[]).is_none());
    }

    #[test]
    fn test_from_unsorted_values() {
        let mut values = vec![8.0, 1.0, 7.0, 2.0, 6.0, 3.0, 5.0, 4.0];
        let q = Quartiles::from_values(&mut values).unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(q.median, 4.5);
    }
}
