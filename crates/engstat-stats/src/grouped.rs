//! Per-group (conditional) statistics
//!
//! Rows are keyed by a discrete group value such as an engine condition
//! code. Each group owns one [`MomentAccumulator`] per column plus the raw
//! values of every column, which the median and quartiles need at
//! finalization. Memory therefore grows with the number of rows; see
//! [`crate::quantile`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{StatsError, StatsResult};
use crate::moments::MomentAccumulator;
use crate::quantile::Quartiles;

/// Group key (e.g. a condition code)
pub type GroupKey = i64;

#[derive(Debug, Clone)]
struct GroupState {
    count: u64,
    moments: Vec<MomentAccumulator>,
    values: Vec<Vec<f64>>,
}

impl GroupState {
    fn new(width: usize) -> Self {
        Self {
            count: 0,
            moments: vec![MomentAccumulator::new(); width],
            values: vec![Vec::new(); width],
        }
    }

    fn finalize(self, key: GroupKey, columns: &[String]) -> GroupStats {
        let stats = self
            .moments
            .into_iter()
            .zip(self.values)
            .zip(columns)
            .map(|((moments, mut values), name)| {
                let quartiles = Quartiles::from_values(&mut values);
                ColumnStats::new(name.clone(), &moments, quartiles)
            })
            .collect();

        GroupStats {
            key,
            count: self.count,
            columns: stats,
        }
    }
}

/// Streaming accumulator for grouped statistics
#[derive(Debug, Clone)]
pub struct GroupedAccumulator {
    columns: Vec<String>,
    groups: HashMap<GroupKey, GroupState>,
    /// Keys in first-seen order
    order: Vec<GroupKey>,
}

impl GroupedAccumulator {
    /// Create an accumulator over the named value columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            groups: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Number of value columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Keys discovered so far, in first-seen order
    pub fn keys(&self) -> &[GroupKey] {
        &self.order
    }

    /// Add one row belonging to `key`
    pub fn add_row(&mut self, key: GroupKey, values: &[f64]) -> StatsResult<()> {
        let width = self.width();
        if values.len() != width {
            return Err(StatsError::ArityMismatch {
                expected: width,
                actual: values.len(),
            });
        }

        let order = &mut self.order;
        let group = self.groups.entry(key).or_insert_with(|| {
            order.push(key);
            GroupState::new(width)
        });

        group.count += 1;
        for ((moments, retained), &x) in group
            .moments
            .iter_mut()
            .zip(group.values.iter_mut())
            .zip(values)
        {
            moments.add_value(x);
            if !x.is_nan() {
                retained.push(x);
            }
        }
        Ok(())
    }

    /// Finish accumulation
    ///
    /// Groups are reported in first-seen order. Sorting the retained
    /// values dominates the cost (O(n log n) per group and column).
    pub fn finalize(mut self) -> GroupedReport {
        let states: Vec<(GroupKey, GroupState)> = self
            .order
            .iter()
            .filter_map(|key| self.groups.remove(key).map(|state| (*key, state)))
            .collect();

        let columns = self.columns;

        #[cfg(feature = "parallel")]
        let groups = {
            use rayon::prelude::*;
            states
                .into_par_iter()
                .map(|(key, state)| state.finalize(key, &columns))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let groups = states
            .into_iter()
            .map(|(key, state)| state.finalize(key, &columns))
            .collect();

        GroupedReport { columns, groups }
    }
}

/// Finalized statistics for one column within one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub name: String,
    pub sum: f64,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub variance_defined: bool,
    pub shape_defined: bool,
}

impl ColumnStats {
    fn new(name: String, moments: &MomentAccumulator, quartiles: Option<Quartiles>) -> Self {
        let summary = moments.summary();
        let (q1, median, q3, iqr) = quartiles
            .map(|q| (q.q1, q.median, q.q3, q.iqr()))
            .unwrap_or((0.0, 0.0, 0.0, 0.0));

        Self {
            name,
            sum: summary.sum,
            mean: summary.mean,
            variance: summary.variance,
            std_dev: summary.std_dev,
            min: summary.min.unwrap_or(0.0),
            max: summary.max.unwrap_or(0.0),
            median,
            q1,
            q3,
            iqr,
            skewness: summary.skewness,
            kurtosis: summary.kurtosis,
            variance_defined: summary.variance_defined,
            shape_defined: summary.shape_defined,
        }
    }
}

/// Finalized statistics for one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub key: GroupKey,
    /// Rows in this group
    pub count: u64,
    /// One entry per value column, in column order
    pub columns: Vec<ColumnStats>,
}

impl GroupStats {
    /// Statistics for a named column
    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Finalized grouped statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedReport {
    /// Value columns
    pub columns: Vec<String>,
    /// Groups in first-seen order
    pub groups: Vec<GroupStats>,
}

impl GroupedReport {
    /// Statistics for a group key
    pub fn group(&self, key: GroupKey) -> Option<&GroupStats> {
        self.groups.iter().find(|g| g.key == key)
    }

    /// Group keys in first-seen order
    pub fn keys(&self) -> Vec<GroupKey> {
        self.groups.iter().map(|g| g.key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_groups() {
        let mut acc = GroupedAccumulator::new(vec!["v".into()]);
        acc.add_row(1, &[10.0]).unwrap();
        acc.add_row(1, &[20.0]).unwrap();
        acc.add_row(2, &[5.0]).unwrap();
        let report = acc.finalize();

        let g1 = report.group(1).unwrap();
        assert_eq!(g1.count, 2);
        assert_eq!(g1.columns[0].mean, 15.0);
        assert_eq!(g1.columns[0].median, 15.0);

        let g2 = report.group(2).unwrap();
        assert_eq!(g2.count, 1);
        assert_eq!(g2.columns[0].mean, 5.0);
        assert_eq!(g2.columns[0].variance, 0.0);
        assert!(!g2.columns[0].variance_defined);
    }

    #[test]
    fn test_first_seen_order() {
        let mut acc = GroupedAccumulator::new(vec!["v".into()]);
        for key in [3, 1, 3, 2, 1] {
            acc.add_row(key, &[key as f64]).unwrap();
        }
        assert_eq!(acc.keys(), &[3, 1, 2]);
        assert_eq!(acc.finalize().keys(), vec![3, 1, 2]);
    }

    #[test]
    fn test_quartiles_per_group() {
        let mut acc = GroupedAccumulator::new(vec!["a".into(), "b".into()]);
        for i in 1..=8 {
            acc.add_row(0, &[(9 - i) as f64, i as f64 * 10.0]).unwrap();
        }
        let report = acc.finalize();
        let a = report.group(0).unwrap().column("a").unwrap();
        assert_eq!(a.q1, 3.0);
        assert_eq!(a.q3, 7.0);
        assert_eq!(a.median, 4.5);
        assert_eq!(a.iqr, 4.0);
        assert_eq!(a.min, 1.0);
        assert_eq!(a.max, 8.0);

        let b = report.group(0).unwrap().column("b").unwrap();
        assert_eq!(b.median, 45.0);
        assert_eq!(b.sum, 360.0);
    }

    #[test]
    fn test_empty_input() {
        let report = GroupedAccumulator::new(vec!["v".into()]).finalize();
        assert!(report.groups.is_empty());
        assert_eq!(report.columns, vec!["v".to_string()]);
    }

    #[test]
    fn test_arity_mismatch_does_not_register_group() {
        let mut acc = GroupedAccumulator::new(vec!["a".into(), "b".into()]);
        assert!(acc.add_row(7, &[1.0]).is_err());
        assert!(acc.keys().is_empty());
    }
}
