//! Accumulator property tests
//!
//! Checks the streaming results against direct two-pass computations.

use engstat_stats::{
    CorrelationAccumulator, GroupedAccumulator, HistogramConfig, MomentAccumulator, Quartiles,
    StreamingHistogram,
};
use proptest::prelude::*;
use rstest::rstest;

/// Deterministic pseudo-random sequence (LCG), skewed by squaring
fn sample(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let u = (state >> 11) as f64 / (1u64 << 53) as f64;
            100.0 * u * u + 3.0 * u
        })
        .collect()
}

struct Batch {
    mean: f64,
    variance: f64,
    skewness: f64,
    kurtosis: f64,
}

fn batch(data: &[f64]) -> Batch {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let m2: f64 = data.iter().map(|x| (x - mean).powi(2)).sum();
    let m3: f64 = data.iter().map(|x| (x - mean).powi(3)).sum();
    let m4: f64 = data.iter().map(|x| (x - mean).powi(4)).sum();
    Batch {
        mean,
        variance: m2 / (n - 1.0),
        skewness: n.sqrt() * m3 / m2.powf(1.5),
        kurtosis: n * m4 / (m2 * m2) - 3.0,
    }
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * (1.0 + b.abs())
}

// === Moments ===

#[rstest]
#[case(3)]
#[case(10)]
#[case(100)]
#[case(1_000)]
#[case(10_000)]
fn test_incremental_matches_batch(#[case] n: usize) {
    let data = sample(n, n as u64);
    let mut acc = MomentAccumulator::new();
    acc.extend(data.iter().copied());
    let expected = batch(&data);

    assert!(close(acc.mean(), expected.mean, 1e-9));
    assert!(close(acc.variance(), expected.variance, 1e-9));
    assert!(close(acc.skewness(), expected.skewness, 1e-7));
    assert!(close(acc.kurtosis(), expected.kurtosis, 1e-7));
}

#[rstest]
#[case(&[], 0.0, 0.0)]
#[case(&[4.0], 0.0, 0.0)]
#[case(&[4.0, 8.0], 8.0, 0.0)]
#[case(&[2.0, 2.0, 2.0, 2.0], 0.0, 0.0)]
fn test_degenerate_inputs_report_zero(
    #[case] data: &[f64],
    #[case] variance: f64,
    #[case] skewness: f64,
) {
    let mut acc = MomentAccumulator::new();
    acc.extend(data.iter().copied());
    let summary = acc.finalize();
    assert_eq!(summary.variance, variance);
    assert_eq!(summary.skewness, skewness);
    assert_eq!(summary.kurtosis, 0.0);
    assert!(!summary.shape_defined);
}

proptest! {
    #[test]
    fn test_mean_matches_two_pass(data in prop::collection::vec(-1.0e6f64..1.0e6, 1..500)) {
        let mut acc = MomentAccumulator::new();
        acc.extend(data.iter().copied());
        let expected = data.iter().sum::<f64>() / data.len() as f64;
        let scale = data.iter().fold(1.0f64, |m, x| m.max(x.abs()));
        prop_assert!((acc.mean() - expected).abs() <= 1e-9 * scale);
    }

    #[test]
    fn test_min_le_max(data in prop::collection::vec(-1.0e3f64..1.0e3, 1..100)) {
        let summary = {
            let mut acc = MomentAccumulator::new();
            acc.extend(data.iter().copied());
            acc.finalize()
        };
        prop_assert!(summary.min.unwrap() <= summary.max.unwrap());
        prop_assert_eq!(summary.count, data.len() as u64);
    }

    // === Correlation ===

    #[test]
    fn test_correlation_symmetric_unit_diagonal(
        rows in prop::collection::vec(prop::collection::vec(-1.0e3f64..1.0e3, 4), 0..60)
    ) {
        let mut acc = CorrelationAccumulator::new(vec![
            "a".into(), "b".into(), "c".into(), "d".into(),
        ]);
        for row in &rows {
            acc.add_row(row).unwrap();
        }
        let matrix = acc.finalize();
        for i in 0..4 {
            prop_assert_eq!(matrix.get(i, i), Some(1.0));
            for j in 0..4 {
                let a = matrix.get(i, j).unwrap();
                let b = matrix.get(j, i).unwrap();
                prop_assert!(!a.is_nan());
                prop_assert!((a - b).abs() < 1e-12);
            }
        }
    }

    // === Histogram ===

    #[test]
    fn test_fixed_range_counts_every_in_range_value(
        data in prop::collection::vec(-20.0f64..20.0, 0..300),
        bins in 1usize..40,
    ) {
        let mut hist = StreamingHistogram::new(HistogramConfig::with_range(bins, -10.0, 10.0)).unwrap();
        hist.add_batch(&data).unwrap();
        let result = hist.finalize();

        let in_range = data.iter().filter(|x| (-10.0..=10.0).contains(*x)).count() as u64;
        prop_assert_eq!(result.binned(), in_range);
        prop_assert_eq!(result.binned() + result.out_of_range, result.summary.count);
        prop_assert!(result.bin_edges.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_constant_column_correlates_zero() {
    let mut acc = CorrelationAccumulator::new(vec!["x".into(), "flat".into(), "y".into()]);
    for x in sample(200, 7) {
        acc.add_row(&[x, 1234.5, x * 0.5 - 3.0]).unwrap();
    }
    let matrix = acc.finalize();
    assert_eq!(matrix.get_by_name("x", "flat"), Some(0.0));
    assert_eq!(matrix.get_by_name("flat", "y"), Some(0.0));
    assert!((matrix.get_by_name("x", "y").unwrap() - 1.0).abs() < 1e-9);
}

// === Grouped ===

#[test]
fn test_grouped_moments_match_ungrouped() {
    let data = sample(500, 11);
    let mut grouped = GroupedAccumulator::new(vec!["value".into()]);
    let mut even = MomentAccumulator::new();
    let mut odd = MomentAccumulator::new();

    for (i, &x) in data.iter().enumerate() {
        let key = (i % 2) as i64;
        grouped.add_row(key, &[x]).unwrap();
        if key == 0 {
            even.add_value(x);
        } else {
            odd.add_value(x);
        }
    }

    let report = grouped.finalize();
    let g0 = report.group(0).unwrap().column("value").unwrap();
    let g1 = report.group(1).unwrap().column("value").unwrap();
    assert_eq!(g0.mean, even.mean());
    assert_eq!(g0.kurtosis, even.kurtosis());
    assert_eq!(g1.variance, odd.variance());
    assert_eq!(g1.skewness, odd.skewness());
}

#[test]
fn test_grouped_quartiles_are_nearest_rank() {
    let mut data = sample(101, 3);
    let mut grouped = GroupedAccumulator::new(vec!["value".into()]);
    for &x in &data {
        grouped.add_row(9, &[x]).unwrap();
    }
    let report = grouped.finalize();
    let stats = report.group(9).unwrap().column("value").unwrap();

    let expected = Quartiles::from_values(&mut data).unwrap();
    assert_eq!(stats.q1, data[25]);
    assert_eq!(stats.q3, data[75]);
    assert_eq!(stats.median, data[50]);
    assert_eq!(stats.iqr, expected.iqr());
}
