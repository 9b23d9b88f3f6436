//! engstat-stats - Streaming statistical accumulators
//!
//! Every accumulator consumes values one at a time and is finalized once
//! into an immutable, serializable result:
//!
//! - **Moments**: mean, variance, skewness, kurtosis in O(1) memory
//! - **Correlation**: full Pearson matrix from running sums
//! - **Grouped**: per-group moments plus median and quartiles
//! - **Histogram**: lazily binned counts with a running summary
//!
//! # Memory
//!
//! Moments, correlation and histograms never retain input values. Grouped
//! statistics keep every value of every group so that quartiles can be
//! computed exactly; see [`quantile`].

pub mod correlation;
pub mod error;
pub mod grouped;
pub mod histogram;
pub mod moments;
pub mod quantile;

pub use correlation::*;
pub use error::*;
pub use grouped::*;
pub use histogram::*;
pub use moments::*;
pub use quantile::*;
