//! engstat-core - Streaming statistics over engine telemetry
//!
//! This crate connects row sources from `engstat-io` to the accumulators
//! in `engstat-stats`:
//!
//! - **compute**: one pass per statistic (`compute_moments`,
//!   `compute_correlation`, `compute_grouped`, `compute_histogram`)
//! - **dispatch**: `Analysis`, which feeds every requested statistic from a
//!   single pass
//! - **config**: `AnalysisConfig`, loadable from TOML or JSON
//! - **report**: text and JSON rendering
//!
//! # Example
//!
//! ```no_run
//! use engstat_core::{Analysis, AnalysisConfig};
//!
//! let mut source = engstat_io::open_source("engine_data.csv")?;
//! let report = Analysis::everything(AnalysisConfig::default()).run(&mut source)?;
//! println!("{}", engstat_core::report::render_text(&report));
//! # Ok::<(), engstat_core::AnalysisError>(())
//! ```

pub mod compute;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod report;

pub use compute::{
    compute_correlation, compute_grouped, compute_histogram, compute_moments, ColumnMoments,
    ColumnSelection, MomentReport,
};
pub use config::*;
pub use dispatch::*;
pub use error::*;
