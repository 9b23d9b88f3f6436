//! engstat-io - Row sources for engine telemetry
//!
//! This crate turns tabular sensor data into a stream of typed rows:
//!
//! - **CSV/TSV**: delimited text with header normalisation and type inference
//! - **Memory**: rows already held by the caller
//!
//! # Design
//!
//! All sources implement the `RowSource` trait. Rows are pulled one at a
//! time, so a source never has to hold the full dataset. Columns are looked
//! up by base name through `DataSchema::resolve`, never by position.

pub mod memory;
pub mod reader;
pub mod schema;

#[cfg(feature = "csv")]
pub mod csv_reader;

pub use memory::*;
pub use reader::*;
pub use schema::*;

#[cfg(feature = "csv")]
pub use csv_reader::{normalize_header, CsvOptions, CsvRowSource};
