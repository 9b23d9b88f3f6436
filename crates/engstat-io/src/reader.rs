//! Row source trait and common types
//!
//! The `RowSource` trait is the boundary between the statistics engine and
//! wherever rows come from: a CSV file, an in-memory table, or a database
//! cursor implemented outside this workspace.

use crate::schema::{DataSchema, Row};
use thiserror::Error;

/// Errors that can occur while reading rows
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to open file: {0}")]
    OpenFailed(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column name is ambiguous: {0}")]
    AmbiguousColumn(String),

    /// A single row could not be decoded; the stream can continue
    #[error("Malformed row {row}: {message}")]
    MalformedRow { row: u64, message: String },

    /// The source declared the stream unusable
    #[error("Corrupt stream: {0}")]
    Corrupt(String),

    #[error("Read failed: {0}")]
    Read(String),
}

impl IoError {
    /// Whether the caller may skip the offending row and keep reading
    pub fn is_recoverable(&self) -> bool {
        matches!(self, IoError::MalformedRow { .. })
    }
}

/// Result type for I/O operations
pub type IoResult<T> = Result<T, IoError>;

/// A producer of typed rows
///
/// The schema is available before the first row. Rows are pulled one at a
/// time; `next_row` returning `None` ends the stream. A terminal error
/// (anything for which [`IoError::is_recoverable`] is false) ends the
/// stream as well.
pub trait RowSource {
    /// Column names and types
    fn schema(&self) -> &DataSchema;

    /// Pull the next row
    fn next_row(&mut self) -> Option<IoResult<Row>>;

    /// Restart from the first row
    fn rewind(&mut self) -> IoResult<()>;

    /// Get the format name
    fn format_name(&self) -> &'static str;
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn schema(&self) -> &DataSchema {
        (**self).schema()
    }

    fn next_row(&mut self) -> Option<IoResult<Row>> {
        (**self).next_row()
    }

    fn rewind(&mut self) -> IoResult<()> {
        (**self).rewind()
    }

    fn format_name(&self) -> &'static str {
        (**self).format_name()
    }
}

/// A boxed source for dynamic dispatch
pub type BoxedSource = Box<dyn RowSource + Send>;

/// Open a file and return an appropriate source
///
/// The format is auto-detected from the file extension.
pub fn open_source(path: &str) -> IoResult<BoxedSource> {
    let extension = path
        .rsplit('.')
        .next()
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        #[cfg(feature = "csv")]
        "csv" => {
            use crate::csv_reader::CsvRowSource;
            Ok(Box::new(CsvRowSource::open(path)?))
        }

        #[cfg(feature = "csv")]
        "tsv" => {
            use crate::csv_reader::{CsvOptions, CsvRowSource};
            let options = CsvOptions {
                delimiter: b'\t',
                ..CsvOptions::default()
            };
            Ok(Box::new(CsvRowSource::open_with_options(path, options)?))
        }

        _ => Err(IoError::InvalidFormat(format!(
            "Unknown file extension: {}",
            extension
        ))),
    }
}

/// List supported file extensions
pub fn supported_extensions() -> Vec<&'static str> {
    let mut extensions = Vec::new();

    #[cfg(feature = "csv")]
    {
        extensions.push("csv");
        extensions.push("tsv");
    }

    extensions
}
