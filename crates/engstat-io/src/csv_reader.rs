//! Streaming CSV row source with type inference
//!
//! Opening a file scans it once: column types are inferred from the first
//! records and the total record count is taken. Rows are then streamed
//! from a second reader, one record at a time.

use crate::reader::{IoError, IoResult, RowSource};
use crate::schema::{base_name, ColumnDescriptor, ColumnType, DataSchema, Row, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Records sampled for type inference
const INFERENCE_SAMPLE: usize = 100;

/// Options for opening a CSV file
#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub has_header: bool,
    /// Trim, lowercase and snake_case header names (`Engine rpm` -> `engine_rpm`)
    pub normalize_headers: bool,
    /// Columns to drop, matched by (normalized) base name, e.g. a time axis
    pub skip_columns: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            normalize_headers: true,
            skip_columns: Vec::new(),
        }
    }
}

/// Normalize a header name to snake_case
pub fn normalize_header(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

type CsvReader = csv::Reader<BufReader<File>>;

/// CSV row source
pub struct CsvRowSource {
    path: String,
    options: CsvOptions,
    schema: DataSchema,
    /// Raw field index for each schema column
    fields: Vec<usize>,
    reader: CsvReader,
    record: csv::StringRecord,
    row: u64,
}

impl CsvRowSource {
    /// Open a CSV file
    pub fn open(path: &str) -> IoResult<Self> {
        Self::open_with_options(path, CsvOptions::default())
    }

    /// Open a CSV file with options
    pub fn open_with_options(path: &str, options: CsvOptions) -> IoResult<Self> {
        if !Path::new(path).exists() {
            return Err(IoError::FileNotFound(path.to_string()));
        }

        let mut reader = Self::reader(path, &options)?;
        let (schema, fields) = Self::infer_schema(&mut reader, &options)?;

        tracing::info!(
            "Opened CSV source {} ({} columns, {} records)",
            path,
            schema.num_columns(),
            schema.num_records.unwrap_or(0)
        );

        let mut schema = schema;
        schema
            .metadata
            .insert("format".to_string(), "CSV".to_string());
        schema.metadata.insert(
            "delimiter".to_string(),
            (options.delimiter as char).to_string(),
        );

        Ok(Self {
            path: path.to_string(),
            reader: Self::reader(path, &options)?,
            options,
            schema,
            fields,
            record: csv::StringRecord::new(),
            row: 0,
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &str {
        &self.path
    }

    fn reader(path: &str, options: &CsvOptions) -> IoResult<CsvReader> {
        let file = File::open(path).map_err(|e| IoError::OpenFailed(e.to_string()))?;
        Ok(csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(options.has_header)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file)))
    }

    fn infer_schema(
        reader: &mut CsvReader,
        options: &CsvOptions,
    ) -> IoResult<(DataSchema, Vec<usize>)> {
        let mut records = reader.records();

        let mut sample: Vec<csv::StringRecord> = Vec::new();
        let mut num_records = 0;
        for result in records.by_ref().take(INFERENCE_SAMPLE) {
            num_records += 1;
            match result {
                Ok(record) => sample.push(record),
                Err(e) if e.is_io_error() => return Err(IoError::Read(e.to_string())),
                Err(e) => tracing::debug!("Ignoring record during inference: {}", e),
            }
        }

        for result in records {
            match result {
                Ok(_) => num_records += 1,
                Err(e) if e.is_io_error() => return Err(IoError::Read(e.to_string())),
                // Counted; the streaming pass reports it as malformed
                Err(_) => num_records += 1,
            }
        }

        let headers: Vec<String> = if options.has_header {
            reader
                .headers()
                .map_err(|e| IoError::InvalidFormat(e.to_string()))?
                .iter()
                .map(|s| {
                    if options.normalize_headers {
                        normalize_header(s)
                    } else {
                        s.to_string()
                    }
                })
                .collect()
        } else {
            let width = sample.first().map(|r| r.len()).unwrap_or(0);
            (0..width).map(|i| format!("col_{}", i)).collect()
        };

        let skipped: Vec<String> = options
            .skip_columns
            .iter()
            .map(|name| {
                let name = base_name(name);
                if options.normalize_headers {
                    normalize_header(name)
                } else {
                    name.to_string()
                }
            })
            .collect();

        let mut columns = Vec::new();
        let mut fields = Vec::new();
        for (i, name) in headers.into_iter().enumerate() {
            if skipped.iter().any(|s| *s == base_name(&name)) {
                continue;
            }
            let values: Vec<&str> = sample.iter().filter_map(|r| r.get(i)).collect();
            let dtype = infer_type(&values).ok_or_else(|| {
                IoError::InvalidFormat(format!("column '{}' is not numeric", name))
            })?;
            tracing::debug!("Inferred column {} as {}", name, dtype.name());
            columns.push(ColumnDescriptor::new(name, dtype));
            fields.push(i);
        }

        Ok((DataSchema::new(columns).with_num_records(num_records), fields))
    }

    fn parse_record(&self) -> IoResult<Row> {
        let mut values = Vec::with_capacity(self.fields.len());
        for (column, &field) in self.schema.columns.iter().zip(&self.fields) {
            let raw = self.record.get(field).ok_or_else(|| IoError::MalformedRow {
                row: self.row,
                message: format!("missing field '{}'", column.name),
            })?;
            let value = parse_value(raw, column.dtype).ok_or_else(|| IoError::MalformedRow {
                row: self.row,
                message: format!("cannot parse '{}' in column '{}'", raw, column.name),
            })?;
            values.push(value);
        }
        Ok(Row::new(values))
    }
}

impl RowSource for CsvRowSource {
    fn schema(&self) -> &DataSchema {
        &self.schema
    }

    fn next_row(&mut self) -> Option<IoResult<Row>> {
        let result = self.reader.read_record(&mut self.record);
        self.row += 1;
        match result {
            Ok(true) => Some(self.parse_record()),
            Ok(false) => None,
            Err(e) if e.is_io_error() => Some(Err(IoError::Read(e.to_string()))),
            Err(e) => Some(Err(IoError::MalformedRow {
                row: self.row,
                message: e.to_string(),
            })),
        }
    }

    fn rewind(&mut self) -> IoResult<()> {
        self.reader = Self::reader(&self.path, &self.options)?;
        self.row = 0;
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}

/// Infer column type from sample values, `None` if not numeric
///
/// A column is numeric when most of its non-empty values parse; the
/// stragglers surface later as malformed rows.
fn infer_type(values: &[&str]) -> Option<ColumnType> {
    let non_empty: Vec<&str> = values.iter().copied().filter(|s| !s.is_empty()).collect();
    if non_empty.is_empty() {
        return Some(ColumnType::Float);
    }

    let numeric: Vec<&str> = non_empty
        .iter()
        .copied()
        .filter(|s| s.parse::<f64>().is_ok())
        .collect();
    if numeric.len() * 2 <= non_empty.len() {
        return None;
    }

    if numeric.iter().all(|s| s.parse::<i64>().is_ok()) {
        Some(ColumnType::Integer)
    } else {
        Some(ColumnType::Float)
    }
}

/// Parse a field; a float in an integer column is kept as a float
fn parse_value(raw: &str, dtype: ColumnType) -> Option<Value> {
    match dtype {
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(Value::Integer)
            .or_else(|_| raw.parse::<f64>().map(Value::Float))
            .ok(),
        ColumnType::Float => raw.parse::<f64>().map(Value::Float).ok(),
    }
}
