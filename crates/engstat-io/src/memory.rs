//! In-memory row source

use crate::reader::{IoError, IoResult, RowSource};
use crate::schema::{ColumnDescriptor, ColumnType, DataSchema, Row};

/// Restartable source over rows held in memory
///
/// Entries may be errors, which are yielded in place. This makes the
/// source useful for exercising recovery paths as well as for feeding
/// rows that arrived from another system (a database cursor, a message
/// queue) without going through a file.
#[derive(Debug, Clone)]
pub struct MemoryRowSource {
    schema: DataSchema,
    rows: Vec<IoResult<Row>>,
    position: usize,
}

impl MemoryRowSource {
    /// Create a source over well-formed rows
    pub fn new(schema: DataSchema, rows: Vec<Row>) -> Self {
        Self::with_results(schema, rows.into_iter().map(Ok).collect())
    }

    /// Create a source whose entries may be errors
    pub fn with_results(schema: DataSchema, rows: Vec<IoResult<Row>>) -> Self {
        let schema = schema.with_num_records(rows.len());
        Self {
            schema,
            rows,
            position: 0,
        }
    }

    /// Build a float-typed source from column names and row-major values
    pub fn from_f64_rows(names: &[&str], rows: &[Vec<f64>]) -> IoResult<Self> {
        let columns = names
            .iter()
            .map(|name| ColumnDescriptor::new(*name, ColumnType::Float))
            .collect();

        let mut built = Vec::with_capacity(rows.len());
        for values in rows {
            if values.len() != names.len() {
                return Err(IoError::InvalidFormat(format!(
                    "row has {} values, expected {}",
                    values.len(),
                    names.len()
                )));
            }
            built.push(Row::from_f64(values));
        }

        Ok(Self::new(DataSchema::new(columns), built))
    }

    /// Number of entries, including errors
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowSource for MemoryRowSource {
    fn schema(&self) -> &DataSchema {
        &self.schema
    }

    fn next_row(&mut self) -> Option<IoResult<Row>> {
        let entry = self.rows.get(self.position)?.clone();
        self.position += 1;
        Some(entry)
    }

    fn rewind(&mut self) -> IoResult<()> {
        self.position = 0;
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "Memory"
    }
}
