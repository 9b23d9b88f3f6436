//! Schema, column types and rows
//!
//! Column names may carry a dotted namespace prefix (`root.dev.engine_rpm`).
//! Lookups by name always compare base names, the segment after the last
//! dot, so callers never depend on a prefix or on column position.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::reader::{IoError, IoResult};

/// Final path segment of a possibly namespaced column name
pub fn base_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Schema describing the columns a row source yields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSchema {
    /// Column descriptors, in row order
    pub columns: Vec<ColumnDescriptor>,

    /// Number of records, when the source knows it up front
    pub num_records: Option<usize>,

    /// Additional metadata
    pub metadata: HashMap<String, String>,
}

impl DataSchema {
    /// Create a new schema
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            num_records: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the record count
    pub fn with_num_records(mut self, num_records: usize) -> Self {
        self.num_records = Some(num_records);
        self
    }

    /// Get a column by exact name
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Resolve a column by base name
    ///
    /// `engine_rpm` and `root.dev.engine_rpm` both match a column named
    /// `root.dev.engine_rpm`. Fails if no column or more than one column
    /// matches.
    pub fn resolve(&self, name: &str) -> IoResult<usize> {
        let wanted = base_name(name);
        let mut matches = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.base_name() == wanted)
            .map(|(i, _)| i);

        match (matches.next(), matches.next()) {
            (Some(index), None) => Ok(index),
            (None, _) => Err(IoError::ColumnNotFound(name.to_string())),
            (Some(_), Some(_)) => Err(IoError::AmbiguousColumn(name.to_string())),
        }
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

/// Descriptor for a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name, possibly namespaced
    pub name: String,

    /// Data type
    pub dtype: ColumnType,
}

impl ColumnDescriptor {
    /// Create a new column descriptor
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }

    /// Name without namespace prefix
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
        }
    }
}

/// A single typed value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
}

impl Value {
    /// Convert to f64
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Integer(v) => v as f64,
            Value::Float(v) => v,
        }
    }

    /// Interpret as a discrete key
    ///
    /// Floats are accepted only when integral and within the `i64` range.
    pub fn as_key(&self) -> Option<i64> {
        // 2^63 is exact as f64; i64::MAX is not
        const LIMIT: f64 = 9_223_372_036_854_775_808.0;
        match *self {
            Value::Integer(v) => Some(v),
            Value::Float(v) if v.fract() == 0.0 && (-LIMIT..LIMIT).contains(&v) => Some(v as i64),
            Value::Float(_) => None,
        }
    }
}

/// One row from a source, in schema column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Build a row of floats
    pub fn from_f64(values: &[f64]) -> Self {
        Self {
            values: values.iter().map(|&v| Value::Float(v)).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.values.get(index).copied()
    }

    /// Value at `index` as f64
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        self.get(index).map(|v| v.as_f64())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
