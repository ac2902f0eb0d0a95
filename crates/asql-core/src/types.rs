//! Statement parameters and results exchanged with a driver

/// A parameter bound to a statement, or a column value in a result row
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

/// One result row, values in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Result of a statement sent through a connection.
///
/// Decoding is done by the driver; the pool only moves these around.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Column names, in select order
    pub columns: Vec<String>,
    /// Returned rows (empty for updates)
    pub rows: Vec<Row>,
    /// Number of rows affected by an update
    pub rows_affected: u64,
}

impl QueryResult {
    /// Create a result describing an update
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    /// Number of rows returned
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
