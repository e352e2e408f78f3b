//! Database boundary consumed after validation

use thiserror::Error;

use crate::value::{Record, Value};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("{0}")]
    Query(String),
}

/// What a statement produced: a row set, or a single bare value
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Rows(Vec<Record>),
    Scalar(Value),
}

/// Executes validated, read-only SQL.
///
/// Implementations block; async callers run them on the blocking pool.
pub trait Database: Send + Sync {
    fn execute(&self, sql: &str) -> Result<QueryOutput, DatabaseError>;
}
