use thiserror::Error;

use crate::database::DatabaseError;

/// Failure of one natural-language query, by pipeline stage
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("SQL generation failed: {0}")]
    Generation(String),

    /// Rejected statements are never executed
    #[error("SQL validation failed: {reason}")]
    Validation { sql: String, reason: String },

    #[error("Query execution failed: {source}")]
    Execution {
        sql: String,
        #[source]
        source: DatabaseError,
    },

    #[error("System error: {0}")]
    System(String),
}

impl QueryError {
    /// The SQL involved, when the failure happened after extraction
    pub fn sql(&self) -> Option<&str> {
        match self {
            QueryError::Validation { sql, .. } | QueryError::Execution { sql, .. } => Some(sql),
            QueryError::Generation(_) | QueryError::System(_) => None,
        }
    }

    /// Short stage label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Generation(_) => "generation_failed",
            QueryError::Validation { .. } => "validation_failed",
            QueryError::Execution { .. } => "execution_failed",
            QueryError::System(_) => "system_error",
        }
    }
}
