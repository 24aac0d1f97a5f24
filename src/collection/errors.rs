//! Collection engine errors
//!
//! Compile and access errors are raised before any database call. Driver
//! failures are split into transport faults (masked as `Unavailable`) and
//! query failures (original message kept).

use thiserror::Error;

use super::driver::{DriverError, DriverErrorKind};
use crate::aggregation::AggregationError;
use crate::filter::FilterError;

/// Result type for collection operations
pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("{0}")]
    Filter(#[from] FilterError),

    #[error("{0}")]
    Aggregation(#[from] AggregationError),

    #[error("Access denied")]
    AccessDenied,

    #[error("Multiple access keys are not allowed in one request")]
    MultipleAccessKeys,

    #[error("Slow queries are disabled: {0}")]
    SlowQueriesDisabled(String),

    #[error("Service temporarily unavailable")]
    Unavailable,

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Filter(e) => e.code().code(),
            QueryError::Aggregation(e) => e.code().code(),
            QueryError::AccessDenied => "LQ_ACCESS_DENIED",
            QueryError::MultipleAccessKeys => "LQ_MULTIPLE_ACCESS_KEYS",
            QueryError::SlowQueriesDisabled(_) => "LQ_SLOW_QUERIES_DISABLED",
            QueryError::Unavailable => "LQ_UNAVAILABLE",
            QueryError::Execution(_) => "LQ_EXECUTION_FAILED",
            QueryError::UnknownCollection(_) => "LQ_UNKNOWN_COLLECTION",
            QueryError::Config(_) => "LQ_CONFIG_INVALID",
        }
    }

    /// True for errors raised before the database was contacted
    pub fn is_rejection(&self) -> bool {
        !matches!(self, QueryError::Unavailable | QueryError::Execution(_))
    }
}

impl From<DriverError> for QueryError {
    fn from(err: DriverError) -> Self {
        match err.kind {
            DriverErrorKind::Transport => QueryError::Unavailable,
            DriverErrorKind::Query => QueryError::Execution(err.message),
        }
    }
}
