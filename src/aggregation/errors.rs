//! Aggregation error types
//!
//! Error codes:
//! - LQ_AGGREGATION_INVALID_FIELD (REJECT)
//! - LQ_AGGREGATION_UNSUPPORTED_FUNCTION (REJECT)
//! - LQ_AGGREGATION_INVALID_FILTER (REJECT)
//! - LQ_AGGREGATION_RESULT (ERROR)

use std::fmt;

use crate::filter::FilterError;

/// Severity levels for aggregation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected before execution
    Reject,
    /// Unexpected result from the database
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Aggregation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationErrorCode {
    InvalidField,
    UnsupportedFunction,
    InvalidFilter,
    InvalidResult,
}

impl AggregationErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            AggregationErrorCode::InvalidField => "LQ_AGGREGATION_INVALID_FIELD",
            AggregationErrorCode::UnsupportedFunction => "LQ_AGGREGATION_UNSUPPORTED_FUNCTION",
            AggregationErrorCode::InvalidFilter => "LQ_AGGREGATION_INVALID_FILTER",
            AggregationErrorCode::InvalidResult => "LQ_AGGREGATION_RESULT",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AggregationErrorCode::InvalidResult => Severity::Error,
            _ => Severity::Reject,
        }
    }
}

/// Aggregation error with context
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationError {
    code: AggregationErrorCode,
    message: String,
    field: Option<String>,
}

impl AggregationError {
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            code: AggregationErrorCode::InvalidField,
            message: format!("Field '{}' can not be aggregated: {}", f, reason.into()),
            field: Some(f),
        }
    }

    pub fn unsupported_function(field: impl Into<String>, function: &str) -> Self {
        let f = field.into();
        Self {
            code: AggregationErrorCode::UnsupportedFunction,
            message: format!("Function {} is not supported for field '{}'", function, f),
            field: Some(f),
        }
    }

    pub fn invalid_result(reason: impl Into<String>) -> Self {
        Self {
            code: AggregationErrorCode::InvalidResult,
            message: reason.into(),
            field: None,
        }
    }

    pub fn code(&self) -> AggregationErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl From<FilterError> for AggregationError {
    fn from(err: FilterError) -> Self {
        Self {
            code: AggregationErrorCode::InvalidFilter,
            message: err.message().to_string(),
            field: err.field().map(str::to_string),
        }
    }
}

impl fmt::Display for AggregationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for AggregationError {}

/// Result type for aggregation operations
pub type AggregationResult<T> = Result<T, AggregationError>;
