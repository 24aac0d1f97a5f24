//! CLI-specific error types

use std::fmt;
use std::io;

use crate::aggregation::AggregationError;
use crate::collection::QueryError;
use crate::filter::FilterError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Malformed request object
    InvalidRequest,
    /// Request rejected by the engine; carries the engine's code
    Rejected(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "LQ_CLI_CONFIG_ERROR",
            Self::IoError => "LQ_CLI_IO_ERROR",
            Self::InvalidRequest => "LQ_CLI_INVALID_REQUEST",
            Self::Rejected(code) => *code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidRequest, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_request(format!("JSON error: {}", e))
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::Config(message) => Self::config_error(message),
            other => Self::new(CliErrorCode::Rejected(other.code()), other.to_string()),
        }
    }
}

impl From<FilterError> for CliError {
    fn from(e: FilterError) -> Self {
        QueryError::from(e).into()
    }
}

impl From<AggregationError> for CliError {
    fn from(e: AggregationError) -> Self {
        QueryError::from(e).into()
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
