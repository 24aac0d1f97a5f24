//! Filter error types
//!
//! Error codes:
//! - LQ_FILTER_INVALID_FIELD (REJECT)
//! - LQ_FILTER_INVALID_VALUE (REJECT)
//! - LQ_FILTER_INVALID_ENUM_NAME (REJECT)
//! - LQ_SELECTION_INVALID (REJECT)
//!
//! All filter errors are raised before any database call is made.

use std::fmt;

/// Severity levels for filter errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Filter error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterErrorCode {
    /// Filter references a key that the type does not declare
    InvalidField,
    /// Filter value has the wrong shape for its operator
    InvalidValue,
    /// Enum name filter references an unknown name
    InvalidEnumName,
    /// Selection references an unknown field or is malformed
    InvalidSelection,
}

impl FilterErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            FilterErrorCode::InvalidField => "LQ_FILTER_INVALID_FIELD",
            FilterErrorCode::InvalidValue => "LQ_FILTER_INVALID_VALUE",
            FilterErrorCode::InvalidEnumName => "LQ_FILTER_INVALID_ENUM_NAME",
            FilterErrorCode::InvalidSelection => "LQ_SELECTION_INVALID",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for FilterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Filter error with context
#[derive(Debug, Clone, PartialEq)]
pub struct FilterError {
    code: FilterErrorCode,
    message: String,
    field: Option<String>,
}

impl FilterError {
    /// Unknown filter key
    pub fn invalid_field(field: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            code: FilterErrorCode::InvalidField,
            message: format!("Invalid filter field: {}", f),
            field: Some(f),
        }
    }

    /// Malformed filter value
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            code: FilterErrorCode::InvalidValue,
            message: format!("Invalid filter value for {}: {}", f, reason.into()),
            field: Some(f),
        }
    }

    /// Unknown enum name
    pub fn invalid_enum_name(field: impl Into<String>, name: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            code: FilterErrorCode::InvalidEnumName,
            message: format!("Invalid value [{}] for {}", name.into(), f),
            field: Some(f),
        }
    }

    /// Unknown or malformed selection
    pub fn invalid_selection(reason: impl Into<String>) -> Self {
        Self {
            code: FilterErrorCode::InvalidSelection,
            message: reason.into(),
            field: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> FilterErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending field if known
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for FilterError {
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

impl std::error::Error for FilterError {}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;
