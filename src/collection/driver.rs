//! Database driver seam
//!
//! The engine never talks to the database directly. A driver executes
//! query text with bound parameters and lists a collection's indexes.

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::planner::IndexInfo;

/// Failure class reported by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// Network or system fault; safe to retry later
    Transport,
    /// The database rejected or failed the query itself
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Query,
            message: message.into(),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DriverError {}

/// Executes compiled queries against one database connection
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    async fn execute(&self, text: &str, params: &Map<String, Value>) -> Result<Vec<Value>, DriverError>;

    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexInfo>, DriverError>;
}
