//! # Change Events
//!
//! Documents observed on the database change feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of observed change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Insert => write!(f, "INSERT"),
            ChangeKind::Update => write!(f, "UPDATE"),
        }
    }
}

/// One inserted or updated document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: String,
    pub kind: ChangeKind,
    pub document: Value,
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn insert(collection: impl Into<String>, document: Value) -> Self {
        Self {
            collection: collection.into(),
            kind: ChangeKind::Insert,
            document,
            observed_at: Utc::now(),
        }
    }

    pub fn update(collection: impl Into<String>, document: Value) -> Self {
        Self {
            kind: ChangeKind::Update,
            ..Self::insert(collection, document)
        }
    }

    /// Document key, if present
    pub fn key(&self) -> Option<&str> {
        self.document.get("_key").and_then(Value::as_str)
    }
}
