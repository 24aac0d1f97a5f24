//! Sort orders

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub path: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Sort path with the logical `id` rewritten to `_key`
    pub fn storage_path(&self) -> String {
        storage_path(&self.path)
    }
}

fn id_pattern() -> Option<&'static Regex> {
    static ID_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    ID_PATTERN.get_or_init(|| Regex::new(r"\bid\b").ok()).as_ref()
}

/// Rewrites the first `id` path segment to `_key`
pub fn storage_path(path: &str) -> String {
    match id_pattern() {
        Some(re) => re.replace(path, "_key").into_owned(),
        None => path.to_string(),
    }
}

/// `SORT doc.a, doc.b DESC`, or an empty string when unsorted
pub fn sort_section(order_by: &[OrderBy]) -> String {
    if order_by.is_empty() {
        return String::new();
    }
    let keys: Vec<String> = order_by
        .iter()
        .map(|o| {
            let suffix = match o.direction {
                SortDirection::Desc => " DESC",
                SortDirection::Asc => "",
            };
            format!("doc.{}{}", o.storage_path(), suffix)
        })
        .collect();
    format!("SORT {}", keys.join(", "))
}
