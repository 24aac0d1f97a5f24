//! Index catalog metadata

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One declared index: an ordered list of field paths
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexInfo {
    pub fields: Vec<String>,
}

impl IndexInfo {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses `"a, b, c"` into an index
    pub fn parse(text: &str) -> Self {
        Self::new(text.split(',').map(str::trim).filter(|f| !f.is_empty()))
    }
}

impl fmt::Display for IndexInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.join(", "))
    }
}

/// Compares two catalogs as unordered sets of field lists
pub fn same_index_set(a: &[IndexInfo], b: &[IndexInfo]) -> bool {
    let a: HashSet<&IndexInfo> = a.iter().collect();
    let b: HashSet<&IndexInfo> = b.iter().collect();
    a == b
}
