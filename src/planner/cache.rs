//! Per-collection index catalog and classification cache
//!
//! Verdicts are keyed by the compiled condition text plus the sort order.
//! The whole cache is cleared when the index catalog changes, and a verdict
//! computed against a catalog that has since been replaced is never stored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use super::detector::QueryClass;
use super::index::{same_index_set, IndexInfo};
use super::order::OrderBy;

/// Shared, read-mostly classification state of one collection
#[derive(Debug, Default)]
pub struct QueryClassCache {
    indexes: RwLock<Vec<IndexInfo>>,
    /// Bumped under the catalog write lock on every change
    generation: AtomicU64,
    verdicts: RwLock<HashMap<String, QueryClass>>,
}

impl QueryClassCache {
    pub fn new(indexes: Vec<IndexInfo>) -> Self {
        Self {
            indexes: RwLock::new(indexes),
            generation: AtomicU64::new(0),
            verdicts: RwLock::new(HashMap::new()),
        }
    }

    /// Cache key for one query shape
    pub fn fingerprint(condition: &str, order_by: &[OrderBy]) -> String {
        let order = serde_json::to_string(order_by).unwrap_or_default();
        format!("{}{}", condition, order)
    }

    /// Snapshot of the current catalog
    pub fn indexes(&self) -> Vec<IndexInfo> {
        self.snapshot().0
    }

    /// Catalog together with the generation it belongs to
    fn snapshot(&self) -> (Vec<IndexInfo>, u64) {
        match self.indexes.read() {
            Ok(indexes) => (indexes.clone(), self.generation.load(Ordering::SeqCst)),
            Err(_) => (Vec::new(), self.generation.load(Ordering::SeqCst)),
        }
    }

    /// Number of catalog changes seen so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Replaces the catalog; clears all verdicts and returns true when the
    /// set of indexes actually changed
    pub fn update_indexes(&self, indexes: Vec<IndexInfo>) -> bool {
        let changed = match self.indexes.write() {
            Ok(mut current) => {
                if same_index_set(&current, &indexes) {
                    false
                } else {
                    *current = indexes;
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    true
                }
            }
            Err(_) => false,
        };
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn get(&self, fingerprint: &str) -> Option<QueryClass> {
        self.verdicts
            .read()
            .ok()
            .and_then(|verdicts| verdicts.get(fingerprint).cloned())
    }

    pub fn insert(&self, fingerprint: String, class: QueryClass) {
        if let Ok(mut verdicts) = self.verdicts.write() {
            verdicts.insert(fingerprint, class);
        }
    }

    /// Stores a verdict only if the catalog it was computed against is still
    /// current. Returns whether it was stored.
    pub fn insert_for_generation(&self, fingerprint: String, class: QueryClass, generation: u64) -> bool {
        let Ok(mut verdicts) = self.verdicts.write() else {
            return false;
        };
        // a later catalog change bumps first and clears afterwards, so a
        // verdict stored here under a matching generation is cleared too
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        verdicts.insert(fingerprint, class);
        true
    }

    /// Returns the memoized verdict or computes and stores it
    pub fn get_or_classify<E>(
        &self,
        fingerprint: &str,
        classify: impl FnOnce(&[IndexInfo]) -> Result<QueryClass, E>,
    ) -> Result<QueryClass, E> {
        if let Some(class) = self.get(fingerprint) {
            return Ok(class);
        }
        let (indexes, generation) = self.snapshot();
        let class = classify(&indexes)?;
        self.insert_for_generation(fingerprint.to_string(), class.clone(), generation);
        Ok(class)
    }

    /// Drops every memoized verdict
    pub fn invalidate(&self) {
        if let Ok(mut verdicts) = self.verdicts.write() {
            verdicts.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.verdicts.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
