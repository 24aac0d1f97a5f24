//! Bound parameters and filter explanation
//!
//! A single `QueryParams` instance is shared by every nested compilation
//! step of one filter, so all values land in one parameter set and the
//! generated names (`v1`, `v2`, ...) are unique within the query text.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::ops::CompareOp;

/// Placeholder used for the current item inside array expansions
pub const CURRENT: &str = "CURRENT";

/// Joins two dotted paths, tolerating leading/trailing dots
pub fn combine_path(base: &str, path: &str) -> String {
    let b = base.strip_suffix('.').unwrap_or(base);
    let p = path.strip_prefix('.').unwrap_or(path);
    let sep = if !p.is_empty() && !b.is_empty() { "." } else { "" };
    format!("{}{}{}", b, sep, p)
}

/// Operators applied to one logical field path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldExplanation {
    pub operations: BTreeSet<CompareOp>,
}

impl FieldExplanation {
    /// True when the set is exactly `{op}`
    pub fn is_only(&self, op: CompareOp) -> bool {
        self.operations.len() == 1 && self.operations.contains(&op)
    }

    /// True when the set is exactly `{a, b}`
    pub fn is_pair(&self, a: CompareOp, b: CompareOp) -> bool {
        self.operations.len() == 2 && self.operations.contains(&a) && self.operations.contains(&b)
    }
}

/// Per-field record of comparison operators used in one compilation pass
#[derive(Debug, Clone, Default)]
pub struct QueryExplanation {
    parents: Vec<String>,
    fields: BTreeMap<String, FieldExplanation>,
}

impl QueryExplanation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites a `CURRENT`-relative path to its logical absolute path
    pub fn normalize_path(&self, path: &str) -> String {
        match (path.strip_prefix(CURRENT), self.parents.last()) {
            (Some(rest), Some(parent)) => combine_path(parent, rest),
            _ => path.to_string(),
        }
    }

    fn explain(&mut self, path: &str, op: CompareOp) {
        let normalized = self.normalize_path(path);
        self.fields
            .entry(normalized)
            .or_default()
            .operations
            .insert(op);
    }

    /// Explained fields keyed by absolute path
    pub fn fields(&self) -> &BTreeMap<String, FieldExplanation> {
        &self.fields
    }

    /// Explained fields with the root document alias stripped
    /// (`doc.balance` -> `balance`)
    pub fn fields_relative_to(&self, root: &str) -> BTreeMap<String, FieldExplanation> {
        let prefix = format!("{}.", root);
        self.fields
            .iter()
            .map(|(path, ops)| {
                let relative = path.strip_prefix(&prefix).unwrap_or(path);
                (relative.to_string(), ops.clone())
            })
            .collect()
    }
}

/// Positional bind values for one compiled query
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    count: usize,
    values: Map<String, Value>,
    explanation: Option<QueryExplanation>,
}

impl QueryParams {
    /// Creates a binder without explanation
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a binder that records per-field operators
    pub fn with_explanation() -> Self {
        Self {
            explanation: Some(QueryExplanation::new()),
            ..Self::default()
        }
    }

    /// Resets numbering and bound values
    pub fn clear(&mut self) {
        self.count = 0;
        self.values = Map::new();
    }

    /// Binds a value and returns its fresh parameter name
    pub fn add(&mut self, value: Value) -> String {
        self.count += 1;
        let name = format!("v{}", self.count);
        self.values.insert(name.clone(), value);
        name
    }

    /// Name that the next `add` call will return
    pub fn next_name(&self) -> String {
        format!("v{}", self.count + 1)
    }

    /// Records an operator against a field path (no-op unless explaining)
    pub fn explain(&mut self, path: &str, op: CompareOp) {
        if let Some(explanation) = self.explanation.as_mut() {
            explanation.explain(path, op);
        }
    }

    /// Enters an array expansion rooted at `path`
    pub(crate) fn enter_array(&mut self, path: &str) {
        if let Some(explanation) = self.explanation.as_mut() {
            let parent = format!("{}[*]", explanation.normalize_path(path));
            explanation.parents.push(parent);
        }
    }

    /// Leaves the innermost array expansion
    pub(crate) fn leave_array(&mut self) {
        if let Some(explanation) = self.explanation.as_mut() {
            explanation.parents.pop();
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    pub fn explanation(&self) -> Option<&QueryExplanation> {
        self.explanation.as_ref()
    }

    pub fn take_explanation(&mut self) -> Option<QueryExplanation> {
        self.explanation.take()
    }
}
