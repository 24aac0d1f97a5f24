//! Query compilation for one collection
//!
//! A request is turned into
//! `FOR doc IN <c> FILTER <cond> SORT <keys> LIMIT <n> RETURN { ... }`
//! plus bound parameters. The same filter and access rule are kept as a
//! [`DocumentMatcher`] so change-feed documents can be tested in memory.

use serde_json::{Map, Value};

use super::access::AccessRights;
use super::config::EngineConfig;
use super::errors::QueryResult;
use crate::filter::{
    and_conditions, combine_return_expressions, FieldSelection, FilterError, QueryParams,
    TypeRef,
};
use crate::planner::{sort_section, OrderBy};

/// Caller-side query parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub filter: Value,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    /// Wait-for timeout; `None` or zero executes once
    pub timeout_ms: Option<u64>,
    pub selection: Vec<FieldSelection>,
}

impl QueryRequest {
    pub fn new(filter: Value) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn order_by(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn selection(mut self, selection: Vec<FieldSelection>) -> Self {
        self.selection = selection;
        self
    }

    pub fn is_wait_for(&self) -> bool {
        self.timeout_ms.map_or(false, |t| t > 0)
    }
}

/// Compiled query ready for a driver
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub text: String,
    pub params: Map<String, Value>,
    /// Filter condition alone; keys the classification cache
    pub filter_condition: String,
    /// Filter and access conditions combined
    pub condition: String,
    pub selection: Vec<FieldSelection>,
    pub limit: usize,
}

impl CompiledQuery {
    /// True when no document can match
    pub fn is_statically_false(&self) -> bool {
        self.condition == "false"
    }
}

/// Filter condition combined with the caller's access condition
pub fn access_filtered_condition(
    doc_type: &TypeRef,
    params: &mut QueryParams,
    filter: &Value,
    access: &AccessRights,
    account_fields: &[String],
) -> QueryResult<(String, String)> {
    let filter_condition = doc_type.filter_condition(params, "doc", filter)?;
    let condition = match access.condition(params, account_fields) {
        Some(access_condition) => and_conditions(vec![filter_condition.clone(), access_condition]),
        None => filter_condition.clone(),
    };
    Ok((filter_condition, condition))
}

/// Compiles `request` against `doc_type`
pub fn compile_query(
    collection: &str,
    doc_type: &TypeRef,
    request: &QueryRequest,
    access: &AccessRights,
    account_fields: &[String],
    config: &EngineConfig,
) -> QueryResult<CompiledQuery> {
    let struct_type = doc_type
        .as_struct()
        .ok_or_else(|| FilterError::invalid_field(collection))?;

    let mut params = QueryParams::new();
    let (filter_condition, condition) =
        access_filtered_condition(doc_type, &mut params, &request.filter, access, account_fields)?;

    let mut selection = request.selection.clone();
    for order in &request.order_by {
        FieldSelection::add_path(&mut selection, &order.path);
    }
    let selection = struct_type.prune_selection(&selection);

    let mut expressions = vec![("_key".to_string(), "doc._key".to_string())];
    for (name, expr) in struct_type.return_expressions("doc", &selection)? {
        if !expressions.iter().any(|(existing, _)| *existing == name) {
            expressions.push((name, expr));
        }
    }

    let limit = config.result_limit(request.limit);
    let mut parts = vec![format!("FOR doc IN {}", collection)];
    if condition != "true" {
        parts.push(format!("FILTER {}", condition));
    }
    let sort = sort_section(&request.order_by);
    if !sort.is_empty() {
        parts.push(sort);
    }
    parts.push(format!("LIMIT {}", limit));
    parts.push(format!("RETURN {}", combine_return_expressions(&expressions)));

    Ok(CompiledQuery {
        text: parts.join(" "),
        params: params.into_values(),
        filter_condition,
        condition,
        selection,
        limit,
    })
}

/// Key lookup used to resolve joined documents
pub fn keys_query(collection: &str, keys: &[String]) -> (String, Map<String, Value>) {
    let mut params = QueryParams::new();
    let name = params.add(Value::Array(keys.iter().cloned().map(Value::from).collect()));
    (
        format!("FOR doc IN {} FILTER doc._key IN @{} RETURN doc", collection, name),
        params.into_values(),
    )
}

/// In-memory counterpart of a compiled query
#[derive(Debug, Clone)]
pub struct DocumentMatcher {
    doc_type: TypeRef,
    filter: Value,
    access: AccessRights,
    account_fields: Vec<String>,
    selection: Vec<FieldSelection>,
}

impl DocumentMatcher {
    pub fn new(
        doc_type: TypeRef,
        filter: Value,
        access: AccessRights,
        account_fields: Vec<String>,
        selection: Vec<FieldSelection>,
    ) -> Self {
        Self {
            doc_type,
            filter,
            access,
            account_fields,
            selection,
        }
    }

    /// Filter and access check; a filter error counts as no match
    pub fn matches(&self, document: &Value) -> bool {
        self.access.test(document, &self.account_fields)
            && self
                .doc_type
                .test_document(document, &self.filter)
                .unwrap_or(false)
    }

    /// The shape the compiled RETURN gives the same document: `_key` first,
    /// then the selected fields
    pub fn project(&self, document: &Value) -> Value {
        let Some(struct_type) = self.doc_type.as_struct() else {
            return document.clone();
        };
        let mut projected = Map::new();
        projected.insert(
            "_key".to_string(),
            document.get("_key").cloned().unwrap_or(Value::Null),
        );
        for (name, value) in struct_type.returned_fields(document, &self.selection) {
            projected.entry(name).or_insert(value);
        }
        Value::Object(projected)
    }

    /// Projected document when it matches
    pub fn accept(&self, document: &Value) -> Option<Value> {
        self.matches(document).then(|| self.project(document))
    }
}
