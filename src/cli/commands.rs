//! CLI command implementations
//!
//! Every command reads one JSON request, compiles it against the built-in
//! ledger schema and prints the result. Nothing touches a database.

use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::aggregation::{AggregationQuery, FieldAggregation};
use crate::collection::{access_filtered_condition, compile_query, AccessRights, EngineConfig, QueryRequest};
use crate::filter::{split_or, FieldSelection, FilterError, QueryParams};
use crate::observability::{Logger, Severity};
use crate::planner::{classify_query, describe_fields, explain_branch, OrderBy};
use crate::schema::{collection_schema, default_indexes, CollectionSchema};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

fn empty_filter() -> Value {
    json!({})
}

/// `compile` / `explain` request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInput {
    pub collection: String,
    #[serde(default = "empty_filter")]
    pub filter: Value,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Selection text, e.g. `"id seq_no signatures { node_id }"`
    #[serde(default)]
    pub selection: Option<String>,
    #[serde(default)]
    pub restrict_to_accounts: Vec<String>,
}

/// `aggregate` request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateInput {
    pub collection: String,
    #[serde(default = "empty_filter")]
    pub filter: Value,
    #[serde(default)]
    pub fields: Vec<FieldAggregation>,
    #[serde(default)]
    pub restrict_to_accounts: Vec<String>,
}

/// Main CLI entry point; the only function main.rs calls
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    if let Some(severity) = Severity::parse(&cli.log_level) {
        Logger::set_min_severity(severity);
    }
    let outcome = load_config(cli.config.as_deref())
        .and_then(|config| read_request().and_then(|request| run_command(cli.command, &config, request)));
    match outcome {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

pub fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::from_json_file(path)?),
        None => Ok(EngineConfig::default()),
    }
}

pub fn run_command(command: Command, config: &EngineConfig, request: Value) -> CliResult<Value> {
    match command {
        Command::Compile => compile(config, serde_json::from_value(request)?),
        Command::Explain => explain(config, serde_json::from_value(request)?),
        Command::Aggregate => aggregate(serde_json::from_value(request)?),
    }
}

fn schema_for(collection: &str) -> CliResult<CollectionSchema> {
    collection_schema(collection)
        .ok_or_else(|| CliError::invalid_request(format!("Unknown collection: {}", collection)))
}

fn access_for(accounts: &[String]) -> AccessRights {
    if accounts.is_empty() {
        AccessRights::unrestricted()
    } else {
        AccessRights::restricted(accounts.iter().cloned())
    }
}

fn account_fields(schema: &CollectionSchema) -> Vec<String> {
    schema.account_fields.iter().map(|f| f.to_string()).collect()
}

fn query_request(input: &QueryInput) -> CliResult<QueryRequest> {
    let selection = match &input.selection {
        Some(text) => FieldSelection::parse(text)?,
        None => Vec::new(),
    };
    let mut request = QueryRequest::new(input.filter.clone())
        .order_by(input.order_by.clone())
        .selection(selection);
    request.limit = input.limit;
    Ok(request)
}

/// Query text and bound parameters
pub fn compile(config: &EngineConfig, input: QueryInput) -> CliResult<Value> {
    let schema = schema_for(&input.collection)?;
    let compiled = compile_query(
        schema.name,
        &schema.doc_type,
        &query_request(&input)?,
        &access_for(&input.restrict_to_accounts),
        &account_fields(&schema),
        config,
    )?;
    Ok(json!({
        "text": compiled.text,
        "params": compiled.params,
    }))
}

/// Compiled query plus the fast/slow verdict against the default catalog
pub fn explain(config: &EngineConfig, input: QueryInput) -> CliResult<Value> {
    let schema = schema_for(&input.collection)?;
    let compiled = compile_query(
        schema.name,
        &schema.doc_type,
        &query_request(&input)?,
        &access_for(&input.restrict_to_accounts),
        &account_fields(&schema),
        config,
    )?;

    let indexes = default_indexes(schema.name);
    let class = classify_query(&indexes, &schema.doc_type, &input.filter, &input.order_by)?;
    let branches = split_or(&input.filter)
        .iter()
        .map(|branch| explain_branch(&schema.doc_type, branch).map(|fields| describe_fields(&fields)))
        .collect::<Result<Vec<_>, FilterError>>()?;

    Ok(json!({
        "text": compiled.text,
        "params": compiled.params,
        "fast": class.is_fast(),
        "reason": class.reason().map(|r| r.to_string()),
        "branches": branches,
        "indexes": indexes.iter().map(|i| i.to_string()).collect::<Vec<_>>(),
    }))
}

/// Aggregation text and bound parameters
pub fn aggregate(input: AggregateInput) -> CliResult<Value> {
    let schema = schema_for(&input.collection)?;
    let struct_type = schema
        .doc_type
        .as_struct()
        .ok_or_else(|| CliError::invalid_request("Collection has no document type"))?;
    let mut params = QueryParams::new();
    let (_, condition) = access_filtered_condition(
        &schema.doc_type,
        &mut params,
        &input.filter,
        &access_for(&input.restrict_to_accounts),
        &account_fields(&schema),
    )?;
    let aggregation =
        AggregationQuery::compile(schema.name, struct_type, &condition, params.into_values(), &input.fields)?;
    Ok(json!({
        "text": aggregation.text,
        "params": aggregation.params,
    }))
}
