//! Scalar comparison operators
//!
//! Each operator has two renditions that must agree: a condition fragment
//! for the query text and a direct test against an in-memory value.
//! In-memory comparisons follow the backing engine's type order:
//! null < bool < number < string < array < object.

use std::cmp::Ordering;

use serde_json::Value;

use super::errors::{FilterError, FilterResult};
use super::params::QueryParams;

/// Comparison operator as it appears in query text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Applies the operator to two in-memory values
    pub fn holds(&self, value: &Value, bound: &Value) -> bool {
        let ordering = compare_values(value, bound);
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// Filter operator key accepted inside a scalar filter object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl ScalarOp {
    /// Resolves a filter key (`eq`, `notIn`, ...)
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "eq" => Some(ScalarOp::Eq),
            "ne" => Some(ScalarOp::Ne),
            "lt" => Some(ScalarOp::Lt),
            "le" => Some(ScalarOp::Le),
            "gt" => Some(ScalarOp::Gt),
            "ge" => Some(ScalarOp::Ge),
            "in" => Some(ScalarOp::In),
            "notIn" => Some(ScalarOp::NotIn),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ScalarOp::In | ScalarOp::NotIn)
    }

    fn compare_op(&self) -> CompareOp {
        match self {
            ScalarOp::Eq | ScalarOp::In => CompareOp::Eq,
            ScalarOp::Ne | ScalarOp::NotIn => CompareOp::Ne,
            ScalarOp::Lt => CompareOp::Lt,
            ScalarOp::Le => CompareOp::Le,
            ScalarOp::Gt => CompareOp::Gt,
            ScalarOp::Ge => CompareOp::Ge,
        }
    }
}

/// Converts a caller-supplied filter operand into its stored form
pub type ValueConverter<'a> = &'a dyn Fn(&Value) -> FilterResult<Value>;

/// Identity conversion for plain scalars
pub fn no_conversion(value: &Value) -> FilterResult<Value> {
    Ok(value.clone())
}

/// Joins conditions with AND; any `false` operand makes the whole
/// conjunction `false`, no operands means `true`.
pub fn and_conditions(conditions: Vec<String>) -> String {
    if conditions.iter().any(|c| c == "false") {
        return "false".to_string();
    }
    combine(conditions, "AND", "true")
}

/// Joins conditions with OR; `false` operands are dropped, no operands
/// means `false`.
pub fn or_conditions(conditions: Vec<String>) -> String {
    let live: Vec<String> = conditions.into_iter().filter(|c| c != "false").collect();
    combine(live, "OR", "false")
}

fn combine(mut conditions: Vec<String>, op: &str, default: &str) -> String {
    match conditions.len() {
        0 => default.to_string(),
        1 => conditions.remove(0),
        _ => format!("({})", conditions.join(&format!(") {} (", op))),
    }
}

/// Compiles one comparison and binds its operand
pub fn condition_op(
    params: &mut QueryParams,
    path: &str,
    op: CompareOp,
    value: Value,
    explain_op: CompareOp,
) -> String {
    params.explain(path, explain_op);
    let name = params.add(value);
    let ordered_key = (path == "_key" || path.ends_with("._key"))
        && !matches!(op, CompareOp::Eq | CompareOp::Ne);
    if ordered_key {
        format!("TO_STRING({}) {} @{}", path, op.as_str(), name)
    } else {
        format!("{} {} @{}", path, op.as_str(), name)
    }
}

fn list_operand<'v>(key: &str, value: &'v Value) -> FilterResult<&'v Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| FilterError::invalid_value(key, "expected a list"))
}

/// Iterates the entries of a filter object, treating null as empty
pub fn filter_entries(filter: &Value) -> FilterResult<Vec<(&String, &Value)>> {
    match filter {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map.iter().collect()),
        other => Err(FilterError::invalid_value(
            other.to_string(),
            "filter must be an object",
        )),
    }
}

/// Compiles a scalar operator filter object (`{ eq: .., in: [..] }`)
pub fn scalar_condition(
    params: &mut QueryParams,
    path: &str,
    filter: &Value,
    convert: ValueConverter<'_>,
) -> FilterResult<String> {
    let mut conditions = Vec::new();
    for (key, operand) in filter_entries(filter)? {
        let op = ScalarOp::from_key(key).ok_or_else(|| FilterError::invalid_field(key))?;
        let condition = if op.is_list() {
            let mut alternatives = Vec::new();
            for item in list_operand(key, operand)? {
                alternatives.push(condition_op(
                    params,
                    path,
                    CompareOp::Eq,
                    convert(item)?,
                    op.compare_op(),
                ));
            }
            let any = or_conditions(alternatives);
            if op == ScalarOp::NotIn {
                format!("NOT ({})", any)
            } else {
                any
            }
        } else {
            condition_op(params, path, op.compare_op(), convert(operand)?, op.compare_op())
        };
        conditions.push(condition);
    }
    Ok(and_conditions(conditions))
}

/// Tests a value against a scalar operator filter object
pub fn scalar_test(value: &Value, filter: &Value, convert: ValueConverter<'_>) -> FilterResult<bool> {
    for (key, operand) in filter_entries(filter)? {
        let op = ScalarOp::from_key(key).ok_or_else(|| FilterError::invalid_field(key))?;
        let passed = if op.is_list() {
            let mut found = false;
            for item in list_operand(key, operand)? {
                if CompareOp::Eq.holds(value, &convert(item)?) {
                    found = true;
                    break;
                }
            }
            if op == ScalarOp::NotIn {
                !found
            } else {
                found
            }
        } else {
            op.compare_op().holds(value, &convert(operand)?)
        };
        if !passed {
            return Ok(false);
        }
    }
    Ok(true)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values matching the backing engine's
/// comparison rules.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (a_rank, b_rank) = (type_rank(a), type_rank(b));
    if a_rank != b_rank {
        return a_rank.cmp(&b_rank);
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(xi), Some(yi)) = (x.as_i64(), y.as_i64()) {
                return xi.cmp(&yi);
            }
            if let (Some(xu), Some(yu)) = (x.as_u64(), y.as_u64()) {
                return xu.cmp(&yu);
            }
            let xf = x.as_f64().unwrap_or(0.0);
            let yf = y.as_f64().unwrap_or(0.0);
            xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            let len = x.len().max(y.len());
            for i in 0..len {
                let ordering = compare_values(
                    x.get(i).unwrap_or(&Value::Null),
                    y.get(i).unwrap_or(&Value::Null),
                );
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        }
        (Value::Object(x), Value::Object(y)) => {
            let mut keys: Vec<&String> = x.keys().chain(y.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let ordering = compare_values(
                    x.get(key).unwrap_or(&Value::Null),
                    y.get(key).unwrap_or(&Value::Null),
                );
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        }
        _ => Ordering::Equal,
    }
}
