//! Aggregation query compiler
//!
//! Produces `FOR doc IN c FILTER .. COLLECT AGGREGATE a0 = .., a1 = ..
//! RETURN [a0, a1]` together with one result converter per requested field.
//! Wide integers are summed as separate high and low 32-bit halves because
//! the database's native numbers cannot hold their full range.

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Zero};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{AggregationError, AggregationResult};
use crate::filter::{
    resolve_big_uint, BigNumberFormat, BigUIntWidth, FilterType, QueryParams, StructType,
};

/// Aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregationFn {
    #[default]
    Count,
    Min,
    Max,
    Sum,
    Average,
}

impl AggregationFn {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationFn::Count => "COUNT",
            AggregationFn::Min => "MIN",
            AggregationFn::Max => "MAX",
            AggregationFn::Sum => "SUM",
            AggregationFn::Average => "AVERAGE",
        }
    }
}

/// One requested aggregate
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldAggregation {
    #[serde(default)]
    pub field: String,
    #[serde(default, rename = "fn")]
    pub function: AggregationFn,
}

impl FieldAggregation {
    pub fn new(field: impl Into<String>, function: AggregationFn) -> Self {
        Self {
            field: field.into(),
            function,
        }
    }

    pub fn count() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Number,
    BigUInt(BigUIntWidth),
    Other,
}

#[derive(Debug)]
struct ResolvedField {
    /// `None` for fields without a storage column
    storage: Option<String>,
    kind: ValueKind,
    is_array: bool,
}

fn value_kind(ty: &FilterType) -> ValueKind {
    match ty {
        FilterType::Scalar(kind) if kind.is_numeric() => ValueKind::Number,
        FilterType::BigUInt(width) => ValueKind::BigUInt(*width),
        _ => ValueKind::Other,
    }
}

fn resolve_field(doc_type: &StructType, field: &str) -> AggregationResult<ResolvedField> {
    let names: Vec<&str> = field.split('.').filter(|n| !n.is_empty()).collect();
    let mut current = doc_type;
    let mut path = "doc".to_string();
    let mut is_array = false;

    for (i, name) in names.iter().enumerate() {
        let last = i + 1 == names.len();
        let ty = current
            .field(name)
            .ok_or_else(|| AggregationError::invalid_field(field, "unknown field"))?;
        let storage = if current.is_collection() && *name == "id" {
            "_key"
        } else {
            name
        };
        path = format!("{}.{}", path, storage);

        let nested = match ty.as_ref() {
            FilterType::Struct(inner) => Some(inner),
            FilterType::Array(array) => {
                is_array = true;
                let item = array.item();
                if last {
                    return Ok(ResolvedField {
                        storage: Some(path),
                        kind: value_kind(item),
                        is_array,
                    });
                }
                path.push_str("[*]");
                item.as_struct()
            }
            FilterType::EnumName(_)
            | FilterType::StringCompanion { .. }
            | FilterType::Join(_)
            | FilterType::JoinArray(_) => {
                if !last {
                    return Err(AggregationError::invalid_field(field, "unknown field"));
                }
                return Ok(ResolvedField {
                    storage: None,
                    kind: ValueKind::Other,
                    is_array,
                });
            }
            scalar => {
                if !last {
                    return Err(AggregationError::invalid_field(field, "unknown field"));
                }
                return Ok(ResolvedField {
                    storage: Some(path),
                    kind: value_kind(scalar),
                    is_array,
                });
            }
        };
        match nested {
            Some(inner) if !last => current = inner,
            Some(_) => {
                return Ok(ResolvedField {
                    storage: Some(path),
                    kind: ValueKind::Other,
                    is_array,
                })
            }
            None => return Err(AggregationError::invalid_field(field, "unknown field")),
        }
    }

    Err(AggregationError::invalid_field(field, "field is required"))
}

/// Restores the caller-facing value from raw aggregate results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultConverter {
    Plain,
    BigMinMax(BigUIntWidth),
    BigSum,
    BigAverage,
}

impl ResultConverter {
    fn arity(&self) -> usize {
        match self {
            ResultConverter::Plain | ResultConverter::BigMinMax(_) => 1,
            ResultConverter::BigSum => 2,
            ResultConverter::BigAverage => 3,
        }
    }

    fn empty_value(&self, function: AggregationFn) -> Value {
        match function {
            AggregationFn::Count => Value::from(0),
            _ => Value::Null,
        }
    }

    fn convert(&self, values: &[Value]) -> AggregationResult<Value> {
        match self {
            ResultConverter::Plain => Ok(values[0].clone()),
            ResultConverter::BigMinMax(width) => {
                resolve_big_uint(*width, &values[0], BigNumberFormat::Dec)
                    .map_err(|e| AggregationError::invalid_result(e.message().to_string()))
            }
            ResultConverter::BigSum => {
                let sum = join_halves(&values[0], &values[1])?;
                Ok(Value::String(sum.to_string()))
            }
            ResultConverter::BigAverage => {
                let sum = join_halves(&values[0], &values[1])?;
                let count = number_to_big(&values[2])?;
                if count.is_zero() {
                    return Ok(Value::Null);
                }
                Ok(Value::String((sum / count).to_string()))
            }
        }
    }
}

fn number_to_big(value: &Value) -> AggregationResult<BigInt> {
    match value {
        Value::Null => Ok(BigInt::zero()),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(BigInt::from(u))
            } else if let Some(i) = n.as_i64() {
                Ok(BigInt::from(i))
            } else {
                n.as_f64()
                    .and_then(|f| BigInt::from_f64(f.trunc()))
                    .ok_or_else(|| AggregationError::invalid_result(format!("invalid number {}", n)))
            }
        }
        other => Err(AggregationError::invalid_result(format!(
            "expected a number, got {}",
            other
        ))),
    }
}

fn join_halves(high: &Value, low: &Value) -> AggregationResult<BigInt> {
    let high = number_to_big(high)?;
    let low = number_to_big(low)?;
    Ok((high << 32) + low)
}

fn high_part(path: &str, prefix: usize) -> String {
    format!(
        "TO_NUMBER(CONCAT(\"0x\", SUBSTRING({p}, {n}, LENGTH({p}) - {n} - 8)))",
        p = path,
        n = prefix
    )
}

fn low_part(path: &str, prefix: usize) -> String {
    format!(
        "TO_NUMBER(CONCAT(\"0x\", RIGHT(SUBSTRING({p}, {n}), 8)))",
        p = path,
        n = prefix
    )
}

/// Compiled aggregation with its result converters
#[derive(Debug, Clone)]
pub struct AggregationQuery {
    pub text: String,
    pub params: Map<String, Value>,
    converters: Vec<(AggregationFn, ResultConverter)>,
}

impl AggregationQuery {
    /// Compiles aggregates over documents matching an already compiled
    /// condition
    pub fn compile(
        collection: &str,
        doc_type: &StructType,
        condition: &str,
        params: Map<String, Value>,
        fields: &[FieldAggregation],
    ) -> AggregationResult<Self> {
        let default_fields = [FieldAggregation::count()];
        let fields = if fields.is_empty() {
            &default_fields[..]
        } else {
            fields
        };

        let mut expressions: Vec<String> = Vec::new();
        let mut converters = Vec::new();
        let mut count_only = true;

        for aggregation in fields {
            let function = aggregation.function;
            if aggregation.field.is_empty() {
                if function != AggregationFn::Count {
                    return Err(AggregationError::invalid_field("", "field is required"));
                }
                expressions.push("COUNT(doc)".to_string());
                converters.push((function, ResultConverter::Plain));
                continue;
            }

            let resolved = resolve_field(doc_type, &aggregation.field)?;
            if function == AggregationFn::Count {
                match (&resolved.storage, resolved.is_array) {
                    (Some(path), true) => {
                        count_only = false;
                        expressions.push(format!("SUM(LENGTH({}))", path));
                    }
                    _ => expressions.push("COUNT(doc)".to_string()),
                }
                converters.push((function, ResultConverter::Plain));
                continue;
            }

            count_only = false;
            let path = resolved.storage.as_deref().ok_or_else(|| {
                AggregationError::invalid_field(&aggregation.field, "field has no storage path")
            })?;
            if resolved.is_array {
                return Err(AggregationError::unsupported_function(
                    &aggregation.field,
                    function.as_str(),
                ));
            }
            match (resolved.kind, function) {
                (ValueKind::Number, _) => {
                    expressions.push(format!("{}({})", function.as_str(), path));
                    converters.push((function, ResultConverter::Plain));
                }
                (ValueKind::BigUInt(width), AggregationFn::Min | AggregationFn::Max) => {
                    expressions.push(format!("{}({})", function.as_str(), path));
                    converters.push((function, ResultConverter::BigMinMax(width)));
                }
                (ValueKind::BigUInt(width), AggregationFn::Sum | AggregationFn::Average) => {
                    let prefix = width.prefix_len();
                    expressions.push(format!("SUM({})", high_part(path, prefix)));
                    expressions.push(format!("SUM({})", low_part(path, prefix)));
                    if function == AggregationFn::Average {
                        expressions.push("COUNT(doc)".to_string());
                        converters.push((function, ResultConverter::BigAverage));
                    } else {
                        converters.push((function, ResultConverter::BigSum));
                    }
                }
                _ => {
                    return Err(AggregationError::unsupported_function(
                        &aggregation.field,
                        function.as_str(),
                    ))
                }
            }
        }

        let unconditioned = condition.is_empty() || condition == "true";
        let text = if unconditioned && count_only {
            let lengths = vec![format!("LENGTH({})", collection); expressions.len()];
            format!("RETURN [{}]", lengths.join(", "))
        } else {
            let mut parts = vec![format!("FOR doc IN {}", collection)];
            if !unconditioned {
                parts.push(format!("FILTER {}", condition));
            }
            let names: Vec<String> = (0..expressions.len()).map(|i| format!("a{}", i)).collect();
            let aggregates: Vec<String> = names
                .iter()
                .zip(&expressions)
                .map(|(name, expr)| format!("{} = {}", name, expr))
                .collect();
            parts.push(format!("COLLECT AGGREGATE {}", aggregates.join(", ")));
            parts.push(format!("RETURN [{}]", names.join(", ")));
            parts.join(" ")
        };

        Ok(Self {
            text,
            params,
            converters,
        })
    }

    /// Compiles the filter and the aggregates together
    pub fn from_filter(
        collection: &str,
        doc_type: &FilterType,
        filter: &Value,
        fields: &[FieldAggregation],
    ) -> AggregationResult<Self> {
        let struct_type = doc_type
            .as_struct()
            .ok_or_else(|| AggregationError::invalid_field(collection, "not a document type"))?;
        let mut params = QueryParams::new();
        let condition = doc_type.filter_condition(&mut params, "doc", filter)?;
        Self::compile(collection, struct_type, &condition, params.into_values(), fields)
    }

    /// Number of raw values the query returns per row
    pub fn raw_width(&self) -> usize {
        self.converters.iter().map(|(_, c)| c.arity()).sum()
    }

    /// Converts the single result row into one value per requested field
    pub fn convert_results(&self, rows: &[Value]) -> AggregationResult<Vec<Value>> {
        let row = rows
            .first()
            .and_then(Value::as_array)
            .ok_or_else(|| AggregationError::invalid_result("expected one result row"))?;
        if row.len() < self.raw_width() {
            return Err(AggregationError::invalid_result(format!(
                "expected {} values, got {}",
                self.raw_width(),
                row.len()
            )));
        }
        let mut results = Vec::with_capacity(self.converters.len());
        let mut offset = 0;
        for (_, converter) in &self.converters {
            let arity = converter.arity();
            results.push(converter.convert(&row[offset..offset + arity])?);
            offset += arity;
        }
        Ok(results)
    }

    /// Results for a statically empty document set
    pub fn empty_results(&self) -> Vec<Value> {
        self.converters
            .iter()
            .map(|(function, converter)| converter.empty_value(*function))
            .collect()
    }
}
