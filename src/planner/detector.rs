//! Slow-query detector
//!
//! Decides, without asking the database, whether a compiled filter and sort
//! order can be served from a declared index. Each OR branch of the filter
//! is analyzed on its own; the query is fast only when every branch is.
//!
//! Branch checks in order:
//! 1. Pure equality on `_key` is always fast
//! 2. Each field's operator set must describe one contiguous index range
//! 3. Some index must lead with exactly the filtered fields
//! 4. If sorted, one of those indexes must also serve the sort order

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value;

use super::index::IndexInfo;
use super::order::OrderBy;
use crate::filter::{split_or, CompareOp, FieldExplanation, FilterResult, FilterType, QueryParams};

/// Why a branch cannot use an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlowReason {
    /// Operator set spans more than one index range
    UnsupportedOperators { field: String, operators: Vec<String> },
    /// No index leads with the filtered fields
    NoIndexForFields { fields: Vec<String> },
    /// No usable index can serve the sort order
    OrderByNotIndexed { order_by: Vec<String> },
}

impl fmt::Display for SlowReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlowReason::UnsupportedOperators { field, operators } => write!(
                f,
                "field {} uses operators [{}] that no single index range can serve",
                field,
                operators.join(", ")
            ),
            SlowReason::NoIndexForFields { fields } => {
                write!(f, "no index starts with fields [{}]", fields.join(", "))
            }
            SlowReason::OrderByNotIndexed { order_by } => {
                write!(f, "no usable index serves sort order [{}]", order_by.join(", "))
            }
        }
    }
}

/// Fast/slow verdict for one query shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryClass {
    Fast,
    Slow(SlowReason),
}

impl QueryClass {
    pub fn is_fast(&self) -> bool {
        matches!(self, QueryClass::Fast)
    }

    pub fn reason(&self) -> Option<&SlowReason> {
        match self {
            QueryClass::Fast => None,
            QueryClass::Slow(reason) => Some(reason),
        }
    }
}

fn supported_operators(field: &FieldExplanation) -> bool {
    use CompareOp::*;
    let single = [Eq, Ne, Gt, Ge, Lt, Le]
        .iter()
        .any(|op| field.is_only(*op));
    single
        || field.is_pair(Gt, Lt)
        || field.is_pair(Gt, Le)
        || field.is_pair(Ge, Lt)
        || field.is_pair(Ge, Le)
}

/// True when the index's leading columns are exactly the filtered fields
pub fn fields_can_use_index(fields: &BTreeMap<String, FieldExplanation>, index: &IndexInfo) -> bool {
    if fields.len() > index.fields.len() {
        return false;
    }
    index.fields[..fields.len()]
        .iter()
        .all(|column| fields.contains_key(column))
}

/// True when walking the index columns consumes every sort key in order,
/// skipping only leading columns pinned by pure equality.
pub fn order_by_can_use_index(
    fields: &BTreeMap<String, FieldExplanation>,
    order_by: &[OrderBy],
    index: &IndexInfo,
) -> bool {
    if order_by.is_empty() {
        return true;
    }
    let paths: Vec<String> = order_by.iter().map(OrderBy::storage_path).collect();
    let mut next = 0;
    for column in &index.fields {
        if *column == paths[next] {
            next += 1;
            if next == paths.len() {
                return true;
            }
        } else {
            if next > 0 {
                return false;
            }
            match fields.get(column) {
                Some(field) if field.is_only(CompareOp::Eq) => {}
                _ => return false,
            }
        }
    }
    false
}

/// Classifies one OR branch from its explained fields
pub fn classify_branch(
    indexes: &[IndexInfo],
    fields: &BTreeMap<String, FieldExplanation>,
    order_by: &[OrderBy],
) -> QueryClass {
    if fields
        .get("_key")
        .map_or(false, |f| f.is_only(CompareOp::Eq))
    {
        return QueryClass::Fast;
    }

    for (name, field) in fields {
        if !supported_operators(field) {
            return QueryClass::Slow(SlowReason::UnsupportedOperators {
                field: name.clone(),
                operators: field.operations.iter().map(|op| op.as_str().to_string()).collect(),
            });
        }
    }

    let usable: Vec<&IndexInfo> = indexes
        .iter()
        .filter(|index| fields_can_use_index(fields, index))
        .collect();
    if usable.is_empty() {
        return QueryClass::Slow(SlowReason::NoIndexForFields {
            fields: fields.keys().cloned().collect(),
        });
    }

    if !usable
        .iter()
        .any(|index| order_by_can_use_index(fields, order_by, index))
    {
        return QueryClass::Slow(SlowReason::OrderByNotIndexed {
            order_by: order_by.iter().map(OrderBy::storage_path).collect(),
        });
    }

    QueryClass::Fast
}

/// Explained fields of one branch, relative to the document root
pub fn explain_branch(
    doc_type: &FilterType,
    branch: &Value,
) -> FilterResult<BTreeMap<String, FieldExplanation>> {
    let mut params = QueryParams::with_explanation();
    doc_type.filter_condition(&mut params, "doc", branch)?;
    Ok(params
        .take_explanation()
        .map(|e| e.fields_relative_to("doc"))
        .unwrap_or_default())
}

/// Classifies a whole filter and sort order against an index catalog
pub fn classify_query(
    indexes: &[IndexInfo],
    doc_type: &FilterType,
    filter: &Value,
    order_by: &[OrderBy],
) -> FilterResult<QueryClass> {
    for branch in split_or(filter) {
        let fields = explain_branch(doc_type, &branch)?;
        let class = classify_branch(indexes, &fields, order_by);
        if !class.is_fast() {
            return Ok(class);
        }
    }
    Ok(QueryClass::Fast)
}

/// Operator sets per field, as printable strings
pub fn describe_fields(fields: &BTreeMap<String, FieldExplanation>) -> BTreeMap<String, BTreeSet<String>> {
    fields
        .iter()
        .map(|(name, field)| {
            (
                name.clone(),
                field.operations.iter().map(|op| op.as_str().to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explained(entries: &[(&str, &[CompareOp])]) -> BTreeMap<String, FieldExplanation> {
        entries
            .iter()
            .map(|(name, ops)| {
                (
                    name.to_string(),
                    FieldExplanation {
                        operations: ops.iter().copied().collect(),
                    },
                )
            })
            .collect()
    }

    fn indexes(list: &[&str]) -> Vec<IndexInfo> {
        list.iter().map(|s| IndexInfo::parse(s)).collect()
    }

    #[test]
    fn test_key_equality_is_fast() {
        let fields = explained(&[("_key", &[CompareOp::Eq]), ("code", &[CompareOp::Eq])]);
        assert!(classify_branch(&[], &fields, &[]).is_fast());
    }

    #[test]
    fn test_key_range_gets_no_shortcut() {
        let fields = explained(&[("_key", &[CompareOp::Gt])]);
        assert!(!classify_branch(&[], &fields, &[]).is_fast());
    }

    #[test]
    fn test_operator_sets() {
        let idx = indexes(&["seq_no"]);
        for ops in [
            &[CompareOp::Eq][..],
            &[CompareOp::Ne],
            &[CompareOp::Gt, CompareOp::Lt],
            &[CompareOp::Ge, CompareOp::Le],
        ] {
            let fields = explained(&[("seq_no", ops)]);
            assert!(classify_branch(&idx, &fields, &[]).is_fast(), "{:?}", ops);
        }
        for ops in [
            &[CompareOp::Eq, CompareOp::Ne][..],
            &[CompareOp::Gt, CompareOp::Ge],
            &[CompareOp::Lt, CompareOp::Le, CompareOp::Gt],
        ] {
            let fields = explained(&[("seq_no", ops)]);
            assert!(matches!(
                classify_branch(&idx, &fields, &[]),
                QueryClass::Slow(SlowReason::UnsupportedOperators { .. })
            ));
        }
    }

    #[test]
    fn test_fields_must_be_index_prefix() {
        let idx = IndexInfo::parse("workchain_id, seq_no");
        assert!(fields_can_use_index(&explained(&[("workchain_id", &[CompareOp::Eq])]), &idx));
        assert!(!fields_can_use_index(&explained(&[("seq_no", &[CompareOp::Eq])]), &idx));
        assert!(fields_can_use_index(
            &explained(&[("seq_no", &[CompareOp::Gt]), ("workchain_id", &[CompareOp::Eq])]),
            &idx
        ));
        assert!(!fields_can_use_index(
            &explained(&[
                ("seq_no", &[CompareOp::Gt]),
                ("workchain_id", &[CompareOp::Eq]),
                ("shard", &[CompareOp::Eq])
            ]),
            &idx
        ));
    }

    #[test]
    fn test_order_by_after_equality_prefix() {
        let idx = IndexInfo::parse("workchain_id, gen_utime");
        let fields = explained(&[("workchain_id", &[CompareOp::Eq])]);
        assert!(order_by_can_use_index(&fields, &[OrderBy::desc("gen_utime")], &idx));

        let ranged = explained(&[("workchain_id", &[CompareOp::Gt])]);
        assert!(!order_by_can_use_index(&ranged, &[OrderBy::asc("gen_utime")], &idx));
    }

    #[test]
    fn test_order_by_must_be_contiguous() {
        let idx = IndexInfo::parse("a, b, c");
        let none = explained(&[]);
        assert!(order_by_can_use_index(&none, &[OrderBy::asc("a"), OrderBy::asc("b")], &idx));
        assert!(!order_by_can_use_index(&none, &[OrderBy::asc("a"), OrderBy::asc("c")], &idx));
        assert!(!order_by_can_use_index(&none, &[OrderBy::asc("b")], &idx));
        assert!(order_by_can_use_index(&none, &[], &idx));
    }

    #[test]
    fn test_no_index_is_slow() {
        let fields = explained(&[("balance", &[CompareOp::Gt])]);
        assert_eq!(
            classify_branch(&indexes(&["last_paid"]), &fields, &[]),
            QueryClass::Slow(SlowReason::NoIndexForFields {
                fields: vec!["balance".to_string()]
            })
        );
    }

    #[test]
    fn test_sorted_query_needs_serving_index() {
        let idx = indexes(&["seq_no", "gen_utime"]);
        let fields = explained(&[]);
        assert!(classify_branch(&idx, &fields, &[OrderBy::desc("gen_utime")]).is_fast());
        assert!(!classify_branch(&idx, &fields, &[OrderBy::asc("lt")]).is_fast());
    }

    #[test]
    fn test_reason_display() {
        let reason = SlowReason::NoIndexForFields {
            fields: vec!["a".into(), "b".into()],
        };
        assert_eq!(reason.to_string(), "no index starts with fields [a, b]");
    }
}
