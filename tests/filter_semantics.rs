//! Filter Semantics Tests
//!
//! Compiled conditions and in-memory tests over the ledger schema:
//! - Array `any` lookups compile to `IN` when possible
//! - OR branches behave as a disjunction of their operands
//! - Empty arrays make `any` false and `all` true
//! - Wide integers compare in magnitude order after encoding

use ledgerq::filter::{
    decode_big_int, encode_big_int, BigUIntWidth, FieldSelection, QueryParams, TypeRef,
};
use ledgerq::schema::{block_signatures_type, message_type, transaction_type, account_type};
use num_bigint::BigInt;
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn compile(doc_type: &TypeRef, filter: Value) -> (String, serde_json::Map<String, Value>) {
    let mut params = QueryParams::new();
    let condition = doc_type.filter_condition(&mut params, "doc", &filter).unwrap();
    (condition, params.into_values())
}

fn passes(doc_type: &TypeRef, doc: &Value, filter: Value) -> bool {
    doc_type.test_document(doc, &filter).unwrap()
}

fn encoded(width: BigUIntWidth, value: i64) -> Value {
    Value::String(encode_big_int(width, &BigInt::from(value)).unwrap())
}

// =============================================================================
// Array Lookups
// =============================================================================

/// Equality on an array item's field becomes a single `IN` lookup.
#[test]
fn test_signature_node_lookup_uses_in() {
    let (condition, params) = compile(
        &block_signatures_type(),
        json!({"signatures": {"any": {"node_id": {"eq": "1"}}}}),
    );
    assert_eq!(condition, "@v1 IN doc.signatures[*].node_id");
    assert_eq!(Value::Object(params), json!({"v1": "1"}));
}

/// Inequality cannot use `IN` and falls back to a filtered length.
#[test]
fn test_out_msgs_inequality_uses_length() {
    let (condition, params) = compile(
        &transaction_type(),
        json!({"out_msgs": {"any": {"ne": "1"}}}),
    );
    assert_eq!(condition, "LENGTH(doc.out_msgs[* FILTER CURRENT != @v1]) > 0");
    assert_eq!(Value::Object(params), json!({"v1": "1"}));
}

/// Plain string arrays compare the item itself.
#[test]
fn test_out_msgs_equality_uses_in() {
    let (condition, _) = compile(&transaction_type(), json!({"out_msgs": {"any": {"eq": "m1"}}}));
    assert_eq!(condition, "@v1 IN doc.out_msgs[*]");
}

/// Array filters agree with the compiled lookups in memory.
#[test]
fn test_signature_lookup_in_memory() {
    let doc = json!({
        "_key": "b1",
        "signatures": [{"node_id": "1", "r": "aa", "s": "bb"}, {"node_id": "2"}],
    });
    let ty = block_signatures_type();
    assert!(passes(&ty, &doc, json!({"signatures": {"any": {"node_id": {"eq": "2"}}}})));
    assert!(!passes(&ty, &doc, json!({"signatures": {"any": {"node_id": {"eq": "3"}}}})));
    assert!(!passes(&ty, &doc, json!({"signatures": {"all": {"node_id": {"eq": "1"}}}})));
}

// =============================================================================
// OR Splitting
// =============================================================================

/// `{a, OR: {b}}` equals `{a}` or `{b}` for every document.
#[test]
fn test_or_split_is_disjunction() {
    let ty = message_type();
    let docs = vec![
        json!({"_key": "m1", "src": "0:a", "dst": "0:b", "created_at": 1}),
        json!({"_key": "m2", "src": "0:c", "dst": "0:a", "created_at": 2}),
        json!({"_key": "m3", "src": "0:c", "dst": "0:d", "created_at": 3}),
        json!({"_key": "m4"}),
    ];
    let a = json!({"src": {"eq": "0:a"}});
    let b = json!({"dst": {"eq": "0:a"}});
    let combined = json!({"src": {"eq": "0:a"}, "OR": {"dst": {"eq": "0:a"}}});

    for doc in &docs {
        let expected = passes(&ty, doc, a.clone()) || passes(&ty, doc, b.clone());
        assert_eq!(passes(&ty, doc, combined.clone()), expected, "doc {}", doc);
    }
}

/// Each OR operand compiles to its own parenthesized branch.
#[test]
fn test_or_compiles_to_branches() {
    let (condition, params) = compile(
        &message_type(),
        json!({"src": {"eq": "0:a"}, "OR": {"dst": {"eq": "0:a"}}}),
    );
    assert_eq!(condition, "(doc.src == @v1) OR (doc.dst == @v2)");
    assert_eq!(params.len(), 2);
}

/// An empty OR operand is true, so the whole disjunction is true.
#[test]
fn test_empty_or_operand_is_true() {
    let ty = message_type();
    let doc = json!({"_key": "m1", "src": "0:z"});
    assert!(passes(&ty, &doc, json!({"src": {"eq": "0:a"}, "OR": {}})));
}

// =============================================================================
// Vacuous Quantifiers
// =============================================================================

/// For an empty array `any` is false and `all` is true, whatever the item filter.
#[test]
fn test_empty_array_quantifiers() {
    let ty = transaction_type();
    let item_filters = vec![json!({"eq": "m1"}), json!({"ne": "m1"}), json!({}), json!({"in": []})];
    for doc in [json!({"_key": "t1", "out_msgs": []}), json!({"_key": "t2"})] {
        for item in &item_filters {
            assert!(!passes(&ty, &doc, json!({"out_msgs": {"any": item}})), "any {}", item);
            assert!(passes(&ty, &doc, json!({"out_msgs": {"all": item}})), "all {}", item);
        }
    }
}

// =============================================================================
// Derived Fields
// =============================================================================

/// The logical `id` reads and filters the `_key` column.
#[test]
fn test_id_maps_to_key() {
    let (condition, _) = compile(&message_type(), json!({"id": {"eq": "m1"}}));
    assert_eq!(condition, "doc._key == @v1");
    assert!(passes(&message_type(), &json!({"_key": "m1"}), json!({"id": {"eq": "m1"}})));
}

/// Enum names filter the integer code they name.
#[test]
fn test_enum_name_in_memory() {
    let ty = message_type();
    let doc = json!({"_key": "m1", "msg_type": 1});
    assert!(passes(&ty, &doc, json!({"msg_type_name": {"eq": "ExtIn"}})));
    assert!(!passes(&ty, &doc, json!({"msg_type_name": {"in": ["Internal", "ExtOut"]}})));
    assert!(ty
        .test_document(&doc, &json!({"msg_type_name": {"eq": "Sideways"}}))
        .is_err());
}

/// String companions never match.
#[test]
fn test_string_companion_is_false() {
    let ty = message_type();
    let (condition, _) = compile(&ty, json!({"created_at_string": {"eq": "2020"}}));
    assert_eq!(condition, "false");
    assert!(!passes(&ty, &json!({"_key": "m1", "created_at": 1}), json!({"created_at_string": {"eq": "2020"}})));
}

/// Joins test the caller-supplied referenced document.
#[test]
fn test_join_in_memory() {
    let ty = transaction_type();
    let filter = json!({"in_message": {"src": {"eq": "0:a"}}});
    let joined = json!({"_key": "t1", "in_msg": "m1", "in_message": {"_key": "m1", "src": "0:a"}});
    assert!(passes(&ty, &joined, filter.clone()));
    assert!(!passes(&ty, &json!({"_key": "t1", "in_msg": "m1"}), filter));
}

/// Join arrays quantify over the supplied referenced documents.
#[test]
fn test_join_array_in_memory() {
    let ty = transaction_type();
    let doc = json!({
        "_key": "t1",
        "out_msgs": ["m1", "m2"],
        "out_messages": [{"_key": "m1", "bounce": true}, {"_key": "m2", "bounce": false}],
    });
    assert!(passes(&ty, &doc, json!({"out_messages": {"any": {"bounce": {"eq": true}}}})));
    assert!(!passes(&ty, &doc, json!({"out_messages": {"all": {"bounce": {"eq": true}}}})));
    assert!(!passes(
        &ty,
        &json!({"_key": "t2", "out_messages": []}),
        json!({"out_messages": {"all": {"bounce": {"eq": true}}}})
    ));
}

// =============================================================================
// Wide Integers
// =============================================================================

/// Encoded magnitudes compare in numeric order.
#[test]
fn test_big_uint_comparison() {
    let ty = account_type();
    let rich = json!({"_key": "0:a", "balance": encoded(BigUIntWidth::U1024, 5_000_000)});
    let poor = json!({"_key": "0:b", "balance": encoded(BigUIntWidth::U1024, 999)});
    let filter = json!({"balance": {"gt": "1000"}});
    assert!(passes(&ty, &rich, filter.clone()));
    assert!(!passes(&ty, &poor, filter.clone()));

    let (condition, params) = compile(&ty, filter);
    assert_eq!(condition, "doc.balance > @v1");
    assert_eq!(params["v1"], encoded(BigUIntWidth::U1024, 1000));
}

/// Decoding an encoded value restores it, zero and negatives included.
#[test]
fn test_big_uint_round_trip() {
    for width in [BigUIntWidth::U64, BigUIntWidth::U1024] {
        for value in [0i64, 1, 255, 256, 1_000_000_007, -1, -4096] {
            let stored = encoded(width, value);
            assert_eq!(decode_big_int(width, &stored).unwrap(), BigInt::from(value));
        }
    }
}

/// Hex and decimal inputs select the same stored value.
#[test]
fn test_big_uint_accepts_hex() {
    let ty = account_type();
    let doc = json!({"_key": "0:a", "balance": encoded(BigUIntWidth::U1024, 255)});
    assert!(passes(&ty, &doc, json!({"balance": {"eq": "0xff"}})));
    assert!(passes(&ty, &doc, json!({"balance": {"eq": 255}})));
}

// =============================================================================
// Selection
// =============================================================================

/// Pruning keeps declared fields and adds storage fields derived fields read.
#[test]
fn test_selection_pruning() {
    let ty = message_type();
    let selection = FieldSelection::parse("id msg_type_name bogus __typename").unwrap();
    let pruned = ty.as_struct().unwrap().prune_selection(&selection);
    let names: Vec<&str> = pruned.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "msg_type_name", "msg_type"]);
}
