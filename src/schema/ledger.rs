//! Ledger document types
//!
//! Filter descriptors for the five ledger collections. Message and
//! transaction types reference each other through joins, so every type is
//! built once on first use and shared afterwards.

use std::sync::{Arc, OnceLock};

use crate::filter::{
    ArrayType, BigUIntWidth, EnumNameType, FilterType, JoinType, ScalarKind, StructType, TypeRef,
};

fn string() -> TypeRef {
    FilterType::scalar(ScalarKind::String)
}

fn int() -> TypeRef {
    FilterType::scalar(ScalarKind::Int)
}

fn boolean() -> TypeRef {
    FilterType::scalar(ScalarKind::Boolean)
}

fn u64_type() -> TypeRef {
    FilterType::big_uint(BigUIntWidth::U64)
}

fn u1024_type() -> TypeRef {
    FilterType::big_uint(BigUIntWidth::U1024)
}

fn enum_name(on_field: &str, values: &[(&str, i64)]) -> TypeRef {
    Arc::new(FilterType::EnumName(EnumNameType::new(
        on_field,
        values.iter().map(|(name, code)| (*name, *code)),
    )))
}

fn structure(fields: Vec<(&str, TypeRef)>) -> TypeRef {
    Arc::new(FilterType::Struct(StructType::new(fields)))
}

fn collection(fields: Vec<(&str, TypeRef)>) -> TypeRef {
    Arc::new(FilterType::Struct(StructType::collection(fields)))
}

const BLOCK_STATUS: &[(&str, i64)] = &[
    ("Unknown", 0),
    ("Proposed", 1),
    ("Finalized", 2),
    ("Refused", 3),
];

const ACCOUNT_STATUS: &[(&str, i64)] = &[
    ("Uninit", 0),
    ("Active", 1),
    ("Frozen", 2),
    ("NonExist", 3),
];

const MESSAGE_TYPE: &[(&str, i64)] = &[("Internal", 0), ("ExtIn", 1), ("ExtOut", 2)];

const MESSAGE_STATUS: &[(&str, i64)] = &[
    ("Unknown", 0),
    ("Queued", 1),
    ("Processing", 2),
    ("Preliminary", 3),
    ("Proposed", 4),
    ("Finalized", 5),
    ("Refused", 6),
    ("Transiting", 7),
];

const TRANSACTION_TYPE: &[(&str, i64)] = &[
    ("Ordinary", 0),
    ("Storage", 1),
    ("Tick", 2),
    ("Tock", 3),
    ("SplitPrepare", 4),
    ("SplitInstall", 5),
    ("MergePrepare", 6),
    ("MergeInstall", 7),
];

const TRANSACTION_STATUS: &[(&str, i64)] = &[
    ("Unknown", 0),
    ("Preliminary", 1),
    ("Proposed", 2),
    ("Finalized", 3),
    ("Refused", 4),
];

pub fn block_type() -> TypeRef {
    static TYPE: OnceLock<TypeRef> = OnceLock::new();
    TYPE.get_or_init(|| {
        collection(vec![
            ("id", string()),
            ("status", int()),
            ("status_name", enum_name("status", BLOCK_STATUS)),
            ("global_id", int()),
            ("workchain_id", int()),
            ("shard", string()),
            ("seq_no", int()),
            ("gen_utime", int()),
            ("gen_utime_string", FilterType::string_companion("gen_utime")),
            ("tr_count", int()),
            ("created_by", string()),
            (
                "value_flow",
                structure(vec![
                    ("from_prev_blk", u1024_type()),
                    ("to_next_blk", u1024_type()),
                    ("fees_collected", u1024_type()),
                    ("minted", u1024_type()),
                ]),
            ),
            (
                "in_msg_descr",
                FilterType::array(structure(vec![
                    ("msg_id", string()),
                    ("transaction_id", string()),
                    ("fwd_fee", u1024_type()),
                ])),
            ),
        ])
    })
    .clone()
}

pub fn block_signatures_type() -> TypeRef {
    static TYPE: OnceLock<TypeRef> = OnceLock::new();
    TYPE.get_or_init(|| {
        collection(vec![
            ("id", string()),
            ("gen_utime", int()),
            ("seq_no", int()),
            ("shard", string()),
            ("workchain_id", int()),
            ("proof", string()),
            ("validator_list_hash_short", int()),
            ("catchain_seqno", int()),
            ("sig_weight", u64_type()),
            (
                "signatures",
                FilterType::array(structure(vec![
                    ("node_id", string()),
                    ("r", string()),
                    ("s", string()),
                ])),
            ),
        ])
    })
    .clone()
}

pub fn account_type() -> TypeRef {
    static TYPE: OnceLock<TypeRef> = OnceLock::new();
    TYPE.get_or_init(|| {
        collection(vec![
            ("id", string()),
            ("workchain_id", int()),
            ("acc_type", int()),
            ("acc_type_name", enum_name("acc_type", ACCOUNT_STATUS)),
            ("last_paid", int()),
            ("balance", u1024_type()),
            ("last_trans_lt", u64_type()),
            ("code_hash", string()),
            ("data_hash", string()),
            ("boc", string()),
        ])
    })
    .clone()
}

pub fn message_type() -> TypeRef {
    static TYPE: OnceLock<TypeRef> = OnceLock::new();
    TYPE.get_or_init(|| {
        collection(vec![
            ("id", string()),
            ("block_id", string()),
            ("msg_type", int()),
            ("msg_type_name", enum_name("msg_type", MESSAGE_TYPE)),
            ("status", int()),
            ("status_name", enum_name("status", MESSAGE_STATUS)),
            ("src", string()),
            ("dst", string()),
            ("created_lt", u64_type()),
            ("created_at", int()),
            ("created_at_string", FilterType::string_companion("created_at")),
            ("value", u1024_type()),
            ("fwd_fee", u1024_type()),
            ("ihr_fee", u1024_type()),
            ("bounce", boolean()),
            (
                "dst_transaction",
                Arc::new(FilterType::Join(JoinType::new(
                    "id",
                    "in_msg",
                    "transactions",
                    transaction_type,
                ))),
            ),
        ])
    })
    .clone()
}

pub fn transaction_type() -> TypeRef {
    static TYPE: OnceLock<TypeRef> = OnceLock::new();
    TYPE.get_or_init(|| {
        collection(vec![
            ("id", string()),
            ("tr_type", int()),
            ("tr_type_name", enum_name("tr_type", TRANSACTION_TYPE)),
            ("status", int()),
            ("status_name", enum_name("status", TRANSACTION_STATUS)),
            ("block_id", string()),
            ("account_addr", string()),
            ("workchain_id", int()),
            ("lt", u64_type()),
            ("now", int()),
            ("now_string", FilterType::string_companion("now")),
            ("orig_status", int()),
            ("orig_status_name", enum_name("orig_status", ACCOUNT_STATUS)),
            ("end_status", int()),
            ("end_status_name", enum_name("end_status", ACCOUNT_STATUS)),
            ("total_fees", u1024_type()),
            ("balance_delta", u1024_type()),
            ("aborted", boolean()),
            ("outmsg_cnt", int()),
            ("in_msg", string()),
            (
                "in_message",
                Arc::new(FilterType::Join(JoinType::new("in_msg", "id", "messages", message_type))),
            ),
            ("out_msgs", FilterType::array(string())),
            (
                "out_messages",
                Arc::new(FilterType::JoinArray(JoinType::new(
                    "out_msgs",
                    "id",
                    "messages",
                    message_type,
                ))),
            ),
        ])
    })
    .clone()
}

/// Array of transactions, with items resolved lazily
pub fn transaction_list_type() -> TypeRef {
    Arc::new(FilterType::Array(ArrayType::lazy(transaction_type)))
}
