//! Default index catalog of the ledger collections
//!
//! Used until the first live catalog refresh and by the offline CLI.

use crate::planner::IndexInfo;

const BLOCKS: &[&str] = &[
    "seq_no",
    "gen_utime",
    "workchain_id, shard, seq_no",
    "workchain_id, shard, gen_utime",
    "workchain_id, seq_no",
    "workchain_id, gen_utime",
];

const BLOCKS_SIGNATURES: &[&str] = &["signatures[*].node_id, gen_utime"];

const ACCOUNTS: &[&str] = &["last_trans_lt", "balance"];

const MESSAGES: &[&str] = &[
    "block_id",
    "value, created_at",
    "src, value, created_at",
    "dst, value, created_at",
    "src, created_at",
    "dst, created_at",
    "created_lt",
    "created_at",
];

const TRANSACTIONS: &[&str] = &[
    "block_id",
    "in_msg",
    "out_msgs[*]",
    "account_addr, now",
    "now",
    "lt",
    "account_addr, orig_status, end_status",
    "now, account_addr, lt",
];

/// Declared indexes of `collection`; empty for unknown names
pub fn default_indexes(collection: &str) -> Vec<IndexInfo> {
    let declared = match collection {
        "blocks" => BLOCKS,
        "blocks_signatures" => BLOCKS_SIGNATURES,
        "accounts" => ACCOUNTS,
        "messages" => MESSAGES,
        "transactions" => TRANSACTIONS,
        _ => &[],
    };
    declared.iter().map(|text| IndexInfo::parse(text)).collect()
}
