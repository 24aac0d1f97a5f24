//! Ledger schema
//!
//! Document types, account fields and default indexes of the ledger
//! collections, plus a helper that registers them all.

mod indexes;
mod ledger;

use std::sync::Arc;

pub use indexes::default_indexes;
pub use ledger::{
    account_type, block_signatures_type, block_type, message_type, transaction_list_type,
    transaction_type,
};

use crate::collection::{Collection, DatabaseDriver, EngineConfig, LedgerData};
use crate::filter::TypeRef;

/// Static description of one ledger collection
#[derive(Debug, Clone)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub doc_type: TypeRef,
    /// Storage fields naming the owning accounts
    pub account_fields: &'static [&'static str],
}

/// Every ledger collection, in a stable order
pub fn ledger_collections() -> Vec<CollectionSchema> {
    vec![
        CollectionSchema {
            name: "blocks",
            doc_type: block_type(),
            account_fields: &[],
        },
        CollectionSchema {
            name: "blocks_signatures",
            doc_type: block_signatures_type(),
            account_fields: &[],
        },
        CollectionSchema {
            name: "accounts",
            doc_type: account_type(),
            account_fields: &["_key"],
        },
        CollectionSchema {
            name: "messages",
            doc_type: message_type(),
            account_fields: &["src", "dst"],
        },
        CollectionSchema {
            name: "transactions",
            doc_type: transaction_type(),
            account_fields: &["account_addr"],
        },
    ]
}

pub fn collection_schema(name: &str) -> Option<CollectionSchema> {
    ledger_collections().into_iter().find(|c| c.name == name)
}

/// Registers every ledger collection over the given connections
pub fn ledger_data(
    fast: Arc<dyn DatabaseDriver>,
    slow: Arc<dyn DatabaseDriver>,
    config: &EngineConfig,
) -> LedgerData {
    let mut data = LedgerData::new();
    for schema in ledger_collections() {
        data.add(
            Collection::new(
                schema.name,
                schema.doc_type,
                fast.clone(),
                slow.clone(),
                config.clone(),
            )
            .with_account_fields(schema.account_fields.iter().copied())
            .with_indexes(default_indexes(schema.name)),
        );
    }
    data
}
