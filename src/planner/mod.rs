//! Index usability analysis
//!
//! Classifies compiled queries as fast or slow by mirroring the backing
//! engine's index selection rules against a declared index catalog.
//!
//! # Design Principles
//!
//! - Pure: verdicts depend only on catalog, explanation and sort order
//! - Memoized: one verdict per query shape until the catalog changes
//! - Conservative: a branch without a usable index is slow

mod cache;
mod detector;
mod index;
mod order;

pub use cache::QueryClassCache;
pub use detector::{
    classify_branch, classify_query, describe_fields, explain_branch, fields_can_use_index,
    order_by_can_use_index, QueryClass, SlowReason,
};
pub use index::{same_index_set, IndexInfo};
pub use order::{sort_section, storage_path, OrderBy, SortDirection};
