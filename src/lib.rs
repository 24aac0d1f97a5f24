//! ledgerq - typed query, index-usability and live-notification engine for
//! a ledger stored in a document database
//!
//! - `filter`: filter compilation, projections and in-memory tests
//! - `aggregation`: aggregate query compilation and result conversion
//! - `planner`: fast/slow classification against an index catalog
//! - `collection`: per-collection query, wait-for, aggregate and subscribe
//! - `realtime`: change feed and bounded subscription queues
//! - `schema`: ledger document types and default indexes

pub mod aggregation;
pub mod cli;
pub mod collection;
pub mod filter;
pub mod observability;
pub mod planner;
pub mod realtime;
pub mod schema;
