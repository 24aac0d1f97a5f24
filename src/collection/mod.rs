//! Collection query and notification engine
//!
//! Ties filter compilation, index-usability classification and the change
//! feed together behind three operations per collection: `query`,
//! `aggregate` and `subscribe`.
//!
//! Invariants:
//! - Access and compile errors are raised before any database call
//! - A statically false condition never reaches the database
//! - Classification picks a connection; it never changes results
//! - Wait-for calls leave no listener or timer behind once resolved

mod access;
#[allow(clippy::module_inception)]
mod collection;
mod config;
mod data;
mod driver;
mod errors;
mod query;
mod stats;

pub use access::{AccessGuard, AccessRights, KeyedAccess};
pub use collection::Collection;
pub use config::{EngineConfig, SlowQueriesMode};
pub use data::LedgerData;
pub use driver::{DatabaseDriver, DriverError, DriverErrorKind};
pub use errors::{QueryError, QueryResult};
pub use query::{
    access_filtered_condition, compile_query, keys_query, CompiledQuery, DocumentMatcher,
    QueryRequest,
};
pub use stats::{ActiveGuard, CollectionStats, StatsSnapshot};
