//! Observability
//!
//! Structured JSON log lines and begin/complete scopes.
//!
//! ```ignore
//! use ledgerq::observability::{Logger, ObservationScope};
//!
//! Logger::warn("SLOW_QUERY_DETECTED", &[("collection", "accounts")]);
//!
//! let scope = ObservationScope::with_fields("COLLECTION_QUERY", &[("collection", "blocks")]);
//! // ... run the query ...
//! scope.complete_with_fields(&[("rows", "12")]);
//! ```

mod logger;
mod scope;

pub use logger::{capture_log, Logger, Severity};
pub use scope::ObservationScope;
