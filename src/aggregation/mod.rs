//! Aggregation queries
//!
//! Compiles COUNT/MIN/MAX/SUM/AVERAGE requests over filtered documents and
//! converts the raw aggregate row back into caller-facing values.

mod compiler;
mod errors;

pub use compiler::{AggregationFn, AggregationQuery, FieldAggregation};
pub use errors::{AggregationError, AggregationErrorCode, AggregationResult, Severity};
