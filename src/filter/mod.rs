//! Filter compilation
//!
//! Turns caller filters over typed document fields into parameterized
//! condition text, RETURN projections and in-memory predicates.
//!
//! Invariants:
//! - Every caller value is bound as a parameter, never spliced into text
//! - Compiled conditions and in-memory tests accept the same documents
//! - Unknown keys reject the whole filter

mod bigint;
mod errors;
mod ops;
mod params;
mod selection;
mod types;

pub use bigint::{
    convert_big_uint, decode_big_int, encode_big_int, format_big_int, parse_big_int,
    resolve_big_uint, BigNumberFormat, BigUIntWidth,
};
pub use errors::{FilterError, FilterErrorCode, FilterResult, Severity};
pub use ops::{and_conditions, compare_values, or_conditions, CompareOp, ScalarOp};
pub use params::{combine_path, FieldExplanation, QueryExplanation, QueryParams, CURRENT};
pub use selection::{selection_to_string, FieldSelection};
pub use types::{
    combine_return_expressions, split_or, ArrayType, EnumNameType, FilterType, JoinType, LazyType,
    ScalarKind, StructType, TypeRef, OR_KEY,
};
