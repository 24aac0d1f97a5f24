//! CLI module for ledgerq
//!
//! Offline commands over the built-in ledger schema:
//! - compile: query text and bound parameters
//! - explain: fast/slow verdict against the default index catalog
//! - aggregate: aggregation text and bound parameters

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{aggregate, compile, explain, load_config, run, run_command, AggregateInput, QueryInput};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, read_request_from, write_error, write_error_to, write_response, write_response_to};
