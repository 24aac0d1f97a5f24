//! CLI argument definitions using clap
//!
//! Commands:
//! - ledgerq compile [--config <path>]
//! - ledgerq explain [--config <path>]
//! - ledgerq aggregate [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ledgerq - offline compiler and index advisor for ledger queries
#[derive(Parser, Debug)]
#[command(name = "ledgerq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration file (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Minimum log severity (TRACE, INFO, WARN, ERROR, FATAL)
    #[arg(long, global = true, default_value = "WARN")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Compile a query request read from stdin
    Compile,

    /// Compile a query and report index usability
    Explain,

    /// Compile an aggregation request read from stdin
    Aggregate,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
