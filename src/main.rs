//! ledgerq CLI entry point
//!
//! Parses arguments, runs one command and exits non-zero on failure. The
//! error envelope has already been written to stdout by then.

use ledgerq::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
