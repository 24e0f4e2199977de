//! Cue command line
//!
//! Runs handlers from a document against an in-memory host, checks
//! documents, and prints the effective configuration.

use cue_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
