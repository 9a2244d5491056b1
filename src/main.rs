//! mdr-lifecycle CLI entry point
//!
//! Parses nothing and loads nothing itself: everything is delegated to
//! `cli::run`, which also prints the JSON error response. Exits non-zero on
//! failure.

use mdr_lifecycle::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
