//! shelfwatch CLI entry point
//!
//! All logic lives in the CLI module. The error envelope has already been
//! written to stdout by the time `run` returns an error.

use shelfwatch::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
