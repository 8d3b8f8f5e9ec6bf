//! Command-line interface
//!
//! - init: create the data directory and store files
//! - observe: record one scrape cycle read from stdin
//! - unexpected / missing / recent-items: print reports
//! - prune: apply the configured retention policy

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{init, missing, observe, prune, recent_items, run, run_command, unexpected};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
