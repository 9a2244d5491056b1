//! Operator CLI
//!
//! Provides command-line access to:
//! - init: create the data directory and provision libraries
//! - library: list, provision, lock/unlock
//! - item: every lifecycle transition and the read queries
//! - audit: paged audit trail

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, ItemAction, LibraryAction, TransitionArgs};
pub use commands::{init, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
