//! CLI module for realdb
//!
//! Provides the command-line interface:
//! - init: write a configuration and bootstrap the data directory
//! - exec: run one command and exit
//! - shell: run commands from stdin

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{dispatch, exec, init, init_tracing, run, run_command, shell, tokenize};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_response, ok_response, write_error, write_response};
