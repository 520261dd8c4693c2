//! realdb CLI entry point
//!
//! All logic lives in the cli module; this only reports the final error
//! and sets the exit status.

use realdb::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
