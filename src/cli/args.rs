//! CLI argument definitions using clap
//!
//! Commands:
//! - realdb init --config <path> --data-dir <dir> [--root-password <pw>]
//! - realdb exec --config <path> --user <u> --password <p> <command>...
//! - realdb shell --config <path> --user <u> --password <p>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// realdb - a small multi-tenant record store
#[derive(Parser, Debug)]
#[command(name = "realdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a configuration file and create the data directory
    Init {
        /// Path of the configuration file to create
        #[arg(long, default_value = "./realdb.json")]
        config: PathBuf,

        /// Root of all persisted artifacts
        #[arg(long)]
        data_dir: PathBuf,

        /// Super-user password; without it root cannot log in
        #[arg(long)]
        root_password: Option<String>,
    },

    /// Execute a single command and exit
    Exec {
        /// Path to configuration file
        #[arg(long, default_value = "./realdb.json")]
        config: PathBuf,

        #[arg(long, short)]
        user: String,

        #[arg(long, short)]
        password: String,

        /// Command text, e.g. SELECT * FROM users
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Read commands line by line from stdin until QUIT or EXIT
    Shell {
        /// Path to configuration file
        #[arg(long, default_value = "./realdb.json")]
        config: PathBuf,

        #[arg(long, short)]
        user: String,

        #[arg(long, short)]
        password: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exec() {
        let cli = Cli::try_parse_from([
            "realdb", "exec", "--user", "alice", "--password", "pw", "SELECT", "*", "FROM", "t",
        ])
        .unwrap();
        match cli.command {
            Command::Exec {
                config,
                user,
                command,
                ..
            } => {
                assert_eq!(config, PathBuf::from("./realdb.json"));
                assert_eq!(user, "alice");
                assert_eq!(command, vec!["SELECT", "*", "FROM", "t"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_init_requires_data_dir() {
        assert!(Cli::try_parse_from(["realdb", "init"]).is_err());
        assert!(Cli::try_parse_from(["realdb", "init", "--data-dir", "/tmp/x"]).is_ok());
    }
}
