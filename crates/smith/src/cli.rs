//! CLI surface (spec.md §6 "documented only for completeness"): `init`,
//! `start`, `stop`, `status`. PID-file lifecycle is real; process
//! supervision beyond that (daemonizing, restart policy) is out of scope.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "smith", author, version, about = "Smith remote execution agent")]
pub struct Cli {
    /// Override the resolved home directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    pub home_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a starter config file and persist a fresh auth token
    Init {
        #[arg(long, default_value = "smith")]
        name: String,
        /// Directory the agent will be confined to
        #[arg(long)]
        sandbox_dir: PathBuf,
        #[arg(long)]
        config_path: Option<PathBuf>,
    },
    /// Run the protocol server in the foreground
    Start {
        #[arg(long)]
        config_path: Option<PathBuf>,
    },
    /// Signal a running agent (identified by the home directory's PID file) to stop
    Stop,
    /// Report whether the PID in the home directory's PID file is alive
    Status,
}
