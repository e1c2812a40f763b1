//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ConfigCommand, ListCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Validate and dry-run Bitbucket Pipelines locally
#[derive(Debug, Parser, Clone)]
#[command(name = "bitbucket-runner")]
#[command(version)]
#[command(about = "Validate and dry-run Bitbucket Pipelines definitions locally", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a pipeline without executing its commands
    Run(RunCommand),

    /// Validate a pipeline file
    Validate(ValidateCommand),

    /// List available pipelines
    List(ListCommand),

    /// Show the resolved runner configuration
    Config(ConfigCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
