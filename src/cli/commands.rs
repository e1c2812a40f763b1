//! CLI command definitions

use crate::core::{PipelineDocument, PipelineSelector};
use clap::Args;
use std::path::PathBuf;

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to the pipeline file (defaults to ./bitbucket-pipelines.yml)
    #[arg(short, long)]
    pub file: Option<String>,

    /// Pipeline to run, e.g. `default`, `branches.main`, `custom.deploy`
    #[arg(short, long, default_value = "default", value_parser = parse_selector)]
    pub pipeline: PipelineSelector,

    /// Working directory reported to steps
    #[arg(long)]
    pub workdir: Option<String>,

    /// Extra environment variables (KEY=VALUE)
    #[arg(short, long, value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,
}

/// Validate a pipeline file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the pipeline file (defaults to ./bitbucket-pipelines.yml)
    #[arg(short, long)]
    pub file: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List available pipelines
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Path to the pipeline file (defaults to ./bitbucket-pipelines.yml)
    #[arg(short, long)]
    pub file: Option<String>,

    /// Show step counts
    #[arg(long)]
    pub with_steps: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show the resolved runner configuration
#[derive(Debug, Args, Clone)]
pub struct ConfigCommand {
    /// Read this file instead of searching the default locations
    #[arg(short, long)]
    pub file: Option<String>,
}

/// Resolve an explicit `--file` or the default file in the current directory
pub fn pipeline_path(file: Option<&str>) -> Result<PathBuf, crate::core::DecodeError> {
    match file {
        Some(file) => Ok(PathBuf::from(file)),
        None => PipelineDocument::locate_default("."),
    }
}

fn parse_selector(s: &str) -> Result<PipelineSelector, String> {
    s.parse().map_err(|e: crate::core::LookupError| e.to_string())
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
