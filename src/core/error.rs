//! Error types for decoding, validating and running pipeline documents

use crate::core::state::ExecutionStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed or unreadable pipeline text
#[derive(Debug, Error)]
pub enum DecodeError {
    /// YAML that does not match the schema; the message carries the field path
    #[error("failed to unmarshal YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} not found in {}", file_name, dir.display())]
    NotFound { file_name: String, dir: PathBuf },
}

/// A decoded document that violates a structural invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The `pipelines` group is missing entirely
    #[error("no pipelines defined")]
    MissingPipelines,

    #[error("pipeline '{name}' has no steps defined")]
    EmptyPipeline { name: String },

    #[error("step {step} in pipeline '{pipeline}' has no script defined")]
    MissingScript { step: usize, pipeline: String },

    /// The group is present but every channel is empty
    #[error("no pipelines defined")]
    NoPipelines,
}

impl ValidationError {
    /// Number of the validation rule that produced this error
    pub fn rule(&self) -> u8 {
        match self {
            ValidationError::MissingPipelines => 1,
            ValidationError::EmptyPipeline { name } if name == "default" => 2,
            ValidationError::EmptyPipeline { .. } => 3,
            ValidationError::MissingScript { .. } => 4,
            ValidationError::NoPipelines => 5,
        }
    }
}

/// No pipeline matched a selector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("pipeline '{0}' not found")]
    NotFound(String),

    #[error("invalid pipeline selector '{0}'")]
    InvalidSelector(String),
}

/// Rejected execution state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move execution from {from} to {to}")]
pub struct TransitionError {
    pub from: ExecutionStatus,
    pub to: ExecutionStatus,
}

/// Problems loading or checking the runner configuration
#[derive(Debug, Error)]
pub enum RunnerConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to unmarshal config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid runner configuration: {0}")]
    Invalid(String),
}

/// Top-level error for loading a pipeline document
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("invalid pipeline configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to encode pipeline document: {0}")]
    Encode(#[source] serde_yaml::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
