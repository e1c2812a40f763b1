//! bitbucket-runner - validate and dry-run Bitbucket Pipelines definitions

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use core::{
    validate, CacheDefinition, ExecutionContext, ExecutionStatus, Pipeline, PipelineDocument,
    PipelineSelector, RunnerConfig, Step, StepResult, StepStatus,
};
pub use execution::{DryRunExecutor, ExecutionEngine, ExecutionEvent, StepExecutor};
