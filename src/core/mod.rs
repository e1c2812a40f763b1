//! Core domain models for pipeline documents
//!
//! This module defines the pipeline document schema, its validation and
//! selection rules, and the state tracked while a pipeline runs.

pub mod cache;
pub mod context;
pub mod document;
pub mod error;
pub mod runner_config;
pub mod selector;
pub mod state;
pub mod validation;

pub use cache::CacheDefinition;
pub use context::*;
pub use document::*;
pub use error::{DecodeError, Error, LookupError, RunnerConfigError, TransitionError, ValidationError};
pub use runner_config::RunnerConfig;
pub use selector::*;
pub use state::*;
pub use validation::validate;
