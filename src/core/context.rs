//! Execution context - runtime state of one pipeline run
//!
//! The context is driven from outside: an executor asks for
//! [`ExecutionContext::current_step`], runs it, hands back a [`StepResult`]
//! through [`ExecutionContext::record_result`] and then calls
//! [`ExecutionContext::advance`]. The context never runs anything itself and
//! is meant to have a single owner.

use crate::core::document::{Pipeline, PipelineDocument, Step};
use crate::core::error::TransitionError;
use crate::core::state::{ExecutionStatus, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Outcome of a single step, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    step_index: usize,
    step_name: String,
    status: StepStatus,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    duration: Duration,
    exit_code: i32,
    stdout: String,
    stderr: String,
}

/// A step result that has started but not finished
#[derive(Debug, Clone)]
pub struct StepResultBuilder {
    step_index: usize,
    step_name: String,
    started_at: DateTime<Utc>,
}

impl StepResult {
    /// Start timing a step
    pub fn begin(step_index: usize, step_name: impl Into<String>) -> StepResultBuilder {
        StepResultBuilder {
            step_index,
            step_name: step_name.into(),
            started_at: Utc::now(),
        }
    }

    /// A result for a step that never ran
    pub fn skipped(step_index: usize, step_name: impl Into<String>) -> Self {
        let now = Utc::now();
        StepResult {
            step_index,
            step_name: step_name.into(),
            status: StepStatus::Skipped,
            started_at: now,
            ended_at: Some(now),
            duration: Duration::ZERO,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}

impl StepResultBuilder {
    /// Stamp the end time and freeze the result
    pub fn finish(
        self,
        status: StepStatus,
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> StepResult {
        let ended_at = Utc::now();
        StepResult {
            step_index: self.step_index,
            step_name: self.step_name,
            status,
            started_at: self.started_at,
            ended_at: Some(ended_at),
            duration: elapsed(self.started_at, ended_at),
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Finish with status derived from the exit code
    pub fn exited(self, exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> StepResult {
        let status = if exit_code == 0 {
            StepStatus::Completed
        } else {
            StepStatus::Failed
        };
        self.finish(status, exit_code, stdout, stderr)
    }
}

/// Runtime state of one pipeline run
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Unique execution ID
    pub execution_id: Uuid,

    pipeline: Option<Pipeline>,
    current_step: usize,
    step_results: Vec<StepResult>,

    /// Variables exported to every step
    pub environment: HashMap<String, String>,

    pub working_dir: String,

    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    status: ExecutionStatus,
    error_message: Option<String>,
}

impl ExecutionContext {
    /// Create a pending context bound to `pipeline`
    pub fn new(pipeline: Option<Pipeline>, working_dir: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            pipeline,
            current_step: 0,
            step_results: Vec::new(),
            environment: HashMap::new(),
            working_dir: working_dir.into(),
            started_at: Utc::now(),
            ended_at: None,
            status: ExecutionStatus::Pending,
            error_message: None,
        }
    }

    /// Create a context bound to the document's default pipeline
    pub fn for_document(document: &PipelineDocument, working_dir: impl Into<String>) -> Self {
        Self::new(document.default_pipeline().cloned(), working_dir)
    }

    /// Bind a different pipeline and rewind the cursor
    pub fn bind_pipeline(&mut self, pipeline: Pipeline) {
        self.pipeline = Some(pipeline);
        self.current_step = 0;
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Zero-based index of the step under the cursor
    pub fn current_index(&self) -> usize {
        self.current_step
    }

    /// Mark the execution as started
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(ExecutionStatus::Running)?;
        self.started_at = Utc::now();
        Ok(())
    }

    /// Mark the execution as completed
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.transition(ExecutionStatus::Completed)?;
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the execution as failed; allowed before the run has started
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(ExecutionStatus::Failed)?;
        self.ended_at = Some(Utc::now());
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Mark the execution as cancelled
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        self.transition(ExecutionStatus::Cancelled)?;
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, to: ExecutionStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        debug!("Execution {}: {} -> {}", self.execution_id, self.status, to);
        self.status = to;
        Ok(())
    }

    /// The step under the cursor, if any
    pub fn current_step(&self) -> Option<&Step> {
        self.pipeline.as_ref()?.step(self.current_step)
    }

    /// Move the cursor forward; moving past the end is allowed
    pub fn advance(&mut self) {
        self.current_step += 1;
    }

    /// True once the cursor is past the last step, or nothing is bound
    pub fn is_complete(&self) -> bool {
        match &self.pipeline {
            Some(pipeline) => self.current_step >= pipeline.len(),
            None => true,
        }
    }

    /// Append a step result; does not move the cursor
    pub fn record_result(&mut self, result: StepResult) {
        self.step_results.push(result);
    }

    pub fn step_results(&self) -> &[StepResult] {
        &self.step_results
    }

    /// Time between start and end, or start and now while still running
    pub fn total_duration(&self) -> Duration {
        elapsed(self.started_at, self.ended_at.unwrap_or_else(Utc::now))
    }

    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.environment.insert(key.into(), value.into());
    }

    pub fn env(&self, key: &str) -> Option<&String> {
        self.environment.get(key)
    }
}

fn elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    to.signed_duration_since(from).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
impl ExecutionContext {
    fn set_times(&mut self, started_at: DateTime<Utc>, ended_at: Option<DateTime<Utc>>) {
        self.started_at = started_at;
        self.ended_at = ended_at;
    }

    fn set_cursor(&mut self, index: usize) {
        self.current_step = index;
    }
}
