//! Main execution engine - drives an [`ExecutionContext`] through its steps

use crate::core::{ExecutionContext, ExecutionStatus, StepResult, StepStatus, TransitionError};
use crate::execution::StepExecutor;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        total_steps: usize,
    },
    StepStarted {
        index: usize,
        name: String,
    },
    StepFinished {
        result: StepResult,
    },
    PipelineFinished {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Box<dyn Fn(&ExecutionEvent)>;

/// Runs steps one at a time until the pipeline ends or a step fails
pub struct ExecutionEngine<E> {
    executor: E,
    event_handlers: Vec<EventHandler>,
}

impl<E: StepExecutor> ExecutionEngine<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + 'static,
    {
        self.event_handlers.push(Box::new(handler));
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Execute every remaining step of the bound pipeline.
    ///
    /// A step that fails stops the run and fails the context; skipped steps
    /// do not. Returns the final status.
    pub fn execute(&mut self, context: &mut ExecutionContext) -> Result<ExecutionStatus, TransitionError> {
        let total_steps = context.pipeline().map(|p| p.len()).unwrap_or(0);
        context.start()?;

        info!("Starting pipeline execution {} ({} steps)", context.execution_id, total_steps);
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id: context.execution_id,
            total_steps,
        });

        let mut failure = None;
        while let Some(step) = context.current_step().cloned() {
            let index = context.current_index();
            self.emit_event(ExecutionEvent::StepStarted {
                index,
                name: step.display_name(index),
            });

            let result = self.executor.execute(index, &step, context);
            match result.status() {
                StepStatus::Failed => {
                    error!("Step {} failed with exit code {}", index + 1, result.exit_code());
                    failure = Some(format!(
                        "step {} '{}' failed with exit code {}",
                        index + 1,
                        result.step_name(),
                        result.exit_code()
                    ));
                }
                StepStatus::Skipped => info!("Step {} skipped", index + 1),
                StepStatus::Completed => info!("Step {} completed in {:?}", index + 1, result.duration()),
                other => warn!("Step {} reported non-terminal status {}", index + 1, other),
            }

            context.record_result(result.clone());
            context.advance();
            self.emit_event(ExecutionEvent::StepFinished { result });

            if failure.is_some() {
                break;
            }
        }

        match failure {
            Some(message) => context.fail(message)?,
            None => context.complete()?,
        }

        let status = context.status();
        info!(
            "Pipeline execution finished: {} in {:?}",
            status,
            context.total_duration()
        );
        self.emit_event(ExecutionEvent::PipelineFinished {
            execution_id: context.execution_id,
            status,
        });

        Ok(status)
    }
}
