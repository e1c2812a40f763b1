//! Step executor - the seam where something actually runs a step

use crate::core::{ExecutionContext, Step, StepResult, StepStatus};
use tracing::{debug, info};

/// Runs one step and reports how it went.
///
/// Implementations own process spawning, containers, services and timeouts.
/// The returned result is appended to the context as-is.
pub trait StepExecutor {
    fn execute(&mut self, index: usize, step: &Step, context: &ExecutionContext) -> StepResult;
}

impl<F> StepExecutor for F
where
    F: FnMut(usize, &Step, &ExecutionContext) -> StepResult,
{
    fn execute(&mut self, index: usize, step: &Step, context: &ExecutionContext) -> StepResult {
        self(index, step, context)
    }
}

/// Executor that runs nothing and reports every step as completed.
///
/// The captured stdout lists the commands that would have run, prefixed with
/// `+ ` like `bash -x` does.
#[derive(Debug, Clone, Default)]
pub struct DryRunExecutor {
    /// Image used when neither the step nor the document names one
    pub fallback_image: Option<String>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback_image(mut self, image: impl Into<String>) -> Self {
        self.fallback_image = Some(image.into());
        self
    }

    fn render(&self, step: &Step) -> String {
        let mut out = String::new();
        if let Some(image) = step.image.as_ref().or(self.fallback_image.as_ref()) {
            out.push_str(&format!("# image: {}\n", image));
        }
        for line in step.script.iter().chain(step.after_script.iter()) {
            out.push_str("+ ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl StepExecutor for DryRunExecutor {
    fn execute(&mut self, index: usize, step: &Step, context: &ExecutionContext) -> StepResult {
        let name = step.display_name(index);
        info!("Dry run: {}", name);
        debug!(
            "Step {} would run {} commands in {}",
            index + 1,
            step.script.len(),
            context.working_dir
        );
        StepResult::begin(index, name).finish(StepStatus::Completed, 0, self.render(step), "")
    }
}
