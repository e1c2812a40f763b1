//! CLI output formatting

use crate::core::{ExecutionStatus, StepResult, StepStatus};
use crate::execution::ExecutionEvent;
use console::Emoji;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format a step status for display
pub fn format_step_status(status: StepStatus) -> String {
    match status {
        StepStatus::Pending => style("PENDING").dim().to_string(),
        StepStatus::Running => style("RUNNING").yellow().to_string(),
        StepStatus::Completed => style("COMPLETED").green().to_string(),
        StepStatus::Failed => style("FAILED").red().to_string(),
        StepStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
        ExecutionStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// One line per finished step
pub fn format_step_result(result: &StepResult) -> String {
    let icon = match result.status() {
        StepStatus::Completed => CHECK,
        StepStatus::Failed => CROSS,
        StepStatus::Skipped => SKIP,
        StepStatus::Pending | StepStatus::Running => SPINNER,
    };
    format!(
        "{}[{}] {} {} ({})",
        icon,
        result.step_index() + 1,
        style(result.step_name()).bold(),
        format_step_status(result.status()),
        style(format_duration(result.duration())).dim()
    )
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            total_steps,
        } => format!(
            "{} Starting pipeline ({}) with {} steps",
            ROCKET,
            style(&execution_id.to_string()[..8]).dim(),
            style(total_steps).cyan()
        ),
        ExecutionEvent::StepStarted { index, name } => {
            format!("{}[{}] {}", SPINNER, index + 1, style(name).cyan())
        }
        ExecutionEvent::StepFinished { result } => format_step_result(result),
        ExecutionEvent::PipelineFinished {
            execution_id,
            status,
        } => format!(
            "{} Pipeline ({}) {}",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
