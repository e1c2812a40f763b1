//! Test: tracking runs end to end

use crate::helpers::*;
use bitbucket_runner::core::{
    ExecutionContext, ExecutionStatus, Pipeline, PipelineDocument, PipelineSelector, StepStatus,
};
use bitbucket_runner::execution::{DryRunExecutor, ExecutionEngine, ExecutionEvent};

#[test]
fn test_minimal_document_runs_to_completion() {
    let yaml = "pipelines:\n  default:\n    - step:\n        script:\n          - \"echo hi\"\n";

    let document = PipelineDocument::from_yaml(yaml).unwrap();
    let selected = document.select(&PipelineSelector::Default).unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected.step(0).unwrap().script, vec!["echo hi"]);

    let outcome = dry_run(yaml, &PipelineSelector::Default);

    assert_eq!(outcome.status, ExecutionStatus::Completed);
    assert_step_statuses(&outcome, &[StepStatus::Completed]);

    let result = &outcome.context.step_results()[0];
    assert_eq!(result.step_name(), "step 1");
    assert_eq!(result.exit_code(), 0);
    assert!(result.stdout().contains("+ echo hi"));
    assert!(outcome.context.ended_at().is_some());
    assert!(outcome.context.is_complete());
}

#[test]
fn test_branch_pipeline_dry_run() {
    let outcome = dry_run(
        FULL_DOCUMENT,
        &PipelineSelector::Branch("main".to_string()),
    );
    assert_eq!(outcome.status, ExecutionStatus::Completed);
    assert_eq!(outcome.context.step_results()[0].step_name(), "Deploy");
}

#[test]
fn test_failure_stops_remaining_steps() {
    let pipeline = Pipeline::new(vec![
        script_step("Build", &["make"]),
        script_step("Test", &["make test"]),
        script_step("Deploy", &["make deploy"]),
    ]);
    let outcome = run_failing_at(pipeline, 1);

    assert_eq!(outcome.status, ExecutionStatus::Failed);
    assert_step_statuses(&outcome, &[StepStatus::Completed, StepStatus::Failed]);
    assert_eq!(
        outcome.context.error_message(),
        Some("step 2 'Test' failed with exit code 2")
    );
    assert!(!outcome.context.is_complete());
}

#[test]
fn test_events_bracket_the_run() {
    let outcome = dry_run(FULL_DOCUMENT, &PipelineSelector::Default);

    assert!(matches!(
        outcome.events.first(),
        Some(ExecutionEvent::PipelineStarted { total_steps: 2, .. })
    ));
    assert!(matches!(
        outcome.events.last(),
        Some(ExecutionEvent::PipelineFinished {
            status: ExecutionStatus::Completed,
            ..
        })
    ));
    let finished = outcome
        .events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::StepFinished { .. }))
        .count();
    assert_eq!(finished, 2);
}

#[test]
fn test_finished_context_cannot_run_again() {
    let document = PipelineDocument::from_yaml(FULL_DOCUMENT).unwrap();
    let mut context = ExecutionContext::for_document(&document, "/build");
    let mut engine = ExecutionEngine::new(DryRunExecutor::new());

    assert_eq!(engine.execute(&mut context).unwrap(), ExecutionStatus::Completed);

    let err = engine.execute(&mut context).unwrap_err();
    assert_eq!(err.from, ExecutionStatus::Completed);
    assert_eq!(err.to, ExecutionStatus::Running);
    assert_eq!(context.step_results().len(), 2);
}

#[test]
fn test_cancel_before_start() {
    let mut context = ExecutionContext::new(None, "/build");
    context.cancel().unwrap();
    assert_eq!(context.status(), ExecutionStatus::Cancelled);
    assert!(context.start().is_err());
    assert!(context.ended_at().is_some());
}
