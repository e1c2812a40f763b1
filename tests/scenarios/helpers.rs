//! Test utility functions for bitbucket-runner

use bitbucket_runner::core::{
    ExecutionContext, ExecutionStatus, Pipeline, PipelineDocument, PipelineSelector, Step,
    StepResult, StepStatus,
};
use bitbucket_runner::execution::{DryRunExecutor, ExecutionEngine, ExecutionEvent, StepExecutor};
use std::cell::RefCell;
use std::rc::Rc;

/// A document with one pipeline per channel, used by several scenarios
pub const FULL_DOCUMENT: &str = r#"
image: node:18

clone:
  depth: 50

definitions:
  caches:
    npm: ~/.npm
    sbt:
      key: build.sbt
      paths:
        - ~/.sbt
        - ~/.ivy2/cache
  services:
    postgres:
      image: postgres:15
      environment:
        POSTGRES_PASSWORD: secret

pipelines:
  default:
    - step:
        name: Build
        caches:
          - npm
        script:
          - npm ci
          - npm run build
        artifacts:
          - dist/**
    - step:
        name: Test
        services:
          - postgres
        script:
          - npm test
  branches:
    main:
      - step:
          name: Deploy
          script:
            - ./deploy.sh production
    "feature/*":
      - step:
          script:
            - npm run lint
  pull-requests:
    "**":
      - step:
          script:
            - npm test
  custom:
    nightly:
      - step:
          script:
            - ./nightly.sh
  tags:
    "v*":
      - step:
          script:
            - ./release.sh
"#;

pub fn script_step(name: &str, script: &[&str]) -> Step {
    Step::with_script(script.iter().copied()).named(name)
}

/// Captured run: final status, the context, and every emitted event
pub struct RunOutcome {
    pub status: ExecutionStatus,
    pub context: ExecutionContext,
    pub events: Vec<ExecutionEvent>,
}

/// Select `selector` from `yaml` and dry-run it
pub fn dry_run(yaml: &str, selector: &PipelineSelector) -> RunOutcome {
    let document = PipelineDocument::from_yaml(yaml).expect("document should load");
    let pipeline = document.select(selector).expect("pipeline should exist").clone();
    run_with(pipeline, DryRunExecutor::new())
}

/// Run `pipeline` with an executor that fails the step at `failing_index`
pub fn run_failing_at(pipeline: Pipeline, failing_index: usize) -> RunOutcome {
    run_with(pipeline, move |index: usize, step: &Step, _ctx: &ExecutionContext| {
        let name = step.display_name(index);
        if index == failing_index {
            StepResult::begin(index, name).finish(StepStatus::Failed, 2, "", "boom")
        } else {
            StepResult::begin(index, name).exited(0, "ok", "")
        }
    })
}

pub fn run_with<E: StepExecutor>(pipeline: Pipeline, executor: E) -> RunOutcome {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);

    let mut engine = ExecutionEngine::new(executor);
    engine.add_event_handler(move |event| sink.borrow_mut().push(event.clone()));

    let mut context = ExecutionContext::new(Some(pipeline), "/build");
    let status = engine.execute(&mut context).expect("fresh context should run");

    let events = events.borrow().clone();
    RunOutcome {
        status,
        context,
        events,
    }
}

pub fn assert_step_statuses(outcome: &RunOutcome, expected: &[StepStatus]) {
    let actual: Vec<StepStatus> = outcome
        .context
        .step_results()
        .iter()
        .map(|r| r.status())
        .collect();
    assert_eq!(actual, expected, "unexpected step statuses");
}
