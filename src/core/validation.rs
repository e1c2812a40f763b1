//! Structural validation of a decoded pipeline document
//!
//! Rules are checked in a fixed order and the first failure is returned:
//!
//! 1. the `pipelines` group must be present
//! 2. a declared `default` channel must have steps
//! 3. every branch, pull-request, custom and tag pipeline must have steps
//! 4. every step must have at least one script line
//! 5. at least one pipeline must be defined somewhere
//!
//! Steps may reference services and caches that are not in `definitions`;
//! references are not checked here.

use crate::core::document::{Pipeline, PipelineDocument, PipelineGroup};
use crate::core::error::ValidationError;
use crate::core::selector::{ChannelState, CHANNELS};
use tracing::debug;

/// Validate a decoded document
pub fn validate(document: &PipelineDocument) -> Result<(), ValidationError> {
    let group = document
        .pipelines
        .as_ref()
        .ok_or(ValidationError::MissingPipelines)?;

    match group.default_state() {
        ChannelState::Absent => {}
        ChannelState::Empty => {
            return Err(ValidationError::EmptyPipeline {
                name: "default".to_string(),
            })
        }
        ChannelState::Populated(pipeline) => validate_pipeline("default", pipeline)?,
    }

    // BTreeMap iteration keeps the reported error stable across runs
    for (channel, pipelines) in keyed_channels(group) {
        for (key, pipeline) in pipelines {
            validate_pipeline(&format!("{}.{}", channel, key), pipeline)?;
        }
    }

    if !group.has_any_pipeline() {
        return Err(ValidationError::NoPipelines);
    }

    Ok(())
}

fn keyed_channels(
    group: &PipelineGroup,
) -> [(&'static str, &std::collections::BTreeMap<String, Pipeline>); 4] {
    [
        (CHANNELS[0], &group.branches),
        (CHANNELS[1], &group.pull_requests),
        (CHANNELS[2], &group.custom),
        (CHANNELS[3], &group.tags),
    ]
}

fn validate_pipeline(name: &str, pipeline: &Pipeline) -> Result<(), ValidationError> {
    if pipeline.is_empty() {
        return Err(ValidationError::EmptyPipeline {
            name: name.to_string(),
        });
    }

    for (index, step) in pipeline.steps().enumerate() {
        if step.script.is_empty() {
            return Err(ValidationError::MissingScript {
                step: index + 1,
                pipeline: name.to_string(),
            });
        }
    }

    debug!("Pipeline '{}' is valid ({} steps)", name, pipeline.len());
    Ok(())
}

impl PipelineDocument {
    /// Validate the pipeline document
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(self)
    }
}
