//! Resolve which pipeline applies to a trigger channel

use crate::core::document::{Pipeline, PipelineDocument, PipelineGroup};
use crate::core::error::LookupError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// YAML names of the keyed channels, in validation order
pub const CHANNELS: [&str; 4] = ["branches", "pull-requests", "custom", "tags"];

/// Which pipeline to run.
///
/// Keys are matched exactly; resolving a real branch name against glob keys
/// such as `feature/*` is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PipelineSelector {
    Default,
    Branch(String),
    PullRequest(String),
    Custom(String),
    Tag(String),
}

/// Presence of the `default` channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState<'a> {
    /// Key not declared
    Absent,
    /// Key declared with no steps
    Empty,
    Populated(&'a Pipeline),
}

impl PipelineSelector {
    /// Channel name as used in the YAML document
    pub fn channel(&self) -> &'static str {
        match self {
            PipelineSelector::Default => "default",
            PipelineSelector::Branch(_) => CHANNELS[0],
            PipelineSelector::PullRequest(_) => CHANNELS[1],
            PipelineSelector::Custom(_) => CHANNELS[2],
            PipelineSelector::Tag(_) => CHANNELS[3],
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            PipelineSelector::Default => None,
            PipelineSelector::Branch(key)
            | PipelineSelector::PullRequest(key)
            | PipelineSelector::Custom(key)
            | PipelineSelector::Tag(key) => Some(key),
        }
    }
}

impl fmt::Display for PipelineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => write!(f, "{}.{}", self.channel(), key),
            None => f.write_str(self.channel()),
        }
    }
}

impl FromStr for PipelineSelector {
    type Err = LookupError;

    /// Parse a qualified name such as `branches.release/1.2`; the key is
    /// everything after the first dot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "default" {
            return Ok(PipelineSelector::Default);
        }

        let (channel, key) = s
            .split_once('.')
            .filter(|(_, key)| !key.is_empty())
            .ok_or_else(|| LookupError::InvalidSelector(s.to_string()))?;
        let key = key.to_string();

        match channel {
            "branches" => Ok(PipelineSelector::Branch(key)),
            "pull-requests" => Ok(PipelineSelector::PullRequest(key)),
            "custom" => Ok(PipelineSelector::Custom(key)),
            "tags" => Ok(PipelineSelector::Tag(key)),
            _ => Err(LookupError::InvalidSelector(s.to_string())),
        }
    }
}

impl PipelineGroup {
    /// Three-way view of the `default` channel
    pub fn default_state(&self) -> ChannelState<'_> {
        match &self.default {
            None => ChannelState::Absent,
            Some(pipeline) if pipeline.is_empty() => ChannelState::Empty,
            Some(pipeline) => ChannelState::Populated(pipeline),
        }
    }

    /// Whether any channel holds something to run
    pub fn has_any_pipeline(&self) -> bool {
        matches!(self.default_state(), ChannelState::Populated(_))
            || !self.branches.is_empty()
            || !self.pull_requests.is_empty()
            || !self.custom.is_empty()
            || !self.tags.is_empty()
    }

    fn keyed(&self, selector: &PipelineSelector) -> Option<&BTreeMap<String, Pipeline>> {
        match selector {
            PipelineSelector::Default => None,
            PipelineSelector::Branch(_) => Some(&self.branches),
            PipelineSelector::PullRequest(_) => Some(&self.pull_requests),
            PipelineSelector::Custom(_) => Some(&self.custom),
            PipelineSelector::Tag(_) => Some(&self.tags),
        }
    }
}

impl PipelineDocument {
    /// Find the pipeline matching `selector`
    pub fn select(&self, selector: &PipelineSelector) -> Result<&Pipeline, LookupError> {
        let not_found = || LookupError::NotFound(selector.to_string());
        let group = self.pipelines.as_ref().ok_or_else(not_found)?;

        match (selector, group.keyed(selector)) {
            (PipelineSelector::Default, _) => match group.default_state() {
                ChannelState::Populated(pipeline) => Ok(pipeline),
                ChannelState::Absent | ChannelState::Empty => Err(not_found()),
            },
            (_, Some(map)) => selector
                .key()
                .and_then(|key| map.get(key))
                .ok_or_else(not_found),
            (_, None) => Err(not_found()),
        }
    }

    /// The default pipeline; `None` when the channel is absent or empty
    pub fn default_pipeline(&self) -> Option<&Pipeline> {
        self.select(&PipelineSelector::Default).ok()
    }

    pub fn branch_pipeline(&self, branch: &str) -> Option<&Pipeline> {
        self.select(&PipelineSelector::Branch(branch.to_string())).ok()
    }

    pub fn pull_request_pipeline(&self, pattern: &str) -> Option<&Pipeline> {
        self.select(&PipelineSelector::PullRequest(pattern.to_string())).ok()
    }

    pub fn custom_pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.select(&PipelineSelector::Custom(name.to_string())).ok()
    }

    pub fn tag_pipeline(&self, pattern: &str) -> Option<&Pipeline> {
        self.select(&PipelineSelector::Tag(pattern.to_string())).ok()
    }

    /// Every declared pipeline, `default` first when it is declared
    pub fn list_pipelines(&self) -> Vec<PipelineSelector> {
        let Some(group) = &self.pipelines else {
            return Vec::new();
        };

        let mut selectors = Vec::new();
        if group.default.is_some() {
            selectors.push(PipelineSelector::Default);
        }
        selectors.extend(group.branches.keys().cloned().map(PipelineSelector::Branch));
        selectors.extend(group.pull_requests.keys().cloned().map(PipelineSelector::PullRequest));
        selectors.extend(group.custom.keys().cloned().map(PipelineSelector::Custom));
        selectors.extend(group.tags.keys().cloned().map(PipelineSelector::Tag));
        selectors
    }
}
