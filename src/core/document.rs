//! Pipeline document schema (`bitbucket-pipelines.yml`)

use crate::core::cache::{decode_with_fallback, deserialize_caches, CacheDefinition, Shape};
use crate::core::error::{DecodeError, Error, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up when no pipeline file is given
pub const DEFAULT_PIPELINE_FILE: &str = "bitbucket-pipelines.yml";

/// Root of a pipeline document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDocument {
    /// Default build image for steps without their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone: Option<CloneSettings>,

    /// Trigger channels; required, checked by the validator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipelines: Option<PipelineGroup>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Definitions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
}

/// Repository clone settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// History depth to fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,

    /// Fetch Git LFS objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lfs: Option<bool>,
}

/// The five trigger channels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineGroup {
    /// Runs for every push without a more specific match.
    ///
    /// `None` and `Some(empty)` are distinct: the latter is a declared
    /// channel with no steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Pipeline>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub branches: BTreeMap<String, Pipeline>,

    #[serde(default, rename = "pull-requests", skip_serializing_if = "BTreeMap::is_empty")]
    pub pull_requests: BTreeMap<String, Pipeline>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, Pipeline>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, Pipeline>,
}

/// Ordered steps of one pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    entries: Vec<StepEntry>,
}

/// A `- step:` list item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEntry {
    pub step: Step,
}

/// A single step in a pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Overrides the document image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Shell commands, run in order. Must not be empty.
    #[serde(default)]
    pub script: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Artifacts>,

    /// Cache names, predefined or from `definitions.caches`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caches: Vec<String>,

    /// Commands run whether or not the script succeeded
    #[serde(default, rename = "after-script", skip_serializing_if = "Vec::is_empty")]
    pub after_script: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
}

/// Paths persisted after a step.
///
/// Accepts both `artifacts: [dist/**]` and `artifacts: {paths: [dist/**]}`;
/// always encoded in the object form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Artifacts {
    pub paths: Vec<String>,
}

#[derive(Deserialize)]
struct ArtifactsObject {
    #[serde(default)]
    paths: Vec<String>,
}

impl<'de> Deserialize<'de> for Artifacts {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let paths = match decode_with_fallback::<Vec<String>, ArtifactsObject>(Value::deserialize(d)?)
            .map_err(D::Error::custom)?
        {
            Shape::Simple(paths) => paths,
            Shape::Structured(object) => object.paths,
        };
        Ok(Artifacts { paths })
    }
}

/// Path-based skip rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changesets: Option<Changesets>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changesets {
    #[serde(default, rename = "includePaths", skip_serializing_if = "Vec::is_empty")]
    pub include_paths: Vec<String>,
}

/// Named templates referenced from steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, ServiceDefinition>,

    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_caches"
    )]
    pub caches: BTreeMap<String, CacheDefinition>,
}

/// A sidecar service container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    #[serde(default)]
    pub image: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
}

/// Global options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Enable the docker service for every step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<bool>,

    /// Build size, e.g. `2x`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl Pipeline {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            entries: steps.into_iter().map(|step| StepEntry { step }).collect(),
        }
    }

    /// Steps in execution order
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.entries.iter().map(|entry| &entry.step)
    }

    /// Step at a zero-based position
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.entries.get(index).map(|entry| &entry.step)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Step {
    /// Create a step running the given commands
    pub fn with_script<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Step {
            script: script.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Builder-style name setter
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name shown in output, falling back to the 1-based position
    pub fn display_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("step {}", index + 1),
        }
    }
}

impl PipelineDocument {
    /// Decode YAML without applying validation rules
    ///
    /// Merge keys (`<<: *anchor`) are expanded before the schema is applied.
    pub fn decode(yaml: &str) -> std::result::Result<Self, DecodeError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        if has_merge_keys(&value) {
            return Self::decode_merged(value);
        }
        // Decoding from text keeps field paths and positions in errors
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Decode raw bytes without applying validation rules
    pub fn decode_slice(bytes: &[u8]) -> std::result::Result<Self, DecodeError> {
        let value: Value = serde_yaml::from_slice(bytes)?;
        if has_merge_keys(&value) {
            return Self::decode_merged(value);
        }
        Ok(serde_yaml::from_slice(bytes)?)
    }

    fn decode_merged(mut value: Value) -> std::result::Result<Self, DecodeError> {
        value.apply_merge()?;
        debug!("Expanded YAML merge keys");
        Ok(serde_yaml::from_value(value)?)
    }

    /// Parse and validate a pipeline document from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document = Self::decode(yaml)?;
        document.validate()?;
        Ok(document)
    }

    /// Load and validate a pipeline document from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading pipeline file {}", path.display());
        let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::decode_slice(&bytes)?;
        document.validate()?;
        Ok(document)
    }

    /// Path of `bitbucket-pipelines.yml` inside `dir`, if it exists
    pub fn locate_default<P: AsRef<Path>>(dir: P) -> std::result::Result<PathBuf, DecodeError> {
        let dir = dir.as_ref();
        let path = dir.join(DEFAULT_PIPELINE_FILE);
        if path.is_file() {
            Ok(path)
        } else {
            Err(DecodeError::NotFound {
                file_name: DEFAULT_PIPELINE_FILE.to_string(),
                dir: dir.to_path_buf(),
            })
        }
    }

    /// Encode the document back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::Encode)
    }
}

fn has_merge_keys(value: &Value) -> bool {
    match value {
        Value::Mapping(mapping) => mapping
            .iter()
            .any(|(key, value)| key.as_str() == Some("<<") || has_merge_keys(value)),
        Value::Sequence(items) => items.iter().any(has_merge_keys),
        Value::Tagged(tagged) => has_merge_keys(&tagged.value),
        _ => false,
    }
}
