//! Runner configuration (`bitbucket-runner.yml`)
//!
//! Tool-level defaults handed to whatever executes steps: images per step
//! type, volumes, ports, timeouts, logging and Docker settings. Nothing in
//! this crate enforces them.

use crate::core::error::RunnerConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

type Result<T> = std::result::Result<T, RunnerConfigError>;

/// Tool configuration and step type mappings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunnerConfig {
    pub version: String,
    pub step_types: HashMap<String, StepType>,
    pub environment: HashMap<String, String>,
    pub defaults: DefaultConfig,
    pub logging: LoggingConfig,
    pub docker: DockerConfig,
}

/// Container settings for one kind of step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepType {
    pub image: String,
    pub environment: HashMap<String, String>,
    pub volumes: Vec<VolumeMount>,
    pub ports: Vec<PortMapping>,
    /// Seconds
    pub timeout: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeMount {
    pub host: String,
    pub container: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DefaultConfig {
    pub image: String,
    pub working_dir: String,
    /// Seconds
    pub timeout: u64,
    pub shell: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DockerConfig {
    pub host: String,
    pub api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    pub pull_policy: String,
}

const DEFAULT_IMAGE: &str = "ubuntu:20.04";
const DEFAULT_TIMEOUT_SECS: u64 = 3600;

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            working_dir: "/opt/atlassian/pipelines/agent/build".to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            shell: "/bin/bash".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            output_file: None,
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: "unix:///var/run/docker.sock".to_string(),
            api_version: "1.41".to_string(),
            registry: None,
            pull_policy: "missing".to_string(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let mut step_types = HashMap::new();
        step_types.insert(
            "default".to_string(),
            StepType {
                image: DEFAULT_IMAGE.to_string(),
                timeout: DEFAULT_TIMEOUT_SECS,
                ..Default::default()
            },
        );

        Self {
            version: "1.0".to_string(),
            step_types,
            environment: HashMap::new(),
            defaults: DefaultConfig::default(),
            logging: LoggingConfig::default(),
            docker: DockerConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Parse and validate; fields missing from `yaml` keep their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RunnerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load runner configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RunnerConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Candidate locations, most specific first
    pub fn default_search_paths(home: Option<&Path>) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = [
            "bitbucket-runner.yml",
            "bitbucket-runner.yaml",
            ".bitbucket-runner.yml",
            ".bitbucket-runner.yaml",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        if let Some(home) = home {
            paths.push(home.join(".bitbucket-runner.yml"));
            paths.push(home.join(".config").join("bitbucket-runner").join("config.yml"));
        }
        paths
    }

    /// Load the first existing candidate, or fall back to built-in defaults
    pub fn resolve<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if path.is_file() {
                info!("Using runner config {}", path.display());
                return Self::from_file(path);
            }
        }
        debug!("No runner config found, using defaults");
        Ok(Self::default())
    }

    /// [`RunnerConfig::resolve`] over [`RunnerConfig::default_search_paths`]
    pub fn load_default() -> Result<Self> {
        let home = dirs::home_dir();
        Self::resolve(&Self::default_search_paths(home.as_deref()))
    }

    /// Validate the runner configuration
    pub fn validate(&self) -> Result<()> {
        if self.version.is_empty() {
            return Err(RunnerConfigError::Invalid("version is required".to_string()));
        }
        if self.defaults.image.is_empty() {
            return Err(RunnerConfigError::Invalid("default image is required".to_string()));
        }
        if self.defaults.timeout == 0 {
            return Err(RunnerConfigError::Invalid(
                "default timeout must be positive".to_string(),
            ));
        }

        let mut names: Vec<_> = self.step_types.keys().collect();
        names.sort();
        for name in names {
            let step_type = &self.step_types[name];
            if step_type.image.is_empty() {
                return Err(RunnerConfigError::Invalid(format!(
                    "step type '{}' must have an image",
                    name
                )));
            }
            if step_type.timeout == 0 {
                return Err(RunnerConfigError::Invalid(format!(
                    "step type '{}' timeout must be positive",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn step_type(&self, name: &str) -> Option<&StepType> {
        self.step_types.get(name)
    }

    /// The `default` step type, or one built from `defaults`
    pub fn default_step_type(&self) -> StepType {
        self.step_types.get("default").cloned().unwrap_or_else(|| StepType {
            image: self.defaults.image.clone(),
            timeout: self.defaults.timeout,
            ..Default::default()
        })
    }

    /// Write the configuration as YAML
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml).map_err(|source| RunnerConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RunnerConfig::default();
        config.validate().expect("built-in defaults should validate");
        assert_eq!(config.version, "1.0");
        assert_eq!(config.defaults.image, "ubuntu:20.04");
        assert_eq!(config.defaults.working_dir, "/opt/atlassian/pipelines/agent/build");
        assert_eq!(config.defaults.timeout, 3600);
        assert_eq!(config.defaults.shell, "/bin/bash");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.docker.pull_policy, "missing");
        assert_eq!(config.step_type("default").unwrap().timeout, 3600);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = RunnerConfig::from_yaml(
            r#"
defaults:
  image: alpine:3.19
stepTypes:
  node:
    image: node:18
    timeout: 600
    volumes:
      - host: /tmp/cache
        container: /cache
        readOnly: true
    ports:
      - host: 8080
        container: 80
        protocol: tcp
logging:
  level: debug
"#,
        )
        .unwrap();

        assert_eq!(config.defaults.image, "alpine:3.19");
        assert_eq!(config.defaults.shell, "/bin/bash");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.docker.api_version, "1.41");

        let node = config.step_type("node").unwrap();
        assert_eq!(node.image, "node:18");
        assert!(node.volumes[0].read_only);
        assert_eq!(node.ports[0].container, 80);
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            ("version: \"\"\n", "version is required"),
            ("defaults:\n  image: \"\"\n", "default image is required"),
            ("defaults:\n  timeout: 0\n", "default timeout must be positive"),
            ("stepTypes:\n  go:\n    timeout: 10\n", "step type 'go' must have an image"),
            ("stepTypes:\n  go:\n    image: golang\n", "step type 'go' timeout must be positive"),
        ];
        for (yaml, expected) in cases {
            let err = RunnerConfig::from_yaml(yaml).unwrap_err();
            assert!(err.to_string().contains(expected), "{}: got {}", expected, err);
        }
    }

    #[test]
    fn test_default_step_type_fallback() {
        let mut config = RunnerConfig::default();
        config.step_types.clear();
        config.defaults.image = "debian:12".to_string();
        let step_type = config.default_step_type();
        assert_eq!(step_type.image, "debian:12");
        assert_eq!(step_type.timeout, 3600);
        assert!(config.step_type("default").is_none());
    }

    #[test]
    fn test_resolve_first_existing_wins() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yml");
        let first = dir.path().join("first.yml");
        let second = dir.path().join("second.yml");
        std::fs::write(&first, "defaults:\n  image: first:1\n").unwrap();
        std::fs::write(&second, "defaults:\n  image: second:1\n").unwrap();

        let config = RunnerConfig::resolve(&[missing.clone(), first, second]).unwrap();
        assert_eq!(config.defaults.image, "first:1");

        let config = RunnerConfig::resolve(&[missing]).unwrap();
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn test_resolve_propagates_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yml");
        std::fs::write(&path, "defaults:\n  timeout: 0\n").unwrap();
        assert!(RunnerConfig::resolve(&[path]).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.yml");
        let mut config = RunnerConfig::default();
        config.environment.insert("CI".to_string(), "true".to_string());
        config.save_to_file(&path).unwrap();

        assert_eq!(RunnerConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_search_paths() {
        let paths = RunnerConfig::default_search_paths(Some(Path::new("/home/ci")));
        assert_eq!(paths.len(), 6);
        assert_eq!(paths[0], PathBuf::from("bitbucket-runner.yml"));
        assert_eq!(paths[5], PathBuf::from("/home/ci/.config/bitbucket-runner/config.yml"));
        assert_eq!(RunnerConfig::default_search_paths(None).len(), 4);
    }
}
