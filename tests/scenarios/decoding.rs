//! Test: decoding documents, polymorphic caches and round trips

use crate::helpers::*;
use bitbucket_runner::core::{CacheDefinition, DecodeError, Error, PipelineDocument};

#[test]
fn test_full_document_decodes() {
    let document = PipelineDocument::from_yaml(FULL_DOCUMENT).unwrap();

    assert_eq!(document.image.as_deref(), Some("node:18"));
    assert_eq!(document.clone.as_ref().and_then(|c| c.depth), Some(50));

    let default = document.default_pipeline().unwrap();
    assert_eq!(default.len(), 2);

    let build = default.step(0).unwrap();
    assert_eq!(build.name.as_deref(), Some("Build"));
    assert_eq!(build.script, vec!["npm ci", "npm run build"]);
    assert_eq!(build.caches, vec!["npm"]);
    assert_eq!(build.artifacts.as_ref().unwrap().paths, vec!["dist/**"]);

    let test = default.step(1).unwrap();
    assert_eq!(test.services, vec!["postgres"]);
}

#[test]
fn test_cache_definitions_keep_their_shape() {
    let document = PipelineDocument::from_yaml(FULL_DOCUMENT).unwrap();
    let caches = &document.definitions.as_ref().unwrap().caches;

    assert_eq!(caches["npm"], CacheDefinition::Named("~/.npm".to_string()));
    assert_eq!(caches["npm"].name(), Some("~/.npm"));

    let sbt = &caches["sbt"];
    assert!(!sbt.is_named());
    assert_eq!(sbt.key(), Some("build.sbt"));
    assert_eq!(sbt.paths(), ["~/.sbt", "~/.ivy2/cache"]);
}

#[test]
fn test_wrongly_typed_cache_paths_are_rejected() {
    let yaml = r#"
definitions:
  caches:
    broken:
      paths: [1]
pipelines:
  default:
    - step:
        script: [echo hi]
"#;
    let err = PipelineDocument::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, Error::Decode(DecodeError::Yaml(_))), "got {:?}", err);
    assert!(err.to_string().starts_with("failed to unmarshal YAML"));
    assert!(err.to_string().contains("broken.paths[0]"), "got {}", err);
}

#[test]
fn test_anchored_step_reused_with_overrides() {
    let yaml = r#"
definitions:
  steps:
    - step: &base
        name: Base
        script:
          - make
pipelines:
  default:
    - step: *base
    - step:
        <<: *base
        name: Override
"#;
    let document = PipelineDocument::from_yaml(yaml).unwrap();
    let default = document.default_pipeline().unwrap();
    assert_eq!(default.step(1).unwrap().name.as_deref(), Some("Override"));
    assert_eq!(default.step(1).unwrap().script, vec!["make"]);
}

#[test]
fn test_round_trip_preserves_document() {
    let document = PipelineDocument::from_yaml(FULL_DOCUMENT).unwrap();
    let encoded = document.to_yaml().unwrap();
    let decoded = PipelineDocument::from_yaml(&encoded).unwrap();
    assert_eq!(decoded, document);
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineDocument::from_file(dir.path().join("nope.yml")).unwrap_err();
    assert!(err.to_string().contains("nope.yml"));
}

#[test]
fn test_locate_default_file_in_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(PipelineDocument::locate_default(dir.path()).is_err());

    let path = dir.path().join("bitbucket-pipelines.yml");
    std::fs::write(&path, FULL_DOCUMENT).unwrap();
    assert_eq!(PipelineDocument::locate_default(dir.path()).unwrap(), path);

    let document = PipelineDocument::from_file(&path).unwrap();
    assert_eq!(document.list_pipelines().len(), 6);
}
