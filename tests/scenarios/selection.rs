//! Test: resolving selectors against a document

use crate::helpers::*;
use bitbucket_runner::core::{LookupError, PipelineDocument, PipelineSelector};

#[test]
fn test_every_channel_resolves() {
    let document = PipelineDocument::from_yaml(FULL_DOCUMENT).unwrap();

    let first_command = |selector: &str| {
        let selector: PipelineSelector = selector.parse().unwrap();
        document.select(&selector).unwrap().step(0).unwrap().script[0].clone()
    };

    assert_eq!(first_command("default"), "npm ci");
    assert_eq!(first_command("branches.main"), "./deploy.sh production");
    assert_eq!(first_command("branches.feature/*"), "npm run lint");
    assert_eq!(first_command("pull-requests.**"), "npm test");
    assert_eq!(first_command("custom.nightly"), "./nightly.sh");
    assert_eq!(first_command("tags.v*"), "./release.sh");
}

#[test]
fn test_keys_match_exactly() {
    let document = PipelineDocument::from_yaml(FULL_DOCUMENT).unwrap();
    assert!(document.branch_pipeline("feature/login").is_none());

    let err = document
        .select(&PipelineSelector::Custom("weekly".to_string()))
        .unwrap_err();
    assert_eq!(err, LookupError::NotFound("custom.weekly".to_string()));
}

#[test]
fn test_list_pipelines_order() {
    let document = PipelineDocument::from_yaml(FULL_DOCUMENT).unwrap();
    let names: Vec<String> = document
        .list_pipelines()
        .iter()
        .map(ToString::to_string)
        .collect();

    assert_eq!(
        names,
        vec![
            "default",
            "branches.feature/*",
            "branches.main",
            "pull-requests.**",
            "custom.nightly",
            "tags.v*",
        ]
    );
}

#[test]
fn test_missing_default_channel() {
    let yaml = r#"
pipelines:
  custom:
    deploy:
      - step:
          script: [./deploy.sh]
"#;
    let document = PipelineDocument::from_yaml(yaml).unwrap();
    assert!(document.default_pipeline().is_none());
    assert!(document.custom_pipeline("deploy").is_some());
}
