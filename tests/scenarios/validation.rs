//! Test: structural validation of whole documents

use bitbucket_runner::core::{Error, PipelineDocument, ValidationError};

fn validation_error(yaml: &str) -> ValidationError {
    match PipelineDocument::from_yaml(yaml) {
        Err(Error::Validation(err)) => err,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_document_without_pipelines() {
    let err = validation_error("image: alpine\n");
    assert_eq!(err, ValidationError::MissingPipelines);
    assert_eq!(err.rule(), 1);
}

#[test]
fn test_declared_but_empty_default() {
    let err = validation_error("pipelines:\n  default: []\n");
    assert_eq!(
        err,
        ValidationError::EmptyPipeline {
            name: "default".to_string()
        }
    );
    assert_eq!(err.rule(), 2);
}

#[test]
fn test_empty_custom_pipeline_is_named() {
    let yaml = r#"
pipelines:
  custom:
    deploy: []
"#;
    let err = validation_error(yaml);
    assert_eq!(err.to_string(), "pipeline 'custom.deploy' has no steps defined");
}

#[test]
fn test_step_without_script() {
    let yaml = r#"
pipelines:
  default:
    - step:
        script: [make]
    - step:
        name: Nothing to do
"#;
    let err = validation_error(yaml);
    assert_eq!(
        err.to_string(),
        "step 2 in pipeline 'default' has no script defined"
    );
    assert_eq!(err.rule(), 4);
}

#[test]
fn test_empty_group() {
    let err = validation_error("pipelines: {}\n");
    assert_eq!(err, ValidationError::NoPipelines);
    assert_eq!(err.rule(), 5);
}

#[test]
fn test_decode_skips_validation() {
    let document = PipelineDocument::decode("pipelines:\n  default: []\n").unwrap();
    assert!(document.validate().is_err());
}
