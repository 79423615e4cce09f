//! Loading model bundles from disk

mod common;

use common::{linear_model_json, write_bundle};
use serde_json::json;
use symptriage::config::Config;
use symptriage::ensemble::ModelBundle;
use symptriage::normalizer::StructuredInput;
use symptriage::schema::ClassLabelSpace;
use symptriage::telemetry::TelemetryCollector;
use symptriage::{AdvisoryStatus, TriageError, TriagePipeline};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_bundle_loads_in_manifest_order() {
    let dir = TempDir::new().unwrap();
    write_bundle(dir.path(), "headache", 11);

    let bundle = ModelBundle::load(dir.path()).unwrap();
    assert_eq!(bundle.schema.len(), 132);
    assert_eq!(bundle.labels.len(), 41);

    let ensemble = bundle.into_ensemble().unwrap();
    assert_eq!(
        ensemble.model_names(),
        vec!["linear_0", "linear_1", "linear_2", "tree_3"]
    );
}

#[test]
fn test_shuffled_labels_refused_at_load() {
    let dir = TempDir::new().unwrap();
    write_bundle(dir.path(), "headache", 11);

    let mut shuffled = ClassLabelSpace::reference().labels().to_vec();
    shuffled.swap(3, 4);
    std::fs::write(
        dir.path().join("model_2.json"),
        linear_model_json("headache", 11, &shuffled).to_string(),
    )
    .unwrap();

    let result = ModelBundle::load(dir.path()).unwrap().into_ensemble();
    match result {
        Err(TriageError::LabelMismatch { model, detail }) => {
            assert_eq!(model, "linear_2");
            assert!(detail.contains("class 3"));
        }
        other => panic!("expected label mismatch, got {:?}", other.map(|e| e.len())),
    }
}

#[test]
fn test_missing_model_file() {
    let dir = TempDir::new().unwrap();
    write_bundle(dir.path(), "headache", 11);
    std::fs::remove_file(dir.path().join("model_1.json")).unwrap();

    assert!(matches!(
        ModelBundle::load(dir.path()),
        Err(TriageError::ModelLoad(_))
    ));
}

#[test]
fn test_unknown_model_kind() {
    let dir = TempDir::new().unwrap();
    write_bundle(dir.path(), "headache", 11);
    std::fs::write(
        dir.path().join("model_0.json"),
        json!({"kind": "pickle", "blob": "..."}).to_string(),
    )
    .unwrap();

    assert!(matches!(
        ModelBundle::load(dir.path()),
        Err(TriageError::ModelLoad(_))
    ));
}

#[tokio::test]
async fn test_loaded_bundle_predicts_end_to_end() {
    let dir = TempDir::new().unwrap();
    write_bundle(dir.path(), "headache", 11);

    let mut config = Config::default();
    config.advisor.enabled = false;
    config.evidence.structured = 1;
    config.models.bundle = Some(dir.path().to_string_lossy().into_owned());

    let ensemble = ModelBundle::load(&config.bundle_path().unwrap())
        .unwrap()
        .into_ensemble()
        .unwrap();
    let pipeline =
        TriagePipeline::from_config(&config, Arc::new(ensemble), TelemetryCollector::new()).unwrap();

    let mut picks = StructuredInput::new();
    picks.insert("headache".to_string(), 1);
    picks.insert("nausea".to_string(), 1);

    let report = pipeline.triage_structured(&picks).await.unwrap();
    assert_eq!(report.bundle.predicted_disease, "Migraine");
    assert_eq!(report.votes.len(), 4);
    assert!(report.tally.is_unanimous());
    assert_eq!(report.advisory, AdvisoryStatus::Disabled);
    assert_eq!(pipeline.telemetry().get_stats().models_invoked, 4);
}
