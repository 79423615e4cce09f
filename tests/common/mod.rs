//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use symptriage::advisor::Advisor;
use symptriage::ensemble::{ClassifierModel, EnsemblePredictor};
use symptriage::schema::{ClassLabelSpace, FeatureSchema};
use symptriage::{Result, TriageError};

/// Classifier that always answers the same index
pub struct ConstantModel {
    name: String,
    features: Vec<String>,
    classes: Vec<String>,
    index: i64,
}

impl ClassifierModel for ConstantModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn class_labels(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, _features: &[u8]) -> Result<Vec<i64>> {
        Ok(vec![self.index])
    }
}

/// Ensemble over the reference tables whose voters answer `indices`
pub fn constant_ensemble(indices: &[i64]) -> Arc<EnsemblePredictor> {
    let schema = Arc::new(FeatureSchema::reference());
    let labels = Arc::new(ClassLabelSpace::reference());
    let models = indices
        .iter()
        .enumerate()
        .map(|(i, index)| {
            Arc::new(ConstantModel {
                name: format!("voter_{}", i),
                features: schema.identifiers().to_vec(),
                classes: labels.labels().to_vec(),
                index: *index,
            }) as Arc<dyn ClassifierModel>
        })
        .collect();
    Arc::new(EnsemblePredictor::new(schema, labels, models).unwrap())
}

/// Advisor with canned replies and call counters
pub struct CannedAdvisor {
    pub extraction: String,
    pub description: Option<String>,
    pub describe_calls: AtomicUsize,
}

impl CannedAdvisor {
    pub fn new(extraction: &str, description: Option<&str>) -> Self {
        Self {
            extraction: extraction.to_string(),
            description: description.map(str::to_string),
            describe_calls: AtomicUsize::new(0),
        }
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Advisor for CannedAdvisor {
    fn name(&self) -> &str {
        "canned"
    }

    async fn extract_symptoms(&self, _description: &str, _schema: &FeatureSchema) -> Result<String> {
        Ok(self.extraction.clone())
    }

    async fn describe_disease(&self, label: &str) -> Result<String> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.description
            .as_ref()
            .map(|text| format!("{} {}", label, text))
            .ok_or_else(|| TriageError::Advisor("service unavailable".to_string()))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Linear model file voting for `class` whenever `symptom` is present
pub fn linear_model_json(symptom: &str, class: usize, classes: &[String]) -> serde_json::Value {
    let schema = FeatureSchema::reference();
    let feature = schema.position(symptom).unwrap();

    let coefficients: Vec<Vec<f64>> = (0..classes.len())
        .map(|c| {
            let mut row = vec![0.0; schema.len()];
            if c == class {
                row[feature] = 2.0;
            }
            row
        })
        .collect();

    json!({
        "kind": "linear",
        "features": schema.identifiers(),
        "classes": classes,
        "coefficients": coefficients,
        "intercepts": vec![0.0; classes.len()],
    })
}

/// Single-stump tree model voting for `class` whenever `symptom` is present
pub fn tree_model_json(symptom: &str, class: usize, classes: &[String]) -> serde_json::Value {
    let schema = FeatureSchema::reference();
    let feature = schema.position(symptom).unwrap();

    json!({
        "kind": "tree_ensemble",
        "features": schema.identifiers(),
        "classes": classes,
        "trees": [{
            "class": class,
            "nodes": [
                {"feature": feature, "threshold": 0.5, "left": 1, "right": 2},
                {"value": 0.0},
                {"value": 3.0}
            ]
        }]
    })
}

/// Write a four-model bundle (three linear, one tree) voting for `class` on `symptom`
pub fn write_bundle(dir: &Path, symptom: &str, class: usize) {
    let classes = ClassLabelSpace::reference().labels().to_vec();

    let mut entries = Vec::new();
    for (i, kind) in ["linear", "linear", "linear", "tree"].iter().enumerate() {
        let file = format!("model_{}.json", i);
        let model = if *kind == "tree" {
            tree_model_json(symptom, class, &classes)
        } else {
            linear_model_json(symptom, class, &classes)
        };
        std::fs::write(dir.join(&file), model.to_string()).unwrap();
        entries.push(json!({"name": format!("{}_{}", kind, i), "path": file}));
    }

    let manifest = json!({
        "classes": classes,
        "models": entries,
    });
    std::fs::write(dir.join("bundle.json"), manifest.to_string()).unwrap();
}
