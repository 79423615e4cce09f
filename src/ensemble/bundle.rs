//! Model bundle loading
//!
//! A bundle is a directory with a `bundle.json` manifest naming the shared
//! feature and label tables and the ordered list of model files. Relative
//! model paths resolve against the manifest's directory.

use super::{ClassifierModel, EnsemblePredictor, ModelSpec};
use crate::errors::{Result, TriageError};
use crate::schema::{ClassLabelSpace, FeatureSchema};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "bundle.json";

/// One voter in the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleEntry {
    pub name: String,
    pub path: PathBuf,
}

/// `bundle.json` contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Feature ordering; the built-in reference schema when omitted
    #[serde(default)]
    pub features: Option<Vec<String>>,
    /// Label ordering; the built-in reference table when omitted
    #[serde(default)]
    pub classes: Option<Vec<String>>,
    /// Voters in invocation order
    pub models: Vec<BundleEntry>,
}

impl BundleManifest {
    pub fn schema(&self) -> Result<FeatureSchema> {
        match &self.features {
            Some(features) => FeatureSchema::new(features.clone()),
            None => Ok(FeatureSchema::reference()),
        }
    }

    pub fn labels(&self) -> Result<ClassLabelSpace> {
        match &self.classes {
            Some(classes) => ClassLabelSpace::new(classes.iter().map(|c| c.trim().to_string()).collect()),
            None => Ok(ClassLabelSpace::reference()),
        }
    }
}

/// Loaded bundle, ready to build an ensemble from
pub struct ModelBundle {
    pub root: PathBuf,
    pub schema: Arc<FeatureSchema>,
    pub labels: Arc<ClassLabelSpace>,
    pub models: Vec<Arc<dyn ClassifierModel>>,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("root", &self.root)
            .field("features", &self.schema.len())
            .field("classes", &self.labels.len())
            .field("models", &self.models.len())
            .finish()
    }
}

impl ModelBundle {
    /// Load a bundle from a directory or directly from a manifest path
    pub fn load(path: &Path) -> Result<Self> {
        let manifest_path = if path.is_dir() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        };
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let contents = fs::read_to_string(&manifest_path).map_err(|e| {
            TriageError::ModelLoad(format!("cannot read {}: {}", manifest_path.display(), e))
        })?;
        let manifest: BundleManifest = serde_json::from_str(&contents).map_err(|e| {
            TriageError::ModelLoad(format!("invalid manifest {}: {}", manifest_path.display(), e))
        })?;

        let schema = Arc::new(manifest.schema()?);
        let labels = Arc::new(manifest.labels()?);

        let mut models = Vec::with_capacity(manifest.models.len());
        for entry in &manifest.models {
            let model_path = if entry.path.is_absolute() {
                entry.path.clone()
            } else {
                root.join(&entry.path)
            };
            debug!(model = %entry.name, path = %model_path.display(), "loading model");
            models.push(load_model(&entry.name, &model_path)?);
        }

        info!(
            root = %root.display(),
            models = models.len(),
            features = schema.len(),
            classes = labels.len(),
            "model bundle loaded"
        );

        Ok(Self {
            root,
            schema,
            labels,
            models,
        })
    }

    /// Build the ensemble, checking every model against the shared tables
    pub fn into_ensemble(self) -> Result<EnsemblePredictor> {
        EnsemblePredictor::new(self.schema, self.labels, self.models)
    }
}

/// Load a single model file
pub fn load_model(name: &str, path: &Path) -> Result<Arc<dyn ClassifierModel>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| TriageError::ModelLoad(format!("cannot read {}: {}", path.display(), e)))?;
    let spec: ModelSpec = serde_json::from_str(&contents)
        .map_err(|e| TriageError::ModelLoad(format!("invalid model {}: {}", path.display(), e)))?;
    spec.into_model(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_bundle(dir: &Path, model_classes: &[&str]) {
        let features = ["cough", "fever"];
        let model = json!({
            "kind": "linear",
            "features": features,
            "classes": model_classes,
            "coefficients": [[1.0, 0.0], [0.0, 1.0]],
            "intercepts": [0.0, 0.0]
        });
        fs::write(dir.join("lr.json"), model.to_string()).unwrap();

        let manifest = json!({
            "features": features,
            "classes": ["Cold", "Flu "],
            "models": [{"name": "lr", "path": "lr.json"}]
        });
        fs::write(dir.join(MANIFEST_FILE), manifest.to_string()).unwrap();
    }

    #[test]
    fn test_load_bundle_directory() {
        let dir = TempDir::new().unwrap();
        write_bundle(dir.path(), &["Cold", "Flu"]);

        let bundle = ModelBundle::load(dir.path()).unwrap();
        assert_eq!(bundle.models.len(), 1);
        assert_eq!(bundle.labels.labels(), &["Cold".to_string(), "Flu".to_string()]);

        let ensemble = bundle.into_ensemble().unwrap();
        assert_eq!(ensemble.model_names(), vec!["lr"]);
    }

    #[test]
    fn test_label_mismatch_refused() {
        let dir = TempDir::new().unwrap();
        write_bundle(dir.path(), &["Flu", "Cold"]);

        let bundle = ModelBundle::load(&dir.path().join(MANIFEST_FILE)).unwrap();
        assert!(matches!(
            bundle.into_ensemble(),
            Err(TriageError::LabelMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ModelBundle::load(dir.path()),
            Err(TriageError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_padded_reference_labels_match_trimmed_table() {
        let padded: Vec<String> = ClassLabelSpace::reference()
            .labels()
            .iter()
            .map(|label| match label.as_str() {
                "Diabetes" | "Hypertension" => format!("{} ", label),
                other => other.to_string(),
            })
            .collect();
        let manifest = BundleManifest {
            features: None,
            classes: Some(padded.clone()),
            models: Vec::new(),
        };

        let labels = manifest.labels().unwrap();
        assert_eq!(labels, ClassLabelSpace::reference());
        assert_eq!(labels.get(7), Some("Diabetes"));
        assert!(ClassLabelSpace::reference().diff(&padded).is_none());
    }

    #[test]
    fn test_manifest_defaults_to_reference_tables() {
        let manifest: BundleManifest = serde_json::from_str(r#"{"models": []}"#).unwrap();
        assert_eq!(manifest.schema().unwrap().len(), 132);
        assert_eq!(manifest.labels().unwrap().len(), 41);
    }
}
