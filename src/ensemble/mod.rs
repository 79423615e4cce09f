//! Ensemble predictor
//!
//! Holds the independently trained classifiers and runs every one of them
//! on the same vector. There is no partial-failure tolerance: one failing
//! voter fails the request, since dropping it would silently change the
//! vote.
//!
//! Feature layout and label ordering are checked when the ensemble is
//! built, so `predict` only has to check the vector it is handed.

pub mod bundle;
pub mod models;

pub use bundle::{BundleEntry, BundleManifest, ModelBundle};
pub use models::{LinearModel, ModelSpec, Tree, TreeEnsembleModel, TreeNode};

use crate::errors::{Result, TriageError};
use crate::normalizer::SymptomVector;
use crate::schema::{ClassLabelSpace, FeatureSchema};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// An opaque pre-trained classifier
pub trait ClassifierModel: Send + Sync {
    /// Name used in logs and vote reports
    fn name(&self) -> &str;

    /// Feature ordering the model was trained on
    fn feature_names(&self) -> &[String];

    /// Label ordering the model was trained on
    fn class_labels(&self) -> &[String];

    /// Predict class indices for one row of features
    ///
    /// Vectorised models may return a batch; only the first element is used.
    fn predict(&self, features: &[u8]) -> Result<Vec<i64>>;
}

/// One classifier's contribution to a prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelVote {
    pub model: String,
    pub index: i64,
    #[serde(skip)]
    pub duration: Duration,
}

/// Fixed set of classifiers sharing one schema and label space
pub struct EnsemblePredictor {
    schema: Arc<FeatureSchema>,
    labels: Arc<ClassLabelSpace>,
    models: Vec<Arc<dyn ClassifierModel>>,
}

impl std::fmt::Debug for EnsemblePredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsemblePredictor")
            .field("features", &self.schema.len())
            .field("classes", &self.labels.len())
            .field("models", &self.model_names())
            .finish()
    }
}

impl EnsemblePredictor {
    /// Build an ensemble, verifying every model against the shared tables
    pub fn new(
        schema: Arc<FeatureSchema>,
        labels: Arc<ClassLabelSpace>,
        models: Vec<Arc<dyn ClassifierModel>>,
    ) -> Result<Self> {
        if models.is_empty() {
            return Err(TriageError::EmptyEnsemble);
        }

        for model in &models {
            if let Some(detail) = schema.diff(model.feature_names()) {
                return Err(TriageError::SchemaMismatch {
                    model: model.name().to_string(),
                    detail,
                });
            }
            if let Some(detail) = labels.diff(model.class_labels()) {
                return Err(TriageError::LabelMismatch {
                    model: model.name().to_string(),
                    detail,
                });
            }
        }

        Ok(Self {
            schema,
            labels,
            models,
        })
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn labels(&self) -> &Arc<ClassLabelSpace> {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name().to_string()).collect()
    }

    /// Run every model in configured order, returning their class indices
    pub fn predict(&self, vector: &SymptomVector) -> Result<Vec<i64>> {
        Ok(self
            .predict_votes(vector)?
            .into_iter()
            .map(|vote| vote.index)
            .collect())
    }

    /// Run every model in configured order, keeping per-model detail
    pub fn predict_votes(&self, vector: &SymptomVector) -> Result<Vec<ModelVote>> {
        if vector.len() != self.schema.len() {
            return Err(TriageError::VectorLength {
                expected: self.schema.len(),
                actual: vector.len(),
            });
        }
        if let Some(detail) = self.schema.diff(vector.schema().identifiers()) {
            return Err(TriageError::SchemaMismatch {
                model: "input vector".to_string(),
                detail,
            });
        }

        let features = vector.as_slice();
        let mut votes = Vec::with_capacity(self.models.len());

        for model in &self.models {
            let started = Instant::now();
            let output = model.predict(features).map_err(|e| {
                error!(model = model.name(), error = %e, "classifier failed");
                match e {
                    TriageError::ClassifierInvocation { .. } => e,
                    other => TriageError::ClassifierInvocation {
                        model: model.name().to_string(),
                        reason: other.to_string(),
                    },
                }
            })?;

            let index = output.first().copied().ok_or_else(|| {
                TriageError::ClassifierInvocation {
                    model: model.name().to_string(),
                    reason: "model returned an empty prediction".to_string(),
                }
            })?;

            let duration = started.elapsed();
            debug!(model = model.name(), index, elapsed_us = duration.as_micros() as u64, "model vote");

            votes.push(ModelVote {
                model: model.name().to_string(),
                index,
                duration,
            });
        }

        Ok(votes)
    }
}
