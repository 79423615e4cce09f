//! Serialized classifier formats
//!
//! Model files are JSON, tagged by `kind`:
//! - `linear`: one coefficient row and intercept per class, argmax of scores
//! - `tree_ensemble`: additive regression trees per class, argmax of margins
//!
//! Every file carries the feature and class ordering it was trained with so
//! the ensemble can refuse a model built against a different table.

use super::ClassifierModel;
use crate::errors::{Result, TriageError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A model file as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsembleModel),
}

impl ModelSpec {
    /// Check internal shapes and wrap as a classifier under `name`
    pub fn into_model(self, name: &str) -> Result<Arc<dyn ClassifierModel>> {
        match self {
            ModelSpec::Linear(mut model) => {
                model.name = name.to_string();
                model.validate()?;
                Ok(Arc::new(model))
            }
            ModelSpec::TreeEnsemble(mut model) => {
                model.name = name.to_string();
                model.validate()?;
                Ok(Arc::new(model))
            }
        }
    }
}

/// Index of the highest score; ties go to the lowest index
fn argmax(scores: &[f64]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (idx, &score)| match best {
            Some((_, top)) if score <= top => best,
            _ => Some((idx, score)),
        })
        .map(|(idx, _)| idx)
}

fn check_width(name: &str, expected: usize, features: &[u8]) -> Result<()> {
    if features.len() != expected {
        return Err(TriageError::ClassifierInvocation {
            model: name.to_string(),
            reason: format!("expected {} features, got {}", expected, features.len()),
        });
    }
    Ok(())
}

fn invalid(name: &str, reason: String) -> TriageError {
    TriageError::ModelLoad(format!("model '{}': {}", name, reason))
}

/// Multinomial linear classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    #[serde(default)]
    pub name: String,
    pub features: Vec<String>,
    pub classes: Vec<String>,
    /// One row per class, one column per feature
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LinearModel {
    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() || self.features.is_empty() {
            return Err(invalid(&self.name, "empty feature or class list".to_string()));
        }
        if self.coefficients.len() != self.classes.len() {
            return Err(invalid(
                &self.name,
                format!(
                    "{} coefficient rows for {} classes",
                    self.coefficients.len(),
                    self.classes.len()
                ),
            ));
        }
        if let Some((row, coeffs)) = self
            .coefficients
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != self.features.len())
        {
            return Err(invalid(
                &self.name,
                format!(
                    "coefficient row {} has {} entries for {} features",
                    row,
                    coeffs.len(),
                    self.features.len()
                ),
            ));
        }
        if self.intercepts.len() != self.classes.len() {
            return Err(invalid(
                &self.name,
                format!(
                    "{} intercepts for {} classes",
                    self.intercepts.len(),
                    self.classes.len()
                ),
            ));
        }
        Ok(())
    }

    /// Per-class decision scores
    pub fn scores(&self, features: &[u8]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, intercept)| {
                row.iter()
                    .zip(features)
                    .map(|(w, x)| w * f64::from(*x))
                    .sum::<f64>()
                    + intercept
            })
            .collect()
    }
}

impl ClassifierModel for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn class_labels(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, features: &[u8]) -> Result<Vec<i64>> {
        check_width(&self.name, self.features.len(), features)?;
        let best = argmax(&self.scores(features)).ok_or_else(|| TriageError::ClassifierInvocation {
            model: self.name.clone(),
            reason: "no class scores".to_string(),
        })?;
        Ok(vec![best as i64])
    }
}

/// Node of a regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go `left` when the feature value is below `threshold`, else `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// One tree contributing to a single class margin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub class: usize,
    /// Node 0 is the root
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn evaluate(&self, features: &[u8]) -> Option<f64> {
        let mut idx = 0;
        // A valid tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx)? {
                TreeNode::Leaf { value } => return Some(*value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = f64::from(*features.get(*feature)?);
                    idx = if x < *threshold { *left } else { *right };
                }
            }
        }
        None
    }
}

/// Gradient-boosted tree ensemble, one margin per class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsembleModel {
    #[serde(default)]
    pub name: String,
    pub features: Vec<String>,
    pub classes: Vec<String>,
    /// Starting margin per class; zeros when omitted
    #[serde(default)]
    pub base_score: Vec<f64>,
    pub trees: Vec<Tree>,
}

impl TreeEnsembleModel {
    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() || self.features.is_empty() {
            return Err(invalid(&self.name, "empty feature or class list".to_string()));
        }
        if !self.base_score.is_empty() && self.base_score.len() != self.classes.len() {
            return Err(invalid(
                &self.name,
                format!(
                    "{} base scores for {} classes",
                    self.base_score.len(),
                    self.classes.len()
                ),
            ));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.class >= self.classes.len() {
                return Err(invalid(
                    &self.name,
                    format!("tree {} targets class {} of {}", t, tree.class, self.classes.len()),
                ));
            }
            if tree.nodes.is_empty() {
                return Err(invalid(&self.name, format!("tree {} has no nodes", t)));
            }
            for node in &tree.nodes {
                if let TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } = node
                {
                    if *feature >= self.features.len() {
                        return Err(invalid(
                            &self.name,
                            format!("tree {} splits on feature {} of {}", t, feature, self.features.len()),
                        ));
                    }
                    if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                        return Err(invalid(&self.name, format!("tree {} has a dangling child", t)));
                    }
                }
            }
        }
        Ok(())
    }

    /// Per-class margins
    pub fn margins(&self, features: &[u8]) -> Result<Vec<f64>> {
        let mut margins = if self.base_score.is_empty() {
            vec![0.0; self.classes.len()]
        } else {
            self.base_score.clone()
        };

        for (t, tree) in self.trees.iter().enumerate() {
            let value = tree
                .evaluate(features)
                .ok_or_else(|| TriageError::ClassifierInvocation {
                    model: self.name.clone(),
                    reason: format!("tree {} did not reach a leaf", t),
                })?;
            margins[tree.class] += value;
        }
        Ok(margins)
    }
}

impl ClassifierModel for TreeEnsembleModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn class_labels(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, features: &[u8]) -> Result<Vec<i64>> {
        check_width(&self.name, self.features.len(), features)?;
        let margins = self.margins(features)?;
        let best = argmax(&margins).ok_or_else(|| TriageError::ClassifierInvocation {
            model: self.name.clone(),
            reason: "no class margins".to_string(),
        })?;
        Ok(vec![best as i64])
    }
}
