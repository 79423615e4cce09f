//! Feature schema and class label space
//!
//! Both tables are loaded once at startup and shared read-only (`Arc`)
//! between the normalizer, the ensemble and the label resolver.

pub mod reference;

use crate::errors::{Result, TriageError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered, immutable list of recognised symptom identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    identifiers: Vec<String>,
    phrases: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty tables and duplicate identifiers
    pub fn new(identifiers: Vec<String>) -> Result<Self> {
        if identifiers.is_empty() {
            return Err(TriageError::ConfigError(
                "feature schema must contain at least one symptom".to_string(),
            ));
        }

        let schema = Self::build(identifiers);
        if schema.positions.len() != schema.identifiers.len() {
            let duplicate = schema
                .identifiers
                .iter()
                .enumerate()
                .find(|(idx, id)| schema.positions.get(*id) != Some(idx))
                .map(|(_, id)| id.clone())
                .unwrap_or_default();
            return Err(TriageError::ConfigError(format!(
                "duplicate symptom identifier in schema: {}",
                duplicate
            )));
        }

        Ok(schema)
    }

    /// The 132-symptom reference schema
    pub fn reference() -> Self {
        // Reference table has no duplicates; see test_reference_sizes.
        Self::build(reference::SYMPTOMS.iter().map(|s| s.to_string()).collect())
    }

    fn build(identifiers: Vec<String>) -> Self {
        let positions = identifiers
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();
        let phrases = identifiers.iter().map(|id| Self::phrase_for(id)).collect();

        Self {
            identifiers,
            phrases,
            positions,
        }
    }

    /// Text form of an identifier used for substring matching
    ///
    /// Underscores become spaces and the result is lower-cased. Nothing else
    /// is touched, so `spotting_ urination` keeps its double space.
    pub fn phrase_for(identifier: &str) -> String {
        identifier.replace('_', " ").to_lowercase()
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Identifiers in vector order
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Match phrases in vector order
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn identifier(&self, index: usize) -> Option<&str> {
        self.identifiers.get(index).map(String::as_str)
    }

    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.positions.get(identifier).copied()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.positions.contains_key(identifier)
    }

    /// Compare another ordering against this schema, describing the first difference
    pub fn diff(&self, other: &[String]) -> Option<String> {
        if other.len() != self.len() {
            return Some(format!(
                "expected {} features, found {}",
                self.len(),
                other.len()
            ));
        }
        self.identifiers
            .iter()
            .zip(other)
            .enumerate()
            .find(|(_, (ours, theirs))| ours != theirs)
            .map(|(idx, (ours, theirs))| {
                format!("position {}: expected '{}', found '{}'", idx, ours, theirs)
            })
    }
}

/// Ordered disease names; index `i` is the label for class `i`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassLabelSpace {
    labels: Vec<String>,
}

impl ClassLabelSpace {
    pub fn new(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(TriageError::ConfigError(
                "label space must contain at least one disease".to_string(),
            ));
        }
        Ok(Self { labels })
    }

    /// The 41-disease reference label table
    pub fn reference() -> Self {
        Self {
            labels: reference::DISEASES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label for a class index, `None` outside `[0, len)`
    pub fn get(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
    }

    /// Compare another label ordering against this table
    pub fn diff(&self, other: &[String]) -> Option<String> {
        if other.len() != self.len() {
            return Some(format!(
                "expected {} classes, found {}",
                self.len(),
                other.len()
            ));
        }
        self.labels
            .iter()
            .zip(other)
            .enumerate()
            .find(|(_, (ours, theirs))| ours.trim() != theirs.trim())
            .map(|(idx, (ours, theirs))| {
                format!("class {}: expected '{}', found '{}'", idx, ours, theirs)
            })
    }
}
