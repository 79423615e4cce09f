//! Symptom normalizer
//!
//! Turns raw input into a dense 0/1 vector aligned to the feature schema:
//! - Structured picks pass through, missing identifiers default to 0
//! - Free text goes through a direct substring pass, then an optional
//!   advisor-assisted pass over the extraction reply
//!
//! Every path ends with the evidence check for its input mode.

pub mod extraction;
pub mod validation;

pub use extraction::{parse_candidates, DEFAULT_DELIMITER};
pub use validation::{TextValidator, ValidationFailure, DEFAULT_MIN_WORDS};

use crate::advisor::Advisor;
use crate::errors::{Result, TriageError};
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Structured picks: symptom identifier to 0/1
pub type StructuredInput = BTreeMap<String, u8>;

/// Where the symptoms came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    Structured,
    FreeText,
    Voice,
}

impl InputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Structured => "structured",
            InputMode::FreeText => "free_text",
            InputMode::Voice => "voice",
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum number of present symptoms per input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidencePolicy {
    pub structured: usize,
    pub free_text: usize,
    pub voice: usize,
}

impl Default for EvidencePolicy {
    fn default() -> Self {
        Self {
            structured: 10,
            free_text: 5,
            voice: 5,
        }
    }
}

impl EvidencePolicy {
    pub fn minimum(&self, mode: InputMode) -> usize {
        match mode {
            InputMode::Structured => self.structured,
            InputMode::FreeText => self.free_text,
            InputMode::Voice => self.voice,
        }
    }

    /// Fail with `InsufficientEvidence` when `found` is below the mode's floor
    pub fn check(&self, mode: InputMode, found: usize) -> Result<()> {
        let required = self.minimum(mode);
        if found < required {
            return Err(TriageError::InsufficientEvidence {
                found,
                required,
                mode,
            });
        }
        Ok(())
    }
}

/// Binary presence vector aligned to a feature schema
///
/// Only the normalizer builds these; once built the values never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomVector {
    schema: Arc<FeatureSchema>,
    values: Vec<u8>,
}

impl SymptomVector {
    /// Build from raw values, checking width and binary-ness
    pub fn from_values(schema: Arc<FeatureSchema>, values: Vec<u8>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(TriageError::VectorLength {
                expected: schema.len(),
                actual: values.len(),
            });
        }
        if let Some((idx, &value)) = values.iter().enumerate().find(|(_, v)| **v > 1) {
            return Err(TriageError::InvalidSymptomValue {
                symptom: schema.identifier(idx).unwrap_or_default().to_string(),
                value,
            });
        }
        Ok(Self { schema, values })
    }

    /// Values in schema order
    pub fn as_slice(&self) -> &[u8] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Number of symptoms marked present
    pub fn count(&self) -> usize {
        self.values.iter().filter(|v| **v == 1).count()
    }

    pub fn get(&self, identifier: &str) -> Option<u8> {
        self.schema.position(identifier).map(|idx| self.values[idx])
    }

    /// Identifiers marked present, in schema order
    pub fn present(&self) -> Vec<String> {
        self.schema
            .identifiers()
            .iter()
            .zip(&self.values)
            .filter(|(_, v)| **v == 1)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Full identifier to value mapping
    pub fn to_map(&self) -> StructuredInput {
        self.schema
            .identifiers()
            .iter()
            .cloned()
            .zip(self.values.iter().copied())
            .collect()
    }
}

/// Result of normalizing free text
#[derive(Debug, Clone)]
pub struct TextNormalization {
    pub vector: SymptomVector,
    /// Matches found by the direct substring pass
    pub direct_matches: usize,
    /// Additional matches contributed by the assisted pass
    pub assisted_matches: usize,
    /// Non-fatal problems, e.g. the advisor being unreachable
    pub warnings: Vec<String>,
    /// The assisted extraction call, when one was made
    pub extraction: Option<ExtractionCall>,
}

/// Timing and outcome of one extraction request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionCall {
    pub elapsed: Duration,
    pub succeeded: bool,
}

/// Symptom normalizer
#[derive(Debug, Clone)]
pub struct Normalizer {
    schema: Arc<FeatureSchema>,
    policy: EvidencePolicy,
    validator: TextValidator,
    delimiter: char,
}

impl Normalizer {
    /// Create a normalizer with default policy, validator and delimiter
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self {
            schema,
            policy: EvidencePolicy::default(),
            validator: TextValidator::default(),
            delimiter: DEFAULT_DELIMITER,
        }
    }

    pub fn with_policy(mut self, policy: EvidencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_validator(mut self, validator: TextValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn policy(&self) -> &EvidencePolicy {
        &self.policy
    }

    /// Normalize structured picks
    ///
    /// Identifiers outside the schema are rejected rather than dropped.
    pub fn normalize_structured(&self, picks: &StructuredInput) -> Result<SymptomVector> {
        let mut values = vec![0u8; self.schema.len()];

        for (identifier, &value) in picks {
            let idx = self
                .schema
                .position(identifier)
                .ok_or_else(|| TriageError::UnknownSymptom(identifier.clone()))?;
            if value > 1 {
                return Err(TriageError::InvalidSymptomValue {
                    symptom: identifier.clone(),
                    value,
                });
            }
            values[idx] = value;
        }

        let vector = SymptomVector::from_values(self.schema.clone(), values)?;
        debug!(present = vector.count(), "normalized structured input");
        self.policy.check(InputMode::Structured, vector.count())?;
        Ok(vector)
    }

    /// Direct substring pass over a description
    ///
    /// Returns one flag per schema entry.
    pub fn direct_pass(&self, description: &str) -> Vec<bool> {
        let lowered = description.to_lowercase();
        self.schema
            .phrases()
            .iter()
            .map(|phrase| lowered.contains(phrase.as_str()))
            .collect()
    }

    /// Assisted pass: mark unmatched entries whose phrase appears in any candidate
    ///
    /// Returns how many entries were newly marked.
    pub fn assisted_pass(&self, marks: &mut [bool], candidates: &[String]) -> usize {
        let mut added = 0;
        for (mark, phrase) in marks.iter_mut().zip(self.schema.phrases()) {
            if *mark {
                continue;
            }
            if candidates.iter().any(|c| c.contains(phrase.as_str())) {
                *mark = true;
                added += 1;
            }
        }
        added
    }

    /// Validate and normalize a free-text description
    ///
    /// With no advisor only the direct pass runs. An advisor failure is
    /// reported as a warning and treated as zero additional matches.
    pub async fn normalize_text(
        &self,
        text: &str,
        advisor: Option<&dyn Advisor>,
        mode: InputMode,
    ) -> Result<TextNormalization> {
        self.validator.validate(text).map_err(TriageError::Validation)?;

        let mut marks = self.direct_pass(text);
        let direct_matches = marks.iter().filter(|m| **m).count();
        let mut assisted_matches = 0;
        let mut warnings = Vec::new();
        let mut extraction = None;

        if let Some(advisor) = advisor {
            let started = Instant::now();
            let reply = advisor.extract_symptoms(&text.to_lowercase(), &self.schema).await;
            extraction = Some(ExtractionCall {
                elapsed: started.elapsed(),
                succeeded: reply.is_ok(),
            });

            match reply {
                Ok(reply) => {
                    let candidates = parse_candidates(&reply, self.delimiter);
                    debug!(candidates = candidates.len(), "parsed extraction reply");
                    assisted_matches = self.assisted_pass(&mut marks, &candidates);
                }
                Err(e) => {
                    warn!(error = %e, "assisted extraction failed, using direct matches only");
                    warnings.push(format!(
                        "Symptom extraction assistant unavailable ({}); only exact symptom names were matched.",
                        e
                    ));
                }
            }
        }

        let values = marks.into_iter().map(u8::from).collect();
        let vector = SymptomVector::from_values(self.schema.clone(), values)?;
        debug!(
            direct = direct_matches,
            assisted = assisted_matches,
            total = vector.count(),
            "normalized description"
        );

        self.policy.check(mode, vector.count())?;

        Ok(TextNormalization {
            vector,
            direct_matches,
            assisted_matches,
            warnings,
            extraction,
        })
    }
}
