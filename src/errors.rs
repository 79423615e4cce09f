//! Error types for symptriage
//!
//! One enum for the whole triage pipeline. Recoverable variants carry the
//! text shown to the user; hard failures carry enough context to log.

use crate::normalizer::{InputMode, ValidationFailure};
use thiserror::Error;

/// Main error type for the triage pipeline
#[derive(Error, Debug)]
pub enum TriageError {
    /// Too few symptoms identified to run the ensemble
    #[error("Insufficient evidence: {found} symptom(s) identified, {required} required for {mode} input")]
    InsufficientEvidence {
        found: usize,
        required: usize,
        mode: InputMode,
    },

    /// Free-text input rejected before normalization
    #[error("Invalid description: {0}")]
    Validation(ValidationFailure),

    /// Structured input named a symptom outside the feature schema
    #[error("Unknown symptom identifier: {0}")]
    UnknownSymptom(String),

    /// Structured input carried something other than 0 or 1
    #[error("Symptom '{symptom}' has value {value}, expected 0 or 1")]
    InvalidSymptomValue { symptom: String, value: u8 },

    /// A vector handed to the ensemble does not match the schema width
    #[error("Feature vector has {actual} entries, schema defines {expected}")]
    VectorLength { expected: usize, actual: usize },

    /// A classifier failed to produce a prediction
    #[error("Classifier '{model}' failed: {reason}")]
    ClassifierInvocation { model: String, reason: String },

    /// A model was trained against a different feature layout
    #[error("Model '{model}' feature layout does not match the schema: {detail}")]
    SchemaMismatch { model: String, detail: String },

    /// A model was trained against a different label ordering
    #[error("Model '{model}' label ordering does not match the label table: {detail}")]
    LabelMismatch { model: String, detail: String },

    /// Ensemble configured with no voters
    #[error("Ensemble has no classifiers configured")]
    EmptyEnsemble,

    /// Model file or bundle could not be loaded
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Advisory collaborator (LLM) errors
    #[error("Advisor error: {0}")]
    Advisor(String),

    /// Remote service answered with a non-success status
    #[error("{service} returned HTTP {status}: {body}")]
    ServiceStatus {
        service: String,
        status: u16,
        body: String,
    },

    /// Speech transcription errors
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic errors with context
    #[error("Triage error: {0}")]
    Generic(String),
}

/// Result type alias for triage operations
pub type Result<T> = std::result::Result<T, TriageError>;

impl TriageError {
    /// Whether the user can fix this by changing their input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TriageError::InsufficientEvidence { .. }
                | TriageError::Validation(_)
                | TriageError::UnknownSymptom(_)
                | TriageError::InvalidSymptomValue { .. }
        )
    }

    /// Warning text guiding the user to correct their input
    pub fn user_message(&self) -> String {
        match self {
            TriageError::InsufficientEvidence { found: 0, mode, .. } => match mode {
                InputMode::Structured => "Please select at least one symptom to proceed.".to_string(),
                _ => "No recognised symptoms were found in your description. Please describe what you are experiencing.".to_string(),
            },
            TriageError::InsufficientEvidence { required, mode, .. } => match mode {
                InputMode::Structured => format!(
                    "Please select at least {} symptoms for a more accurate prediction.",
                    required
                ),
                _ => format!(
                    "The symptom description is not sufficient. Please mention at least {} symptoms.",
                    required
                ),
            },
            TriageError::Validation(failure) => failure.message(),
            TriageError::UnknownSymptom(name) => {
                format!("'{}' is not a recognised symptom. Run `symptriage symptoms` for the list.", name)
            }
            TriageError::InvalidSymptomValue { symptom, .. } => {
                format!("Symptom '{}' must be marked 0 (absent) or 1 (present).", symptom)
            }
            other => other.to_string(),
        }
    }
}

/// Convert anyhow errors to TriageError
impl From<anyhow::Error> for TriageError {
    fn from(err: anyhow::Error) -> Self {
        TriageError::Generic(err.to_string())
    }
}
