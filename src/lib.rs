//! symptriage - symptom-based disease triage
//!
//! Maps user-reported symptoms onto a fixed feature vector, runs an ensemble
//! of pre-trained classifiers, combines their votes and asks an LLM advisor
//! for a plain-language description of the result.
//!
//! # Architecture
//!
//! - **Core**: schema, normalizer, ensemble, vote, labels
//! - **Collaborators**: advisor (LLM), transcription (speech-to-text)
//! - **Surface**: pipeline, CLI, config, display, doctor, telemetry

// Core prediction path
pub mod errors;
pub mod schema;
pub mod normalizer;
pub mod ensemble;
pub mod vote;
pub mod labels;

// Re-export commonly used types
pub use errors::{Result, TriageError};

// External collaborators
pub mod advisor;
pub mod transcription;

// Request wiring and interface
pub mod pipeline;
pub mod telemetry;
pub mod doctor;
pub mod cli;
pub mod config;
pub mod display;

pub use pipeline::{AdvisoryStatus, PredictionBundle, TriagePipeline, TriageReport};
