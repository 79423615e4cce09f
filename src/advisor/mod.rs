//! Advisory collaborator
//!
//! The LLM boundary. Two request shapes, both plain text in and plain
//! text out:
//! - symptom extraction for the normalizer's assisted pass
//! - disease description for the prediction bundle
//!
//! Backends: a local Ollama server or any OpenAI-compatible chat endpoint
//! (Groq by default).

pub mod ollama;
pub mod openai;
pub mod retry;

pub use ollama::OllamaAdvisor;
pub use openai::OpenAiAdvisor;
pub use retry::RetryManager;

use crate::config::{AdvisorConfig, AdvisorProvider};
use crate::errors::{Result, TriageError};
use crate::schema::FeatureSchema;
use crate::telemetry::TelemetryCollector;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// External text-generation service used by the pipeline
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Backend name for logs and diagnostics
    fn name(&self) -> &str;

    /// Ask which schema symptoms a description mentions
    async fn extract_symptoms(&self, description: &str, schema: &FeatureSchema) -> Result<String>;

    /// Ask for a plain-language description of a disease
    async fn describe_disease(&self, label: &str) -> Result<String>;

    /// Whether the backend answers at all
    async fn health_check(&self) -> Result<bool>;
}

/// Prompt for the assisted extraction pass
pub fn extraction_prompt(description: &str, schema: &FeatureSchema) -> String {
    format!(
        "Identify symptoms from the following description: '{}'. \
         List the symptoms using words from the predefined list [{}]. \
         Put each symptom on its own line starting with '*'. \
         If the description is gibberish or not sufficient send none null response.",
        description,
        schema
            .identifiers()
            .iter()
            .map(|id| format!("'{}'", id))
            .collect::<Vec<_>>()
            .join(", ")
    )
}

/// Prompt for the disease description
pub fn description_prompt(label: &str) -> String {
    format!(
        "The user gave some symptoms to a machine learning model, and it predicted a disease.\n\
         The predicted disease is: {}.\n\n\
         Please provide a description of this disease in a simple, user-friendly manner.\n\
         Also, offer general advice to the user to seek medical help or go to a hospital for \
         further diagnosis. Avoid giving specific medical treatment instructions.",
        label
    )
}

/// Build the configured advisor, `None` when disabled
pub fn from_config(
    config: &AdvisorConfig,
    telemetry: &TelemetryCollector,
) -> Result<Option<Arc<dyn Advisor>>> {
    if !config.enabled {
        return Ok(None);
    }

    let retry = RetryManager::with_config(config.max_retries, 500).with_telemetry(telemetry.clone());
    let timeout = Duration::from_secs(config.timeout_secs);

    let advisor: Arc<dyn Advisor> = match config.provider {
        AdvisorProvider::Ollama => Arc::new(
            OllamaAdvisor::with_config(&config.base_url, &config.model, timeout)?
                .with_temperature(config.temperature)
                .with_retry(retry),
        ),
        AdvisorProvider::OpenAi => {
            let api_key = match &config.api_key_env {
                Some(var) => Some(std::env::var(var).map_err(|_| {
                    TriageError::ConfigError(format!(
                        "environment variable {} (advisor API key) is not set",
                        var
                    ))
                })?),
                None => None,
            };
            Arc::new(
                OpenAiAdvisor::with_config(&config.base_url, &config.model, api_key, timeout)?
                    .with_temperature(config.temperature)
                    .with_retry(retry),
            )
        }
    };

    Ok(Some(advisor))
}
