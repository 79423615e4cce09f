//! Ollama advisor backend
//!
//! Non-streaming completions against a local Ollama server:
//! - Endpoint: POST /api/generate with `stream: false`
//! - Health: GET /api/version

use crate::advisor::{description_prompt, extraction_prompt, Advisor, RetryManager};
use crate::errors::{Result, TriageError};
use crate::schema::FeatureSchema;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Default request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Ollama-backed advisor
#[derive(Debug, Clone)]
pub struct OllamaAdvisor {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    retry: RetryManager,
}

impl OllamaAdvisor {
    /// Create advisor with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL, REQUEST_TIMEOUT)
    }

    /// Create advisor with custom endpoint, model and timeout
    pub fn with_config(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TriageError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature: 0.0,
            retry: RetryManager::new(),
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry(mut self, retry: RetryManager) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Single completion, retried on transient failures
    async fn generate(&self, label: &str, prompt: String) -> Result<String> {
        self.retry
            .execute_with_retry(label, || self.generate_once(&prompt))
            .await
    }

    async fn generate_once(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TriageError::ServiceStatus {
                service: "Ollama".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateResponse = response.json().await?;
        debug!(model = %self.model, chars = reply.response.len(), "ollama completion");

        if reply.response.trim().is_empty() {
            return Err(TriageError::Advisor("Ollama returned an empty completion".to_string()));
        }

        Ok(reply.response)
    }
}

#[async_trait]
impl Advisor for OllamaAdvisor {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn extract_symptoms(&self, description: &str, schema: &FeatureSchema) -> Result<String> {
        self.generate("extract_symptoms", extraction_prompt(description, schema))
            .await
    }

    async fn describe_disease(&self, label: &str) -> Result<String> {
        self.generate("describe_disease", description_prompt(label)).await
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Ollama generate request
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Ollama generate response (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
