//! OpenAI-compatible advisor backend
//!
//! Chat completions (`POST {base}/chat/completions`) with an optional
//! bearer key. Works with Groq, OpenAI and local gateways that speak the
//! same protocol.

use crate::advisor::{description_prompt, extraction_prompt, Advisor, RetryManager};
use crate::errors::{Result, TriageError};
use crate::schema::FeatureSchema;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Groq's OpenAI-compatible endpoint
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Chat-completion advisor
#[derive(Clone)]
pub struct OpenAiAdvisor {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    retry: RetryManager,
}

impl std::fmt::Debug for OpenAiAdvisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdvisor")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl OpenAiAdvisor {
    pub fn with_config(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TriageError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
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

    async fn complete(&self, label: &str, prompt: String) -> Result<String> {
        self.retry
            .execute_with_retry(label, || self.complete_once(&prompt))
            .await
    }

    async fn complete_once(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TriageError::ServiceStatus {
                service: "Chat completion API".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| TriageError::Advisor("chat completion had no content".to_string()))?;

        debug!(model = %self.model, chars = content.len(), "chat completion");
        Ok(content)
    }
}

#[async_trait]
impl Advisor for OpenAiAdvisor {
    fn name(&self) -> &str {
        "openai"
    }

    async fn extract_symptoms(&self, description: &str, schema: &FeatureSchema) -> Result<String> {
        self.complete("extract_symptoms", extraction_prompt(description, schema))
            .await
    }

    async fn describe_disease(&self, label: &str) -> Result<String> {
        self.complete("describe_disease", description_prompt(label)).await
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);

        let mut builder = self.client.get(&url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        match builder.send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}
