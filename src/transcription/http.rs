//! OpenAI-compatible transcription backend
//!
//! `POST {base}/audio/transcriptions` as multipart form data. Groq and
//! OpenAI both serve Whisper models behind this route.

use super::{AudioSegment, Transcriber};
use crate::advisor::RetryManager;
use crate::errors::{Result, TriageError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct HttpTranscriber {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    retry: RetryManager,
}

impl std::fmt::Debug for HttpTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTranscriber")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl HttpTranscriber {
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
            retry: RetryManager::new(),
        })
    }

    pub fn with_retry(mut self, retry: RetryManager) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }

    async fn transcribe_once(&self, segment: &AudioSegment) -> Result<String> {
        let file = Part::bytes(segment.bytes.to_vec()).file_name(segment.file_name.clone());
        let form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("response_format", "json");

        let mut builder = self.client.post(self.endpoint()).multipart(form);
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
                service: "Transcription API".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let reply: TranscriptionResponse = response.json().await?;
        debug!(segment = segment.index, chars = reply.text.len(), "segment transcribed");
        Ok(reply.text)
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    fn name(&self) -> &str {
        "http"
    }

    async fn transcribe(&self, segment: &AudioSegment) -> Result<String> {
        self.retry
            .execute_with_retry("transcribe", || self.transcribe_once(segment))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_slash() {
        let transcriber = HttpTranscriber::with_config(
            "https://api.groq.com/openai/v1/",
            "whisper-large-v3",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            transcriber.endpoint(),
            "https://api.groq.com/openai/v1/audio/transcriptions"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let transcriber = HttpTranscriber::with_config(
            "http://localhost:1",
            "whisper",
            Some("secret-key".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        let rendered = format!("{:?}", transcriber);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_error() {
        let transcriber = HttpTranscriber::with_config(
            "http://127.0.0.1:9",
            "whisper",
            None,
            Duration::from_secs(2),
        )
        .unwrap()
        .with_retry(RetryManager::disabled());

        let segment = AudioSegment::new(0, "a.wav", b"RIFF".to_vec());
        assert!(transcriber.transcribe(&segment).await.is_err());
    }
}
