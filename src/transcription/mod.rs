//! Voice input
//!
//! A recording arrives as independent segments. Segments are transcribed
//! concurrently by a bounded pool and joined back in segment order, whatever
//! order the workers finish in. A failing segment fails the whole transcript.

pub mod http;

pub use http::HttpTranscriber;

use crate::advisor::RetryManager;
use crate::config::TranscriptionConfig;
use crate::errors::{Result, TriageError};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::join_all;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// One recorded chunk of speech
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Position in the recording
    pub index: usize,
    pub file_name: String,
    pub bytes: Bytes,
}

impl AudioSegment {
    pub fn new(index: usize, file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            index,
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a segment from disk
    pub async fn from_path(index: usize, path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            TriageError::Transcription(format!("cannot read segment {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("segment-{}.wav", index));
        Ok(Self::new(index, file_name, bytes))
    }
}

/// Speech-to-text backend for a single segment
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;

    async fn transcribe(&self, segment: &AudioSegment) -> Result<String>;
}

/// Bounded, order-preserving fan-out over a `Transcriber`
pub struct SegmentedTranscriber {
    transcriber: Arc<dyn Transcriber>,
    semaphore: Arc<Semaphore>,
    workers: usize,
    telemetry: Option<TelemetryCollector>,
}

impl SegmentedTranscriber {
    pub fn new(transcriber: Arc<dyn Transcriber>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            transcriber,
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
            telemetry: None,
        }
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn backend(&self) -> &str {
        self.transcriber.name()
    }

    /// Transcribe every segment, returning texts in segment order
    pub async fn transcribe_segments(&self, segments: &[AudioSegment]) -> Result<Vec<String>> {
        if segments.is_empty() {
            return Err(TriageError::Transcription("no audio segments supplied".to_string()));
        }

        let mut ordered: Vec<&AudioSegment> = segments.iter().collect();
        ordered.sort_by_key(|segment| segment.index);

        let tasks = ordered.into_iter().map(|segment| self.transcribe_one(segment));
        let results = join_all(tasks).await;

        results.into_iter().collect()
    }

    /// Transcribe every segment and join the texts into one transcript
    pub async fn transcribe_all(&self, segments: &[AudioSegment]) -> Result<String> {
        let texts = self.transcribe_segments(segments).await?;
        let transcript = texts
            .iter()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        debug!(segments = texts.len(), chars = transcript.len(), "transcript assembled");
        Ok(transcript)
    }

    async fn transcribe_one(&self, segment: &AudioSegment) -> Result<String> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| TriageError::Transcription(format!("worker pool closed: {}", e)))?;

        let started = Instant::now();
        let result = self.transcriber.transcribe(segment).await;
        let duration = started.elapsed();

        if let Some(telemetry) = &self.telemetry {
            telemetry.record(TelemetryEvent::SegmentTranscribed {
                index: segment.index,
                duration,
                success: result.is_ok(),
                timestamp: Instant::now(),
            });
        }

        result.map_err(|e| {
            warn!(segment = segment.index, error = %e, "segment transcription failed");
            match e {
                TriageError::Transcription(reason) => TriageError::Transcription(format!(
                    "segment {} ({}): {}",
                    segment.index, segment.file_name, reason
                )),
                other => TriageError::Transcription(format!(
                    "segment {} ({}): {}",
                    segment.index, segment.file_name, other
                )),
            }
        })
    }
}

/// Build the configured HTTP transcriber behind a worker pool
pub fn from_config(
    config: &TranscriptionConfig,
    telemetry: &TelemetryCollector,
) -> Result<SegmentedTranscriber> {
    let api_key = match &config.api_key_env {
        Some(var) => Some(std::env::var(var).map_err(|_| {
            TriageError::ConfigError(format!(
                "environment variable {} (transcription API key) is not set",
                var
            ))
        })?),
        None => None,
    };

    let backend = HttpTranscriber::with_config(
        &config.base_url,
        &config.model,
        api_key,
        Duration::from_secs(config.timeout_secs),
    )?
    .with_retry(RetryManager::new().with_telemetry(telemetry.clone()));

    Ok(SegmentedTranscriber::new(Arc::new(backend), config.workers).with_telemetry(telemetry.clone()))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transcriber that "hears" the segment bytes as UTF-8
    ///
    /// Earlier segments sleep longer so completion order is reversed.
    pub struct EchoTranscriber {
        pub fail_index: Option<usize>,
        pub in_flight: AtomicUsize,
        pub peak: AtomicUsize,
    }

    impl EchoTranscriber {
        pub fn new() -> Self {
            Self {
                fail_index: None,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        pub fn failing_at(index: usize) -> Self {
            Self {
                fail_index: Some(index),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl Transcriber for EchoTranscriber {
        fn name(&self) -> &str {
            "echo"
        }

        async fn transcribe(&self, segment: &AudioSegment) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = 5u64.saturating_sub(segment.index as u64) * 10;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_index == Some(segment.index) {
                return Err(TriageError::Transcription("garbled audio".to_string()));
            }
            Ok(String::from_utf8_lossy(&segment.bytes).into_owned())
        }
    }

    pub fn segments(texts: &[&str]) -> Vec<AudioSegment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| AudioSegment::new(i, format!("part{}.wav", i), text.as_bytes().to_vec()))
            .collect()
    }
}
