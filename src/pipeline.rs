//! Triage pipeline
//!
//! Wires the stages together for one request:
//! normalize → predict → vote → resolve label → describe.
//!
//! Everything up to the label is deterministic and fails hard on classifier
//! errors. The describe call is supplementary: its failure degrades the
//! description but never the prediction.

use crate::advisor::{self, Advisor};
use crate::config::Config;
use crate::ensemble::{EnsemblePredictor, ModelVote};
use crate::errors::{Result, TriageError};
use crate::labels::{resolve_label, LabelResolution};
use crate::normalizer::{EvidencePolicy, InputMode, Normalizer, StructuredInput, SymptomVector};
use crate::telemetry::{AdvisoryKind, TelemetryCollector, TelemetryEvent};
use crate::transcription::{self, AudioSegment, SegmentedTranscriber};
use crate::vote::VoteTally;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Fixed advice attached to every prediction
pub const ADVICE: &str = "If you are experiencing symptoms related to this disease, please seek medical attention immediately. It's important to consult a healthcare professional for a proper diagnosis and treatment plan.";

/// Fixed disclaimer attached to every prediction
pub const NOTE: &str =
    "This information is generated by an AI model and should not replace professional medical advice.";

/// `predicted_disease` for requests without enough symptoms
pub const INSUFFICIENT_DESCRIPTION: &str =
    "The symptom description is not sufficient, so no disease was predicted.";

/// Caller-facing result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionBundle {
    pub predicted_disease: String,
    pub description: String,
    pub advice: String,
    pub note: String,
}

impl PredictionBundle {
    pub fn new(predicted_disease: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            predicted_disease: predicted_disease.into(),
            description: description.into(),
            advice: ADVICE.to_string(),
            note: NOTE.to_string(),
        }
    }

    /// Negative-result bundle for a request that never reached the ensemble
    pub fn insufficient() -> Self {
        Self::new(INSUFFICIENT_DESCRIPTION, String::new())
    }

    /// Whether `predicted_disease` is a sentinel rather than a disease
    pub fn is_negative(&self) -> bool {
        self.predicted_disease == INSUFFICIENT_DESCRIPTION
            || self.predicted_disease == crate::labels::INVALID_INDEX_LABEL
    }
}

/// What happened to the describe call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum AdvisoryStatus {
    Provided,
    /// No advisor configured, or advice turned off
    Disabled,
    /// The vote did not resolve to a disease, so there was nothing to describe
    NotApplicable,
    Failed(String),
}

/// Everything known about one triage request
#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    pub request_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub mode: InputMode,
    pub bundle: PredictionBundle,
    pub matched_symptoms: Vec<String>,
    pub direct_matches: Option<usize>,
    pub assisted_matches: Option<usize>,
    pub votes: Vec<ModelVote>,
    pub tally: VoteTally,
    pub resolved_index: i64,
    pub label: LabelResolution,
    pub advisory: AdvisoryStatus,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// Normalized input on its way to the ensemble
struct Normalized {
    vector: SymptomVector,
    direct_matches: Option<usize>,
    assisted_matches: Option<usize>,
    warnings: Vec<String>,
}

/// End-to-end triage over a loaded ensemble
pub struct TriagePipeline {
    normalizer: Normalizer,
    ensemble: Arc<EnsemblePredictor>,
    advisor: Option<Arc<dyn Advisor>>,
    transcriber: Option<SegmentedTranscriber>,
    assisted_extraction: bool,
    advice_enabled: bool,
    telemetry: TelemetryCollector,
}

impl TriagePipeline {
    /// Pipeline with default policy, no advisor and no transcriber
    pub fn new(ensemble: Arc<EnsemblePredictor>) -> Self {
        Self {
            normalizer: Normalizer::new(ensemble.schema().clone()),
            ensemble,
            advisor: None,
            transcriber: None,
            assisted_extraction: true,
            advice_enabled: true,
            telemetry: TelemetryCollector::new(),
        }
    }

    /// Build from configuration
    ///
    /// The advisor is constructed here. Voice input additionally needs
    /// `with_configured_transcriber`.
    pub fn from_config(
        config: &Config,
        ensemble: Arc<EnsemblePredictor>,
        telemetry: TelemetryCollector,
    ) -> Result<Self> {
        let normalizer = Normalizer::new(ensemble.schema().clone())
            .with_policy(config.evidence.policy())
            .with_validator(config.extraction.validator())
            .with_delimiter(config.extraction.delimiter_char());

        let advisor = advisor::from_config(&config.advisor, &telemetry)?;

        Ok(Self {
            normalizer,
            ensemble,
            advisor,
            transcriber: None,
            assisted_extraction: config.extraction.assisted,
            advice_enabled: true,
            telemetry,
        })
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn with_transcriber(mut self, transcriber: SegmentedTranscriber) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Build the configured transcriber, reporting into this pipeline's telemetry
    pub fn with_configured_transcriber(self, config: &Config) -> Result<Self> {
        let transcriber = transcription::from_config(&config.transcription, &self.telemetry)?;
        Ok(self.with_transcriber(transcriber))
    }

    pub fn with_policy(mut self, policy: EvidencePolicy) -> Self {
        self.normalizer = self.normalizer.with_policy(policy);
        self
    }

    pub fn with_assisted_extraction(mut self, enabled: bool) -> Self {
        self.assisted_extraction = enabled;
        self
    }

    /// Turn the describe call on or off
    pub fn with_advice(mut self, enabled: bool) -> Self {
        self.advice_enabled = enabled;
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    pub fn ensemble(&self) -> &EnsemblePredictor {
        &self.ensemble
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Triage structured symptom picks
    pub async fn triage_structured(&self, picks: &StructuredInput) -> Result<TriageReport> {
        let request_id = self.start(InputMode::Structured);
        let span = info_span!("triage", %request_id, mode = "structured");

        async {
            let vector = self
                .normalizer
                .normalize_structured(picks)
                .map_err(|e| self.reject(request_id, e))?;
            self.record_normalized(vector.count(), vector.count(), 0);

            let normalized = Normalized {
                vector,
                direct_matches: None,
                assisted_matches: None,
                warnings: Vec::new(),
            };
            self.finish(request_id, InputMode::Structured, normalized, None)
                .await
        }
        .instrument(span)
        .await
    }

    /// Triage a free-text description
    pub async fn triage_text(&self, text: &str) -> Result<TriageReport> {
        let request_id = self.start(InputMode::FreeText);
        let span = info_span!("triage", %request_id, mode = "free_text");

        self.run_text(request_id, text, InputMode::FreeText, None)
            .instrument(span)
            .await
    }

    /// Transcribe recorded segments, then triage the transcript
    pub async fn triage_voice(&self, segments: &[AudioSegment]) -> Result<TriageReport> {
        let request_id = self.start(InputMode::Voice);
        let span = info_span!("triage", %request_id, mode = "voice");

        async {
            let transcriber = self.transcriber.as_ref().ok_or_else(|| {
                self.reject(
                    request_id,
                    TriageError::ConfigError("voice input needs a transcriber".to_string()),
                )
            })?;

            let transcript = transcriber
                .transcribe_all(segments)
                .await
                .map_err(|e| self.reject(request_id, e))?;
            info!(segments = segments.len(), chars = transcript.len(), "transcribed voice input");

            self.run_text(request_id, &transcript, InputMode::Voice, Some(transcript.clone()))
                .await
        }
        .instrument(span)
        .await
    }

    fn start(&self, mode: InputMode) -> Uuid {
        let request_id = Uuid::new_v4();
        self.telemetry.record(TelemetryEvent::RequestStarted {
            request_id,
            mode,
            timestamp: Instant::now(),
        });
        request_id
    }

    /// Record a rejected request and hand the error back
    fn reject(&self, request_id: Uuid, error: TriageError) -> TriageError {
        let recoverable = error.is_recoverable();
        if recoverable {
            info!(error = %error, "request rejected");
        } else {
            warn!(error = %error, "request failed");
        }
        self.telemetry.record(TelemetryEvent::RequestRejected {
            request_id,
            recoverable,
            timestamp: Instant::now(),
        });
        error
    }

    fn record_normalized(&self, direct: usize, total: usize, assisted: usize) {
        self.telemetry.record(TelemetryEvent::NormalizationFinished {
            direct,
            assisted,
            total,
            timestamp: Instant::now(),
        });
    }

    async fn run_text(
        &self,
        request_id: Uuid,
        text: &str,
        mode: InputMode,
        transcript: Option<String>,
    ) -> Result<TriageReport> {
        let advisor = if self.assisted_extraction {
            self.advisor.as_deref()
        } else {
            None
        };

        let normalization = self
            .normalizer
            .normalize_text(text, advisor, mode)
            .await
            .map_err(|e| self.reject(request_id, e))?;

        if let Some(call) = normalization.extraction {
            self.telemetry.record(TelemetryEvent::AdvisoryFinished {
                kind: AdvisoryKind::Extraction,
                duration: call.elapsed,
                success: call.succeeded,
                timestamp: Instant::now(),
            });
        }
        self.record_normalized(
            normalization.direct_matches,
            normalization.vector.count(),
            normalization.assisted_matches,
        );

        let normalized = Normalized {
            vector: normalization.vector,
            direct_matches: Some(normalization.direct_matches),
            assisted_matches: Some(normalization.assisted_matches),
            warnings: normalization.warnings,
        };
        self.finish(request_id, mode, normalized, transcript).await
    }

    async fn finish(
        &self,
        request_id: Uuid,
        mode: InputMode,
        normalized: Normalized,
        transcript: Option<String>,
    ) -> Result<TriageReport> {
        let votes = self
            .ensemble
            .predict_votes(&normalized.vector)
            .map_err(|e| self.reject(request_id, e))?;
        for vote in &votes {
            self.telemetry.record(TelemetryEvent::ModelInvoked {
                model: vote.model.clone(),
                index: vote.index,
                duration: vote.duration,
                timestamp: Instant::now(),
            });
        }

        let indices: Vec<i64> = votes.iter().map(|vote| vote.index).collect();
        let tally = VoteTally::from_votes(&indices);
        let (resolved_index, _) = tally
            .winner()
            .ok_or_else(|| self.reject(request_id, TriageError::EmptyEnsemble))?;

        let label = resolve_label(resolved_index, self.ensemble.labels());
        self.telemetry.record(TelemetryEvent::VoteResolved {
            winner: resolved_index,
            tied: tally.is_tied(),
            in_range: label.is_disease(),
            timestamp: Instant::now(),
        });
        info!(
            votes = ?indices,
            winner = resolved_index,
            tied = tally.is_tied(),
            label = label.display_name(),
            "vote resolved"
        );

        let mut warnings = normalized.warnings;
        if let LabelResolution::OutOfRange { index, classes } = &label {
            warn!(index, classes, "resolved class index has no label");
            warnings.push(format!(
                "The models agreed on class {} but only {} diseases are known; no disease could be named.",
                index, classes
            ));
        }

        let (description, advisory) = self.describe(&label).await;
        if let AdvisoryStatus::Failed(reason) = &advisory {
            warnings.push(format!("The disease description is unavailable: {}", reason));
        }

        Ok(TriageReport {
            request_id,
            created_at: Utc::now(),
            mode,
            bundle: PredictionBundle::new(label.display_name(), description),
            matched_symptoms: normalized.vector.present(),
            direct_matches: normalized.direct_matches,
            assisted_matches: normalized.assisted_matches,
            votes,
            tally,
            resolved_index,
            label,
            advisory,
            warnings,
            transcript,
        })
    }

    async fn describe(&self, label: &LabelResolution) -> (String, AdvisoryStatus) {
        let disease = match label.disease() {
            Some(disease) => disease,
            None => {
                return (
                    "The prediction could not be matched to a known disease.".to_string(),
                    AdvisoryStatus::NotApplicable,
                )
            }
        };

        let advisor = match (&self.advisor, self.advice_enabled) {
            (Some(advisor), true) => advisor,
            _ => return (String::new(), AdvisoryStatus::Disabled),
        };

        let started = Instant::now();
        let result = advisor.describe_disease(disease).await;
        self.telemetry.record(TelemetryEvent::AdvisoryFinished {
            kind: AdvisoryKind::Description,
            duration: started.elapsed(),
            success: result.is_ok(),
            timestamp: Instant::now(),
        });

        match result {
            Ok(text) => {
                debug!(chars = text.len(), "description received");
                (text.trim().to_string(), AdvisoryStatus::Provided)
            }
            Err(e) => {
                warn!(error = %e, disease, "describe call failed");
                (
                    format!(
                        "A description of {} could not be generated right now. Please consult a healthcare professional.",
                        disease
                    ),
                    AdvisoryStatus::Failed(e.to_string()),
                )
            }
        }
    }
}
