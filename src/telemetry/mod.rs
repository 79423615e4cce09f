//! Telemetry for symptriage
//!
//! Collects typed pipeline events in-process and prints a session summary.
//! Diagnostic logging goes through `tracing`; this is the structured record
//! of what each request did.

use crate::normalizer::InputMode;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Which advisor request an advisory event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryKind {
    Extraction,
    Description,
}

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    // Request events
    RequestStarted {
        request_id: Uuid,
        mode: InputMode,
        timestamp: Instant,
    },
    NormalizationFinished {
        direct: usize,
        assisted: usize,
        total: usize,
        timestamp: Instant,
    },
    RequestRejected {
        request_id: Uuid,
        recoverable: bool,
        timestamp: Instant,
    },

    // Ensemble events
    ModelInvoked {
        model: String,
        index: i64,
        duration: Duration,
        timestamp: Instant,
    },
    VoteResolved {
        winner: i64,
        tied: bool,
        in_range: bool,
        timestamp: Instant,
    },

    // Remote calls
    AdvisoryFinished {
        kind: AdvisoryKind,
        duration: Duration,
        success: bool,
        timestamp: Instant,
    },
    RetryAttempt {
        call: String,
        attempt: u32,
        timestamp: Instant,
    },
    SegmentTranscribed {
        index: usize,
        duration: Duration,
        success: bool,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub requests: usize,
    pub requests_rejected: usize,
    pub models_invoked: usize,
    pub model_time: Duration,
    pub votes_resolved: usize,
    pub tied_votes: usize,
    pub out_of_range_votes: usize,
    pub advisory_calls: usize,
    pub advisory_failures: usize,
    pub retry_attempts: usize,
    pub segments_transcribed: usize,
    pub segments_failed: usize,
}

/// Telemetry collector
#[derive(Clone, Debug)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::RequestStarted { .. } => stats.requests += 1,
                TelemetryEvent::NormalizationFinished { .. } => {}
                TelemetryEvent::RequestRejected { .. } => stats.requests_rejected += 1,
                TelemetryEvent::ModelInvoked { duration, .. } => {
                    stats.models_invoked += 1;
                    stats.model_time += *duration;
                }
                TelemetryEvent::VoteResolved { tied, in_range, .. } => {
                    stats.votes_resolved += 1;
                    if *tied {
                        stats.tied_votes += 1;
                    }
                    if !*in_range {
                        stats.out_of_range_votes += 1;
                    }
                }
                TelemetryEvent::AdvisoryFinished { success, .. } => {
                    stats.advisory_calls += 1;
                    if !*success {
                        stats.advisory_failures += 1;
                    }
                }
                TelemetryEvent::RetryAttempt { .. } => stats.retry_attempts += 1,
                TelemetryEvent::SegmentTranscribed { success, .. } => {
                    if *success {
                        stats.segments_transcribed += 1;
                    } else {
                        stats.segments_failed += 1;
                    }
                }
            }
        }

        lock(&self.events).push(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Share of advisory calls that succeeded
    pub fn advisory_success_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        if stats.advisory_calls == 0 {
            1.0
        } else {
            (stats.advisory_calls - stats.advisory_failures) as f64 / stats.advisory_calls as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: crate::cli::Verbosity,
}

impl TelemetryDisplay {
    /// Create a new display
    pub fn new(collector: TelemetryCollector, verbosity: crate::cli::Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        let stats = self.collector.get_stats();
        let elapsed = self.collector.elapsed();

        eprintln!("\n📊 Session Summary");
        eprintln!("─────────────────────────────────────");
        eprintln!("Duration:          {:?}", elapsed);
        eprintln!("Requests:          {} ({} rejected)", stats.requests, stats.requests_rejected);
        eprintln!("Models invoked:    {} in {:?}", stats.models_invoked, stats.model_time);
        eprintln!("Votes:             {} ({} tied, {} out of range)", stats.votes_resolved, stats.tied_votes, stats.out_of_range_votes);
        eprintln!("Advisor calls:     {} ({:.1}% ok)", stats.advisory_calls, self.collector.advisory_success_rate() * 100.0);
        eprintln!("Retries:           {}", stats.retry_attempts);
        if stats.segments_transcribed + stats.segments_failed > 0 {
            eprintln!("Segments:          {} ({} failed)", stats.segments_transcribed, stats.segments_failed);
        }
        eprintln!();
    }

    /// Print individual events when running very verbose
    pub fn display_events(&self) {
        if !self.verbosity.show_events() {
            return;
        }
        for event in self.collector.recent_events(usize::MAX) {
            eprintln!("  {:?}", event);
        }
    }

    /// Check if should show the summary
    pub fn should_show_summary(&self) -> bool {
        self.verbosity.show_summary()
    }
}
