//! Configuration management for symptriage
//!
//! TOML-based configuration with defaults and validation.
//! Location: ~/.symptriage/config.toml

use crate::errors::{Result, TriageError};
use crate::normalizer::{EvidencePolicy, TextValidator};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete configuration for symptriage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub advisor: AdvisorConfig,
    pub evidence: EvidenceConfig,
    pub extraction: ExtractionConfig,
    pub models: ModelsConfig,
    pub transcription: TranscriptionConfig,
    pub telemetry: TelemetryConfig,
}

/// Which advisory backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorProvider {
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
}

/// LLM advisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub enabled: bool,
    pub provider: AdvisorProvider,
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Minimum symptom counts per input mode; 0 disables the check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    pub free_text: usize,
    pub structured: usize,
    pub voice: usize,
}

/// Free-text handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Run the advisor-assisted pass after the direct pass
    pub assisted: bool,
    pub delimiter: String,
    pub min_words: usize,
    pub reject_numeric: bool,
}

/// Model bundle location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Bundle directory or `bundle.json` path
    pub bundle: Option<String>,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    /// Segments transcribed concurrently
    pub workers: usize,
}

/// Telemetry display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub default_verbosity: String,
    pub color_output: bool,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: AdvisorProvider::Ollama,
            base_url: crate::advisor::ollama::DEFAULT_OLLAMA_URL.to_string(),
            model: crate::advisor::ollama::DEFAULT_MODEL.to_string(),
            api_key_env: None,
            temperature: 0.0,
            timeout_secs: 60,
            max_retries: crate::advisor::retry::DEFAULT_MAX_RETRIES,
        }
    }
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        let policy = EvidencePolicy::default();
        Self {
            free_text: policy.free_text,
            structured: policy.structured,
            voice: policy.voice,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            assisted: true,
            delimiter: crate::normalizer::DEFAULT_DELIMITER.to_string(),
            min_words: crate::normalizer::DEFAULT_MIN_WORDS,
            reject_numeric: true,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: crate::advisor::openai::GROQ_BASE_URL.to_string(),
            model: "whisper-large-v3".to_string(),
            api_key_env: Some("GROQ_API_KEY".to_string()),
            timeout_secs: 120,
            workers: num_cpus::get(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_verbosity: "normal".to_string(),
            color_output: true,
        }
    }
}

impl EvidenceConfig {
    pub fn policy(&self) -> EvidencePolicy {
        EvidencePolicy {
            structured: self.structured,
            free_text: self.free_text,
            voice: self.voice,
        }
    }
}

impl ExtractionConfig {
    pub fn validator(&self) -> TextValidator {
        TextValidator::new(self.min_words, self.reject_numeric)
    }

    /// Delimiter as a single character; `validate` guarantees there is one
    pub fn delimiter_char(&self) -> char {
        self.delimiter
            .chars()
            .next()
            .unwrap_or(crate::normalizer::DEFAULT_DELIMITER)
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TriageError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| TriageError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from ~/.symptriage/config.toml, or built-in defaults if absent
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Config::default())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".symptriage").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.extraction.delimiter.chars().count() != 1 {
            return Err(TriageError::ConfigError(format!(
                "extraction.delimiter must be a single character, got {:?}",
                self.extraction.delimiter
            )));
        }

        if self.extraction.min_words == 0 {
            return Err(TriageError::ConfigError(
                "extraction.min_words must be greater than 0".to_string(),
            ));
        }

        if self.transcription.workers == 0 {
            return Err(TriageError::ConfigError(
                "transcription.workers must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.advisor.temperature) {
            return Err(TriageError::ConfigError(
                "advisor.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.advisor.timeout_secs == 0 || self.transcription.timeout_secs == 0 {
            return Err(TriageError::ConfigError(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        if self.advisor.enabled && self.advisor.base_url.trim().is_empty() {
            return Err(TriageError::ConfigError(
                "advisor.base_url must not be empty".to_string(),
            ));
        }

        match self.telemetry.default_verbosity.as_str() {
            "quiet" | "normal" | "verbose" | "very_verbose" => {}
            _ => {
                return Err(TriageError::ConfigError(format!(
                    "Invalid verbosity level: {}",
                    self.telemetry.default_verbosity
                )))
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TriageError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| TriageError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TriageError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Resolved bundle path, if one is configured
    pub fn bundle_path(&self) -> Option<PathBuf> {
        self.models.bundle.as_deref().map(Self::expand_path)
    }
}
