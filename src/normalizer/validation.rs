//! Fail-fast checks on free-text descriptions
//!
//! Runs before any matching. A rejected description never reaches the
//! normalizer or the advisor.

use thiserror::Error;

/// Default minimum number of words in a description
pub const DEFAULT_MIN_WORDS: usize = 5;

/// Why a description was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("Please provide a description of your symptoms.")]
    Empty,

    #[error("Please describe your symptoms in at least {minimum} words (got {words}).")]
    TooShort { words: usize, minimum: usize },

    #[error("Please describe your symptoms in words only; measurements such as temperatures or lab values cannot be used.")]
    ContainsNumbers,
}

impl ValidationFailure {
    /// User-facing reason string
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Free-text validator
#[derive(Debug, Clone)]
pub struct TextValidator {
    min_words: usize,
    reject_numeric: bool,
}

impl Default for TextValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WORDS, true)
    }
}

impl TextValidator {
    pub fn new(min_words: usize, reject_numeric: bool) -> Self {
        Self {
            min_words,
            reject_numeric,
        }
    }

    /// Check a description: empty, then word count, then numeric tokens
    pub fn validate(&self, text: &str) -> Result<(), ValidationFailure> {
        if text.trim().is_empty() {
            return Err(ValidationFailure::Empty);
        }

        let words = text.split_whitespace().count();
        if words < self.min_words {
            return Err(ValidationFailure::TooShort {
                words,
                minimum: self.min_words,
            });
        }

        if self.reject_numeric && text.split_whitespace().any(is_numeric_token) {
            return Err(ValidationFailure::ContainsNumbers);
        }

        Ok(())
    }
}

/// A token counts as numeric if it embeds any digit ("38.5", "120/80", "3days")
fn is_numeric_token(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
}
