//! Class index to disease name

use crate::schema::ClassLabelSpace;
use serde::Serialize;
use std::fmt;

/// Shown in place of a disease name when the vote lands outside the table
pub const INVALID_INDEX_LABEL: &str = "Invalid index";

/// Outcome of looking up a voted class index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LabelResolution {
    Disease { name: String },
    OutOfRange { index: i64, classes: usize },
}

impl LabelResolution {
    pub fn is_disease(&self) -> bool {
        matches!(self, LabelResolution::Disease { .. })
    }

    pub fn disease(&self) -> Option<&str> {
        match self {
            LabelResolution::Disease { name } => Some(name),
            LabelResolution::OutOfRange { .. } => None,
        }
    }

    /// Name to show the user
    pub fn display_name(&self) -> &str {
        self.disease().unwrap_or(INVALID_INDEX_LABEL)
    }
}

impl fmt::Display for LabelResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Look up a class index; indices outside `[0, len)` are not an error
pub fn resolve_label(index: i64, labels: &ClassLabelSpace) -> LabelResolution {
    match labels.get(index) {
        Some(name) => LabelResolution::Disease {
            name: name.to_string(),
        },
        None => LabelResolution::OutOfRange {
            index,
            classes: labels.len(),
        },
    }
}
