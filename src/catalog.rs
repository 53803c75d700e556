//! Question catalog loaded from `questions.json`
//!
//! The catalog is read once at startup and shared read-only between handlers.
//! Each question carries its text, zero or more selectable options (optionally
//! with an illustration URL) and an optional checkpoint marker that interrupts
//! the flow with a continue/defer choice.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// A selectable answer option of a question
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerOption {
    /// Text of the option exactly as stored with the answer
    pub text: String,
    /// URL of an illustration shown with the question and embedded in the report
    #[serde(default)]
    pub image: Option<String>,
}

/// One questionnaire step
#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    /// Question text shown to the user
    pub text: String,
    /// Selectable options; empty for free-text-only questions
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    /// Checkpoint steps pause the flow with a continue/defer choice
    #[serde(default)]
    pub checkpoint: bool,
}

impl Question {
    /// URLs of all option illustrations, in option order
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.options.iter().filter_map(|o| o.image.as_deref())
    }

    /// Whether any option carries an illustration
    #[must_use]
    pub fn has_images(&self) -> bool {
        self.image_urls().next().is_some()
    }

    /// Whether the question is answered in free text only: no predefined
    /// options and not a checkpoint. A custom answer completes such a step
    /// and the flow moves on to the next question
    #[must_use]
    pub fn is_free_form(&self) -> bool {
        self.options.is_empty() && !self.checkpoint
    }
}

/// Errors raised while loading the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read
    #[error("failed to read question catalog: {0}")]
    Io(#[from] std::io::Error),
    /// The catalog file is not valid JSON of the expected shape
    #[error("failed to parse question catalog: {0}")]
    Parse(#[from] serde_json::Error),
    /// The catalog contains no questions
    #[error("question catalog is empty")]
    Empty,
}

/// The ordered list of questionnaire steps
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    questions: Vec<Question>,
}

impl Catalog {
    /// Load and validate the catalog from a JSON file
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] when the file cannot be read, parsed, or
    /// contains no questions.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse the catalog from a JSON string
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] when parsing fails or no questions are present.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(raw)?;
        if catalog.questions.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(catalog)
    }

    /// Number of questionnaire steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the catalog has no questions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Index of the final step
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.questions.len().saturating_sub(1)
    }

    /// The question at a step index
    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// All questions in step order
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Clamp a resumed step index into the valid range
    #[must_use]
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.last_index())
    }
}
