//! Question sources for a quiz.
//!
//! The quiz reads a fixed, ordered list. It ships with a small built-in set and
//! can load the same shape from a JSON array of
//! `{"text", "type", "options"?, "correctAnswer"}` objects.

use std::path::Path;

use quiz_core::model::{Question, QuestionDraft, QuestionError, QuestionSet};

use crate::error::CatalogError;

/// Loads question sets.
pub struct QuestionCatalog;

impl QuestionCatalog {
    /// The bundled general-knowledge quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` only if the bundled content is malformed.
    pub fn builtin() -> Result<QuestionSet, QuestionError> {
        QuestionSet::new(vec![
            Question::multiple_choice(
                "What is the capital of France?",
                options(&["London", "Berlin", "Paris", "Madrid"]),
                "Paris",
            )?,
            Question::numeric("What is 7 multiplied by 8?", "56")?,
            Question::multiple_choice(
                "Which planet is known as the Red Planet?",
                options(&["Venus", "Mars", "Jupiter", "Saturn"]),
                "Mars",
            )?,
            Question::numeric("How many continents are there on Earth?", "7")?,
            Question::multiple_choice(
                "Which language is primarily spoken in Brazil?",
                options(&["Spanish", "Portuguese", "French", "English"]),
                "Portuguese",
            )?,
            Question::numeric("What is the square root of 144?", "12")?,
        ])
    }

    /// Parse a JSON array of question records.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON and
    /// `CatalogError::Question` for invalid or empty content.
    pub fn from_json_str(json: &str) -> Result<QuestionSet, CatalogError> {
        let drafts: Vec<QuestionDraft> = serde_json::from_str(json)?;
        Ok(QuestionSet::from_drafts(drafts)?)
    }

    /// Read and parse a question file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read, otherwise as
    /// [`QuestionCatalog::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<QuestionSet, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let set = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), questions = set.len(), "loaded question file");
        Ok(set)
    }

    /// Serialize a set back to the file shape.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` if serialization fails.
    pub fn to_json_string(set: &QuestionSet) -> Result<String, CatalogError> {
        let drafts: Vec<QuestionDraft> = set.iter().map(QuestionDraft::from).collect();
        Ok(serde_json::to_string_pretty(&drafts)?)
    }
}

fn options(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
