use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("correct answer cannot be empty")]
    EmptyCorrectAnswer,

    #[error("multiple-choice question needs at least one option")]
    MissingOptions,

    #[error("numeric question cannot carry options")]
    UnexpectedOptions,

    #[error("correct answer {answer:?} is not one of the options")]
    CorrectAnswerNotAnOption { answer: String },

    #[error("question set cannot be empty")]
    EmptySet,

    #[error("too many questions for a single quiz: {len}")]
    TooManyQuestions { len: usize },
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// How a question expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    /// Pick one of the listed options.
    MultipleChoice,
    /// Free-form entry, compared as text against the correct answer.
    Numeric,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single immutable quiz question.
///
/// The question's identifier is its position inside the owning [`QuestionSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    prompt: String,
    kind: QuestionKind,
    options: Vec<String>,
    correct_answer: String,
}

impl Question {
    /// Creates a multiple-choice question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or answer is blank, no options are
    /// given, or the correct answer is not among the options.
    pub fn multiple_choice(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        Self::build(prompt.into(), QuestionKind::MultipleChoice, options, correct_answer.into())
    }

    /// Creates a numeric question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or answer is blank.
    pub fn numeric(
        prompt: impl Into<String>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        Self::build(prompt.into(), QuestionKind::Numeric, Vec::new(), correct_answer.into())
    }

    fn build(
        prompt: String,
        kind: QuestionKind,
        options: Vec<String>,
        correct_answer: String,
    ) -> Result<Self, QuestionError> {
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if correct_answer.is_empty() {
            return Err(QuestionError::EmptyCorrectAnswer);
        }
        match kind {
            QuestionKind::MultipleChoice => {
                if options.is_empty() {
                    return Err(QuestionError::MissingOptions);
                }
                if !options.iter().any(|o| *o == correct_answer) {
                    return Err(QuestionError::CorrectAnswerNotAnOption {
                        answer: correct_answer,
                    });
                }
            }
            QuestionKind::Numeric => {
                if !options.is_empty() {
                    return Err(QuestionError::UnexpectedOptions);
                }
            }
        }

        Ok(Self {
            prompt,
            kind,
            options,
            correct_answer,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    /// Options in display order; empty for numeric questions.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    /// Exact string comparison. No trimming, no numeric parsing.
    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        answer == self.correct_answer
    }
}

/// Content-source shape of a question, as found in question files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuestionDraft {
    /// Validate the draft into an immutable [`Question`].
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for the same conditions as the `Question` constructors.
    pub fn validate(self) -> Result<Question, QuestionError> {
        Question::build(self.text, self.kind, self.options, self.correct_answer)
    }
}

impl From<&Question> for QuestionDraft {
    fn from(question: &Question) -> Self {
        Self {
            text: question.prompt.clone(),
            kind: question.kind,
            options: question.options.clone(),
            correct_answer: question.correct_answer.clone(),
        }
    }
}

//
// ─── QUESTION SET ──────────────────────────────────────────────────────────────
//

/// Fixed, ordered, non-empty list of questions for one quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptySet` for an empty list and
    /// `QuestionError::TooManyQuestions` if the count does not fit in `u32`.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionError> {
        if questions.is_empty() {
            return Err(QuestionError::EmptySet);
        }
        if u32::try_from(questions.len()).is_err() {
            return Err(QuestionError::TooManyQuestions {
                len: questions.len(),
            });
        }
        Ok(Self { questions })
    }

    /// Validate every draft and build the set, keeping source order.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionError` encountered.
    pub fn from_drafts(drafts: Vec<QuestionDraft>) -> Result<Self, QuestionError> {
        let questions = drafts
            .into_iter()
            .map(QuestionDraft::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(questions)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Sets are non-empty once built, so this is `false` for any `QuestionSet`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question count as stored on attempts.
    #[must_use]
    pub fn total(&self) -> u32 {
        // Checked in `new`.
        u32::try_from(self.questions.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn last_index(&self) -> usize {
        self.questions.len() - 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}
