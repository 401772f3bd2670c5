use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{AnswerMap, AttemptId, QuestionSet};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("score ({score}) exceeds total questions ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },

    #[error("answer index {index} is outside 0..{total}")]
    AnswerOutOfRange { index: usize, total: u32 },
}

/// Outcome of one completed quiz session.
///
/// Immutable once built; storage rehydrates it through [`Attempt::from_persisted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    id: AttemptId,
    created_at: DateTime<Utc>,
    score: u32,
    total_questions: u32,
    answers: AnswerMap,
}

impl Attempt {
    /// Score `answers` against `questions` and build the attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AnswerOutOfRange` if an answer points past the last question.
    pub fn from_answers(
        id: AttemptId,
        created_at: DateTime<Utc>,
        questions: &QuestionSet,
        answers: AnswerMap,
    ) -> Result<Self, AttemptError> {
        let total_questions = questions.total();
        check_answer_range(&answers, total_questions)?;
        let score = answers.score_against(questions);

        Ok(Self {
            id,
            created_at,
            score,
            total_questions,
            answers,
        })
    }

    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the score or answer indices violate the totals.
    pub fn from_persisted(
        id: AttemptId,
        created_at: DateTime<Utc>,
        score: u32,
        total_questions: u32,
        answers: AnswerMap,
    ) -> Result<Self, AttemptError> {
        if score > total_questions {
            return Err(AttemptError::ScoreExceedsTotal {
                score,
                total: total_questions,
            });
        }
        check_answer_range(&answers, total_questions)?;

        Ok(Self {
            id,
            created_at,
            score,
            total_questions,
            answers,
        })
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    /// Whole-number percentage, rounded half up.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }
        let score = u64::from(self.score);
        let total = u64::from(self.total_questions);
        let rounded = (score * 200 + total) / (total * 2);
        u32::try_from(rounded).unwrap_or(100)
    }
}

fn check_answer_range(answers: &AnswerMap, total: u32) -> Result<(), AttemptError> {
    if let Some(index) = answers.max_index() {
        let in_range = u32::try_from(index).is_ok_and(|i| i < total);
        if !in_range {
            return Err(AttemptError::AnswerOutOfRange { index, total });
        }
    }
    Ok(())
}
