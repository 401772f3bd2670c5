use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use quiz_core::model::{AnswerMap, Attempt, AttemptId, Question, QuestionSet, QuizSettings};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── STEP RESULTS ──────────────────────────────────────────────────────────────
//

/// What a controller action did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Still on the same question.
    Waiting { time_remaining: u32 },
    /// Moved on to the question at `index`; its timer was reset.
    Advanced { index: usize },
    /// The last question was left; the finished attempt is yielded exactly once.
    Completed(Attempt),
    /// The session had already completed; nothing changed.
    Finished,
}

/// Transient correctness signal for the most recent submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_index: usize,
    pub correct: bool,
    pub shown_until: DateTime<Utc>,
}

impl AnswerFeedback {
    #[must_use]
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        now < self.shown_until
    }
}

/// Result of submitting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub feedback: AnswerFeedback,
    pub step: Step,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory quiz session.
///
/// Steps through a fixed question list in order. Each question gets its own
/// countdown, driven by explicit [`QuizSession::tick`] calls; the session owns
/// no timer. Leaving the last question completes the session and produces the
/// [`Attempt`] exactly once.
pub struct QuizSession {
    questions: Arc<QuestionSet>,
    settings: QuizSettings,
    current: usize,
    answers: AnswerMap,
    time_remaining: u32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    attempt: Option<Attempt>,
    saved_attempt_id: Option<AttemptId>,
    feedback: Option<AnswerFeedback>,
}

impl QuizSession {
    /// `started_at` should come from the services layer clock to keep time deterministic.
    #[must_use]
    pub fn new(
        questions: Arc<QuestionSet>,
        settings: QuizSettings,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            questions,
            time_remaining: settings.time_limit_secs(),
            settings,
            current: 0,
            answers: AnswerMap::new(),
            started_at,
            completed_at: None,
            attempt: None,
            saved_attempt_id: None,
            feedback: None,
        }
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Index of the question being shown. Stays on the last index once complete.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_complete() {
            return None;
        }
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    /// The finished attempt, available once the session is complete.
    #[must_use]
    pub fn attempt(&self) -> Option<&Attempt> {
        self.attempt.as_ref()
    }

    /// Set once the attempt has been handed to storage successfully.
    #[must_use]
    pub fn saved_attempt_id(&self) -> Option<AttemptId> {
        self.saved_attempt_id
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.answers.len(),
            current_index: self.current,
            time_remaining: self.time_remaining,
            is_complete: self.is_complete(),
        }
    }

    /// Feedback for the last submission while it is still on display.
    ///
    /// Expired feedback is cleared.
    pub fn active_feedback(&mut self, now: DateTime<Utc>) -> Option<AnswerFeedback> {
        if self.feedback.is_some_and(|f| !f.is_visible(now)) {
            self.feedback = None;
        }
        self.feedback
    }

    /// Record `value` for the current question and move on.
    ///
    /// Any string is accepted, including an empty one. Correctness is exact
    /// string equality with the question's answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is already finished.
    pub fn submit_answer(
        &mut self,
        value: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<AnswerOutcome, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        let value = value.into();
        let correct = self
            .questions
            .get(self.current)
            .is_some_and(|q| q.is_correct(&value));
        self.answers.record(self.current, value);

        let display = chrono::Duration::from_std(self.settings.feedback_display())
            .unwrap_or_else(|_| chrono::Duration::zero());
        let feedback = AnswerFeedback {
            question_index: self.current,
            correct,
            shown_until: at + display,
        };
        self.feedback = Some(feedback);

        let step = self.advance(at)?;
        Ok(AnswerOutcome { feedback, step })
    }

    /// One second has elapsed on the current question.
    ///
    /// When the countdown hits zero the session advances without recording an
    /// answer for the question. Ticks on a completed session are ignored.
    ///
    /// # Errors
    ///
    /// Propagates `SessionError::Attempt` if the attempt cannot be built on completion.
    pub fn tick(&mut self, at: DateTime<Utc>) -> Result<Step, SessionError> {
        if self.is_complete() {
            return Ok(Step::Finished);
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining > 0 {
            return Ok(Step::Waiting {
                time_remaining: self.time_remaining,
            });
        }
        self.advance(at)
    }

    /// Leave the current question.
    ///
    /// From the last question this completes the session and yields the
    /// attempt; afterwards it is a no-op returning [`Step::Finished`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Attempt` if the attempt cannot be built.
    pub fn advance(&mut self, at: DateTime<Utc>) -> Result<Step, SessionError> {
        if self.is_complete() {
            return Ok(Step::Finished);
        }

        if self.current >= self.questions.last_index() {
            let attempt = Attempt::from_answers(
                AttemptId::new_v4(),
                at,
                &self.questions,
                self.answers.clone(),
            )?;
            self.completed_at = Some(at);
            self.time_remaining = 0;
            self.attempt = Some(attempt.clone());
            return Ok(Step::Completed(attempt));
        }

        self.current += 1;
        self.time_remaining = self.settings.time_limit_secs();
        Ok(Step::Advanced {
            index: self.current,
        })
    }

    pub(crate) fn mark_saved(&mut self, id: AttemptId) {
        self.saved_attempt_id = Some(id);
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answers_len", &self.answers.len())
            .field("time_remaining", &self.time_remaining)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .field("saved_attempt_id", &self.saved_attempt_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
