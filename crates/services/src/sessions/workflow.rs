use std::sync::Arc;

use quiz_core::model::{Attempt, AttemptId, QuestionSet, QuizSettings};
use storage::repository::{AttemptRepository, StorageError};

use super::service::{AnswerFeedback, QuizSession, Step};
use crate::Clock;
use crate::error::SessionError;
use crate::retry::RetryPolicy;

/// Result of feeding one event (answer or tick) into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizUpdate {
    pub step: Step,
    pub feedback: Option<AnswerFeedback>,
    pub is_complete: bool,
    pub saved_attempt_id: Option<AttemptId>,
}

/// Orchestrates session start, event handling and the one-time attempt save.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    questions: Arc<QuestionSet>,
    settings: QuizSettings,
    attempts: Arc<dyn AttemptRepository>,
    retry: RetryPolicy,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<QuestionSet>,
        settings: QuizSettings,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            settings,
            attempts,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    #[must_use]
    pub fn settings(&self) -> QuizSettings {
        self.settings
    }

    /// Open the attempt store ahead of the first save.
    ///
    /// Callers may ignore the error and run the quiz without persistence.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the store cannot be opened.
    pub async fn initialize_store(&self) -> Result<(), SessionError> {
        self.attempts.initialize().await.map_err(|err| {
            tracing::warn!(error = %err, "attempt store unavailable");
            SessionError::from(err)
        })
    }

    /// Start a fresh session on the first question.
    #[must_use]
    pub fn start_session(&self) -> QuizSession {
        let session = QuizSession::new(
            Arc::clone(&self.questions),
            self.settings,
            self.clock.now(),
        );
        tracing::debug!(questions = self.questions.len(), "quiz session started");
        session
    }

    /// Submit an answer for the current question, persisting the attempt if this completes the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is already finished and
    /// `SessionError::Storage` if the final save fails. In the latter case the
    /// session is complete and keeps its attempt; call
    /// [`QuizLoopService::finalize_attempt`] to retry.
    pub async fn submit_answer(
        &self,
        session: &mut QuizSession,
        value: impl Into<String>,
    ) -> Result<QuizUpdate, SessionError> {
        let outcome = session.submit_answer(value, self.clock.now())?;
        self.after_step(session, outcome.step, Some(outcome.feedback))
            .await
    }

    /// Feed one timer tick into the session, persisting the attempt if it completes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the final save fails.
    pub async fn tick(&self, session: &mut QuizSession) -> Result<QuizUpdate, SessionError> {
        let step = session.tick(self.clock.now())?;
        self.after_step(session, step, None).await
    }

    async fn after_step(
        &self,
        session: &mut QuizSession,
        step: Step,
        feedback: Option<AnswerFeedback>,
    ) -> Result<QuizUpdate, SessionError> {
        if let Step::Completed(attempt) = &step {
            tracing::info!(
                attempt_id = %attempt.id(),
                score = attempt.score(),
                total = attempt.total_questions(),
                "quiz session completed"
            );
            self.persist(session).await?;
        }

        Ok(QuizUpdate {
            step,
            feedback,
            is_complete: session.is_complete(),
            saved_attempt_id: session.saved_attempt_id(),
        })
    }

    /// Retry attempt persistence after a completed session.
    ///
    /// Returns the saved id straight away if the attempt was already stored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotComplete` if the session is still running.
    /// Returns `SessionError::Storage` if persistence fails.
    pub async fn finalize_attempt(
        &self,
        session: &mut QuizSession,
    ) -> Result<AttemptId, SessionError> {
        if let Some(id) = session.saved_attempt_id() {
            return Ok(id);
        }
        if !session.is_complete() {
            return Err(SessionError::NotComplete);
        }
        self.persist(session).await
    }

    async fn persist(&self, session: &mut QuizSession) -> Result<AttemptId, SessionError> {
        let attempt: Attempt = session.attempt().cloned().ok_or(SessionError::NotComplete)?;
        let attempts = Arc::clone(&self.attempts);
        let mut tries = 0_u32;

        let saved = self
            .retry
            .run("save_attempt", || {
                tries += 1;
                let attempts = Arc::clone(&attempts);
                let attempt = attempt.clone();
                async move { attempts.save_attempt(&attempt).await }
            })
            .await;

        let saved = match saved {
            // An earlier try may have committed before its error came back.
            Err(StorageError::WriteRejected(reason)) if tries > 1 => {
                match self.attempts.get_attempt(attempt.id()).await {
                    Ok(stored) if stored == attempt => {
                        tracing::debug!(attempt_id = %attempt.id(), "attempt stored by an earlier try");
                        Ok(())
                    }
                    _ => Err(StorageError::WriteRejected(reason)),
                }
            }
            other => other,
        };

        match saved {
            Ok(()) => {
                session.mark_saved(attempt.id());
                Ok(attempt.id())
            }
            Err(err) => {
                tracing::error!(attempt_id = %attempt.id(), error = %err, "failed to save attempt");
                Err(err.into())
            }
        }
    }
}
