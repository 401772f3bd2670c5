use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::{Attempt, AttemptId};
use storage::repository::AttemptRepository;

use crate::error::SessionError;

/// Presentation-agnostic row for the attempt history.
///
/// No pre-formatted strings: the caller decides how to render dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptListItem {
    pub id: AttemptId,
    pub completed_at: DateTime<Utc>,
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_attempt(attempt: &Attempt) -> Self {
        Self {
            id: attempt.id(),
            completed_at: attempt.created_at(),
            score: attempt.score(),
            total: attempt.total_questions(),
            percentage: attempt.percentage(),
        }
    }
}

/// Read side of the attempt store.
#[derive(Clone)]
pub struct AttemptHistoryService {
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptHistoryService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { attempts }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(storage::repository::InMemoryRepository::new()))
    }

    /// All stored attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_attempts(&self) -> Result<Vec<Attempt>, SessionError> {
        let mut attempts = self.attempts.list_attempts().await?;
        sort_newest_first(&mut attempts);
        Ok(attempts)
    }

    /// History rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_history(&self) -> Result<Vec<AttemptListItem>, SessionError> {
        let attempts = self.list_attempts().await?;
        Ok(attempts.iter().map(AttemptListItem::from_attempt).collect())
    }

    /// The most recent attempt, if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn latest(&self) -> Result<Option<AttemptListItem>, SessionError> {
        Ok(self.list_history().await?.into_iter().next())
    }

    /// Full record for one attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` (including `NotFound`) on repository failures.
    pub async fn get_attempt(&self, id: AttemptId) -> Result<Attempt, SessionError> {
        Ok(self.attempts.get_attempt(id).await?)
    }
}

fn sort_newest_first(attempts: &mut [Attempt]) {
    attempts.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(&a.id()))
    });
}
