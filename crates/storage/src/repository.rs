use async_trait::async_trait;
use quiz_core::model::{AnswerMap, Attempt, AttemptId};
use quiz_core::time::{format_timestamp, parse_timestamp};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The backing store could not be opened or reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write (duplicate id, constraint, quota).
    #[error("write rejected: {0}")]
    WriteRejected(String),

    #[error("not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Whether retrying the same operation later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

/// Persisted shape for an attempt.
///
/// Field names follow the on-disk/export schema:
/// `{id, date, score, totalQuestions, answers}` with `date` in ISO-8601 UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: String,
    pub date: String,
    pub score: u32,
    pub total_questions: u32,
    pub answers: AnswerMap,
}

impl AttemptRecord {
    #[must_use]
    pub fn from_attempt(attempt: &Attempt) -> Self {
        Self {
            id: attempt.id().to_string(),
            date: format_timestamp(attempt.created_at()),
            score: attempt.score(),
            total_questions: attempt.total_questions(),
            answers: attempt.answers().clone(),
        }
    }

    /// Convert the record back into a domain `Attempt`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the id or date cannot be parsed
    /// or the stored totals are inconsistent.
    pub fn into_attempt(self) -> Result<Attempt, StorageError> {
        let id: AttemptId = self.id.parse().map_err(ser)?;
        let created_at = parse_timestamp(&self.date).map_err(ser)?;
        Attempt::from_persisted(id, created_at, self.score, self.total_questions, self.answers)
            .map_err(ser)
    }
}

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Repository contract for completed attempts.
///
/// Attempts are append-only: there is no update and no delete.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Acquire the underlying storage handle.
    ///
    /// Idempotent: an already-open handle is reused, never reopened.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the store cannot be opened.
    async fn initialize(&self) -> Result<(), StorageError>;

    /// Append a new attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::WriteRejected` if an attempt with the same id exists
    /// or the store refuses the row, `StorageError::Unavailable` if unreachable.
    async fn save_attempt(&self, attempt: &Attempt) -> Result<(), StorageError>;

    /// Fetch every stored attempt, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store is unreachable or a row is corrupt.
    async fn list_attempts(&self) -> Result<Vec<Attempt>, StorageError>;

    /// Fetch one attempt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: AttemptId) -> Result<Attempt, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Records are kept in their serialized shape so timestamps go through the
/// same codec as the SQLite backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    attempts: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn save_attempt(&self, attempt: &Attempt) -> Result<(), StorageError> {
        let record = AttemptRecord::from_attempt(attempt);
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        if guard.iter().any(|r| r.id == record.id) {
            return Err(StorageError::WriteRejected(format!(
                "duplicate attempt id {}",
                record.id
            )));
        }
        guard.push(record);
        Ok(())
    }

    async fn list_attempts(&self) -> Result<Vec<Attempt>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        guard.iter().cloned().map(AttemptRecord::into_attempt).collect()
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Attempt, StorageError> {
        let key = id.to_string();
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        guard
            .iter()
            .find(|r| r.id == key)
            .cloned()
            .ok_or(StorageError::NotFound)?
            .into_attempt()
    }
}

/// Storage handle handed to whatever composes the quiz services.
///
/// Constructed explicitly; there is no process-wide instance.
#[derive(Clone)]
pub struct Storage {
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let attempts: Arc<dyn AttemptRepository> = Arc::new(InMemoryRepository::new());
        Self { attempts }
    }
}
