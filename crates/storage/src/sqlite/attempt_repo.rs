use quiz_core::model::{Attempt, AttemptId};
use quiz_core::time::format_timestamp;

use super::SqliteRepository;
use super::mapping::{encode_answers, map_attempt_row, read_error, write_error};
use crate::repository::{AttemptRepository, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn initialize(&self) -> Result<(), StorageError> {
        self.pool().await.map(|_| ())
    }

    async fn save_attempt(&self, attempt: &Attempt) -> Result<(), StorageError> {
        let pool = self.pool().await?;
        let answers = encode_answers(attempt.answers())?;

        sqlx::query(
            r"
                INSERT INTO attempts (id, date, score, total_questions, answers)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(attempt.id().to_string())
        .bind(format_timestamp(attempt.created_at()))
        .bind(i64::from(attempt.score()))
        .bind(i64::from(attempt.total_questions()))
        .bind(answers)
        .execute(pool)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn list_attempts(&self) -> Result<Vec<Attempt>, StorageError> {
        let pool = self.pool().await?;
        let rows = sqlx::query(
            r"
                SELECT id, date, score, total_questions, answers
                FROM attempts
            ",
        )
        .fetch_all(pool)
        .await
        .map_err(read_error)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }

        Ok(out)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Attempt, StorageError> {
        let pool = self.pool().await?;
        let row = sqlx::query(
            r"
                SELECT id, date, score, total_questions, answers
                FROM attempts
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(pool)
        .await
        .map_err(read_error)?
        .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }
}
