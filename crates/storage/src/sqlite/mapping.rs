use quiz_core::model::{AnswerMap, Attempt};
use sqlx::Row;

use crate::repository::{AttemptRecord, StorageError, ser};

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn encode_answers(answers: &AnswerMap) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<Attempt, StorageError> {
    let answers_json: String = row.try_get("answers").map_err(ser)?;
    let answers: AnswerMap = serde_json::from_str(&answers_json).map_err(ser)?;

    AttemptRecord {
        id: row.try_get("id").map_err(ser)?,
        date: row.try_get("date").map_err(ser)?,
        score: u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        total_questions: u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        answers,
    }
    .into_attempt()
}

/// Classify a failed read.
pub(crate) fn read_error(err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::RowNotFound => StorageError::NotFound,
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => ser(err),
        other => StorageError::Unavailable(other.to_string()),
    }
}

/// Classify a failed write: anything the database itself refused is a rejection,
/// connection-level failures mean the store is unavailable.
pub(crate) fn write_error(err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Database(db) => {
            if db.is_unique_violation() {
                StorageError::WriteRejected(format!("duplicate attempt id: {db}"))
            } else {
                StorageError::WriteRejected(db.to_string())
            }
        }
        other => StorageError::Unavailable(other.to_string()),
    }
}
