use thiserror::Error;

use crate::model::{AttemptError, QuestionError, SettingsError};
use crate::time::TimestampError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}
