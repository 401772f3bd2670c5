use std::time::Duration;

use thiserror::Error;

/// Seconds allowed per question.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 30;

/// How long the correct/incorrect signal stays visible after a submission.
pub const DEFAULT_FEEDBACK_DISPLAY_MS: u64 = 1_500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("time limit must be > 0 seconds")]
    InvalidTimeLimit,
}

/// Per-quiz timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    time_limit_secs: u32,
    feedback_display: Duration,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            feedback_display: Duration::from_millis(DEFAULT_FEEDBACK_DISPLAY_MS),
        }
    }
}

impl QuizSettings {
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidTimeLimit` when `time_limit_secs` is zero.
    pub fn new(time_limit_secs: u32, feedback_display: Duration) -> Result<Self, SettingsError> {
        if time_limit_secs == 0 {
            return Err(SettingsError::InvalidTimeLimit);
        }
        Ok(Self {
            time_limit_secs,
            feedback_display,
        })
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn feedback_display(&self) -> Duration {
        self.feedback_display
    }
}
