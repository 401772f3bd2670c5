mod answers;
mod attempt;
mod ids;
mod question;
mod settings;

pub use ids::{AttemptId, ParseIdError};

pub use answers::AnswerMap;
pub use attempt::{Attempt, AttemptError};
pub use question::{Question, QuestionDraft, QuestionError, QuestionKind, QuestionSet};
pub use settings::{DEFAULT_FEEDBACK_DISPLAY_MS, DEFAULT_TIME_LIMIT_SECS, QuizSettings, SettingsError};
