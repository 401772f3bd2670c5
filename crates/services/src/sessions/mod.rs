mod progress;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{AnswerFeedback, AnswerOutcome, QuizSession, Step};
pub use view::{AttemptHistoryService, AttemptListItem};
pub use workflow::{QuizLoopService, QuizUpdate};
