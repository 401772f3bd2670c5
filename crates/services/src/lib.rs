#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog;
pub mod error;
pub mod retry;
pub mod sessions;
pub mod timer;

pub use quiz_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use catalog::QuestionCatalog;
pub use error::{AppServicesError, CatalogError, SessionError};
pub use retry::RetryPolicy;
pub use timer::TickTimer;

pub use sessions::{
    AnswerFeedback, AnswerOutcome, AttemptHistoryService, AttemptListItem, QuizLoopService,
    QuizSession, QuizUpdate, SessionProgress, Step,
};
