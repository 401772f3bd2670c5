use std::sync::Arc;

use quiz_core::model::{QuestionSet, QuizSettings};
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::retry::RetryPolicy;
use crate::sessions::{AttemptHistoryService, QuizLoopService};

/// Assembles app-facing services around one injected storage handle.
#[derive(Clone)]
pub struct AppServices {
    quiz_loop: Arc<QuizLoopService>,
    history: Arc<AttemptHistoryService>,
}

impl AppServices {
    /// Compose services over an existing storage handle.
    #[must_use]
    pub fn new(
        storage: &Storage,
        clock: Clock,
        questions: QuestionSet,
        settings: QuizSettings,
        retry: RetryPolicy,
    ) -> Self {
        let quiz_loop = Arc::new(
            QuizLoopService::new(
                clock,
                Arc::new(questions),
                settings,
                Arc::clone(&storage.attempts),
            )
            .with_retry(retry),
        );
        let history = Arc::new(AttemptHistoryService::new(Arc::clone(&storage.attempts)));
        Self { quiz_loop, history }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// The store is opened eagerly so an unusable database is reported before a
    /// quiz starts.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        questions: QuestionSet,
        settings: QuizSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(
            &storage,
            clock,
            questions,
            settings,
            RetryPolicy::default(),
        ))
    }

    /// Build services backed by `SQLite` storage that opens on first use.
    ///
    /// Nothing is touched until [`QuizLoopService::initialize_store`] or the first
    /// save, so a quiz can still be played when the database is unusable.
    #[must_use]
    pub fn new_sqlite_lazy(
        db_url: &str,
        clock: Clock,
        questions: QuestionSet,
        settings: QuizSettings,
    ) -> Self {
        Self::new(
            &Storage::sqlite_lazy(db_url),
            clock,
            questions,
            settings,
            RetryPolicy::default(),
        )
    }

    /// Build services over a throwaway in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock, questions: QuestionSet, settings: QuizSettings) -> Self {
        Self::new(
            &Storage::in_memory(),
            clock,
            questions,
            settings,
            RetryPolicy::none(),
        )
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn history(&self) -> Arc<AttemptHistoryService> {
        Arc::clone(&self.history)
    }
}
