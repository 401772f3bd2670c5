use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{Attempt, AttemptId, Question, QuestionSet, QuizSettings};
use quiz_core::time::fixed_now;
use services::{
    AppServices, AttemptHistoryService, Clock, QuizLoopService, RetryPolicy, SessionError, Step,
    TickTimer,
};
use storage::repository::{AttemptRepository, InMemoryRepository, Storage, StorageError};

fn sample_questions() -> QuestionSet {
    QuestionSet::new(vec![
        Question::numeric("2+2=?", "4").unwrap(),
        Question::multiple_choice(
            "Capital of France?",
            vec!["Paris".into(), "Lyon".into()],
            "Paris",
        )
        .unwrap(),
    ])
    .unwrap()
}

fn loop_over(repo: Arc<dyn AttemptRepository>) -> QuizLoopService {
    QuizLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(sample_questions()),
        QuizSettings::default(),
        repo,
    )
}

/// Repository that fails the first `failures` saves with the given error kind.
struct FlakyRepository {
    inner: InMemoryRepository,
    failures: AtomicU32,
    transient: bool,
    calls: AtomicU32,
}

impl FlakyRepository {
    fn new(failures: u32, transient: bool) -> Self {
        Self {
            inner: InMemoryRepository::new(),
            failures: AtomicU32::new(failures),
            transient,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl AttemptRepository for FlakyRepository {
    async fn initialize(&self) -> Result<(), StorageError> {
        if self.failures.load(Ordering::SeqCst) > 0 {
            return Err(StorageError::Unavailable("storage disabled".into()));
        }
        Ok(())
    }

    async fn save_attempt(&self, attempt: &Attempt) -> Result<(), StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(if self.transient {
                StorageError::Unavailable("storage disabled".into())
            } else {
                StorageError::WriteRejected("quota exceeded".into())
            });
        }
        self.inner.save_attempt(attempt).await
    }

    async fn list_attempts(&self) -> Result<Vec<Attempt>, StorageError> {
        self.inner.list_attempts().await
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Attempt, StorageError> {
        self.inner.get_attempt(id).await
    }
}

#[tokio::test]
async fn completed_session_is_saved_once() {
    let repo = InMemoryRepository::new();
    let quiz = loop_over(Arc::new(repo.clone()));

    let mut session = quiz.start_session();
    let first = quiz.submit_answer(&mut session, "4").await.unwrap();
    assert_eq!(first.step, Step::Advanced { index: 1 });
    assert!(first.feedback.unwrap().correct);
    assert!(first.saved_attempt_id.is_none());

    let second = quiz.submit_answer(&mut session, "Paris").await.unwrap();
    assert!(second.is_complete);
    let saved_id = second.saved_attempt_id.expect("attempt persisted");

    let stored = repo.get_attempt(saved_id).await.unwrap();
    assert_eq!(stored.score(), 2);
    assert_eq!(stored.total_questions(), 2);

    // Further events on the finished session never write again.
    let after = quiz.tick(&mut session).await.unwrap();
    assert_eq!(after.step, Step::Finished);
    assert_eq!(repo.list_attempts().await.unwrap().len(), 1);
    assert_eq!(quiz.finalize_attempt(&mut session).await.unwrap(), saved_id);
    assert_eq!(repo.list_attempts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn timeouts_complete_and_persist_the_session() {
    let repo = InMemoryRepository::new();
    let quiz = loop_over(Arc::new(repo.clone()));
    let mut session = quiz.start_session();

    quiz.submit_answer(&mut session, "5").await.unwrap();
    let mut last = None;
    while !session.is_complete() {
        last = Some(quiz.tick(&mut session).await.unwrap());
    }

    let update = last.unwrap();
    let Step::Completed(attempt) = update.step else {
        panic!("expected completion");
    };
    assert_eq!(attempt.score(), 0);
    assert_eq!(attempt.answers().len(), 1);
    assert_eq!(attempt.answers().get(0), Some("5"));
    assert_eq!(update.saved_attempt_id, Some(attempt.id()));
}

#[tokio::test]
async fn abandoned_session_writes_nothing() {
    let repo = InMemoryRepository::new();
    let quiz = loop_over(Arc::new(repo.clone()));
    let mut session = quiz.start_session();
    quiz.submit_answer(&mut session, "4").await.unwrap();
    drop(session);

    assert!(repo.list_attempts().await.unwrap().is_empty());
}

#[tokio::test]
async fn finalize_before_completion_is_rejected() {
    let quiz = loop_over(Arc::new(InMemoryRepository::new()));
    let mut session = quiz.start_session();
    let err = quiz.finalize_attempt(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::NotComplete));
}

#[tokio::test(start_paused = true)]
async fn transient_save_failures_are_retried() {
    let repo = Arc::new(FlakyRepository::new(2, true));
    let quiz = loop_over(repo.clone()).with_retry(RetryPolicy::new(
        3,
        Duration::from_millis(50),
        Duration::from_millis(200),
    ));
    let mut session = quiz.start_session();
    quiz.submit_answer(&mut session, "4").await.unwrap();
    let update = quiz.submit_answer(&mut session, "Lyon").await.unwrap();

    assert!(update.saved_attempt_id.is_some());
    assert_eq!(repo.calls.load(Ordering::SeqCst), 3);
    assert_eq!(repo.list_attempts().await.unwrap()[0].score(), 1);
}

#[tokio::test]
async fn failed_save_keeps_score_and_can_be_retried() {
    let repo = Arc::new(FlakyRepository::new(1, false));
    let quiz = loop_over(repo.clone());
    let mut session = quiz.start_session();
    quiz.submit_answer(&mut session, "4").await.unwrap();

    let err = quiz
        .submit_answer(&mut session, "Paris")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Storage(StorageError::WriteRejected(_))
    ));
    assert_eq!(repo.calls.load(Ordering::SeqCst), 1);

    // The score is still available even though persistence failed.
    assert!(session.is_complete());
    assert_eq!(session.attempt().unwrap().score(), 2);
    assert!(session.saved_attempt_id().is_none());
    assert!(repo.list_attempts().await.unwrap().is_empty());

    let id = quiz.finalize_attempt(&mut session).await.unwrap();
    assert_eq!(session.saved_attempt_id(), Some(id));
    assert_eq!(repo.list_attempts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unavailable_store_is_reported_on_initialize() {
    let quiz = loop_over(Arc::new(FlakyRepository::new(1, true)));
    let err = quiz.initialize_store().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Storage(StorageError::Unavailable(_))
    ));
}

#[tokio::test]
async fn sqlite_backed_history_round_trip() {
    let storage = Storage::sqlite("sqlite:file:memdb_quiz_loop?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");
    let mut clock = Clock::fixed(fixed_now());

    for answers in [["4", "Paris"], ["5", "Paris"]] {
        let app = AppServices::new(
            &storage,
            clock,
            sample_questions(),
            QuizSettings::default(),
            RetryPolicy::none(),
        );
        let quiz = app.quiz_loop();
        let mut session = quiz.start_session();
        for answer in answers {
            quiz.submit_answer(&mut session, answer).await.unwrap();
        }
        assert!(session.saved_attempt_id().is_some());
        clock.advance(chrono::Duration::minutes(5));
    }

    let history = AttemptHistoryService::new(Arc::clone(&storage.attempts));
    let items = history.list_history().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].score, 1);
    assert_eq!(items[1].score, 2);
    assert!(items[0].completed_at > items[1].completed_at);
    assert_eq!(items[1].completed_at, fixed_now());
}

#[tokio::test(start_paused = true)]
async fn timer_ticks_drive_a_session_to_completion() {
    let repo = InMemoryRepository::new();
    let quiz = QuizLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(sample_questions()),
        QuizSettings::new(2, Duration::from_millis(500)).unwrap(),
        Arc::new(repo.clone()),
    );
    let mut session = quiz.start_session();

    let (timer, mut ticks) = TickTimer::every_second();
    while ticks.recv().await.is_some() {
        let update = quiz.tick(&mut session).await.unwrap();
        if update.is_complete {
            timer.cancel();
            break;
        }
    }

    assert!(session.is_complete());
    assert!(session.answers().is_empty());
    assert_eq!(repo.list_attempts().await.unwrap().len(), 1);
}

/// Repository whose first save commits but reports the store as unavailable.
struct LostAckRepository {
    inner: InMemoryRepository,
    acked: AtomicU32,
}

#[async_trait]
impl AttemptRepository for LostAckRepository {
    async fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn save_attempt(&self, attempt: &Attempt) -> Result<(), StorageError> {
        self.inner.save_attempt(attempt).await?;
        if self.acked.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(StorageError::Unavailable("connection reset".into()));
        }
        Ok(())
    }

    async fn list_attempts(&self) -> Result<Vec<Attempt>, StorageError> {
        self.inner.list_attempts().await
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Attempt, StorageError> {
        self.inner.get_attempt(id).await
    }
}

#[tokio::test(start_paused = true)]
async fn committed_save_with_lost_reply_counts_as_saved() {
    let repo = Arc::new(LostAckRepository {
        inner: InMemoryRepository::new(),
        acked: AtomicU32::new(0),
    });
    let quiz = loop_over(repo.clone()).with_retry(RetryPolicy::new(
        3,
        Duration::from_millis(50),
        Duration::from_millis(200),
    ));
    let mut session = quiz.start_session();
    quiz.submit_answer(&mut session, "4").await.unwrap();
    let update = quiz.submit_answer(&mut session, "Paris").await.unwrap();

    let id = update.saved_attempt_id.expect("attempt reported as saved");
    assert_eq!(session.saved_attempt_id(), Some(id));
    let stored = repo.list_attempts().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id(), id);
}

#[tokio::test]
async fn unusable_database_still_plays_and_scores() {
    let app = AppServices::new_sqlite_lazy(
        "sqlite:///nonexistent-dir/quiz/attempts.sqlite3",
        Clock::fixed(fixed_now()),
        sample_questions(),
        QuizSettings::default(),
    );
    let quiz = app.quiz_loop();

    let err = quiz.initialize_store().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Storage(StorageError::Unavailable(_))
    ));

    let mut session = quiz.start_session();
    quiz.submit_answer(&mut session, "4").await.unwrap();
    let err = quiz
        .submit_answer(&mut session, "Paris")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Storage(StorageError::Unavailable(_))
    ));

    assert!(session.is_complete());
    let attempt = session.attempt().expect("score available without storage");
    assert_eq!(attempt.score(), 2);
    assert_eq!(attempt.percentage(), 100);
    assert!(session.saved_attempt_id().is_none());
}
