use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::repository::{AttemptRepository, Storage, StorageError};

mod attempt_repo;
mod mapping;
mod migrate;

/// SQLite-backed attempt store.
///
/// The pool is opened lazily on first use (or via [`AttemptRepository::initialize`])
/// and then shared by every clone of the repository.
#[derive(Clone)]
pub struct SqliteRepository {
    database_url: Arc<str>,
    pool: Arc<OnceCell<SqlitePool>>,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<SqliteInitError> for StorageError {
    fn from(err: SqliteInitError) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

impl SqliteRepository {
    /// Create a repository for `database_url` without opening it yet.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: Arc::from(database_url.into()),
            pool: Arc::new(OnceCell::new()),
        }
    }

    /// Connect to `SQLite` using the given URL and create the schema.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// migrations fail.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = Self::new(database_url);
        repo.open().await?;
        Ok(repo)
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Whether the pool has been opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.pool.initialized()
    }

    pub(crate) async fn open(&self) -> Result<&SqlitePool, SqliteInitError> {
        self.pool
            .get_or_try_init(|| async {
                tracing::debug!(url = %self.database_url, "opening attempt store");
                let pool = open_pool(&self.database_url).await?;
                migrate::run_migrations(&pool).await?;
                tracing::info!(url = %self.database_url, "attempt store ready");
                Ok::<_, SqliteInitError>(pool)
            })
            .await
    }

    pub(crate) async fn pool(&self) -> Result<&SqlitePool, StorageError> {
        self.open().await.map_err(StorageError::from)
    }
}

async fn open_pool(database_url: &str) -> Result<SqlitePool, SqliteInitError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA journal_mode = WAL;")
                    .execute(&mut *conn)
                    .await?;
                sqlx::query("PRAGMA busy_timeout = 5000;")
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;
    Ok(pool)
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Ok(Self { attempts })
    }

    /// Build a `Storage` backed by `SQLite` that opens on first use.
    #[must_use]
    pub fn sqlite_lazy(database_url: &str) -> Self {
        let attempts: Arc<dyn AttemptRepository> = Arc::new(SqliteRepository::new(database_url));
        Self { attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[test]
    fn new_does_not_open() {
        let repo = SqliteRepository::new("sqlite::memory:");
        assert!(!repo.is_open());
        assert_eq!(repo.database_url(), "sqlite::memory:");
    }

    #[test]
    fn init_errors_surface_as_unavailable() {
        let err: StorageError = SqliteInitError::Sqlx(sqlx::Error::PoolTimedOut).into();
        assert!(err.is_transient());
    }
}
