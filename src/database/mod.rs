//! Helps to connect to the database.

use std::sync::Arc;

use camino::Utf8Path;
use sqlx::{
    pool::PoolConnection,
    query::Query,
    sqlite::{SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite,
};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::DatabaseError;

/// A handle to the catalogue database.
///
/// Cloning is cheap. All clones share one connection pool, and one tag
/// recount lock.
#[derive(Clone, Debug)]
pub struct Database {
    pool: Pool<Sqlite>,
    recount: Arc<Mutex<()>>,
}

impl Database {
    /// Opens (or creates) the database file at `path` and runs any pending
    /// migrations.
    #[tracing::instrument]
    pub async fn connect(path: &Utf8Path) -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_std_path())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .with_regexp();

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .inspect_err(|e| tracing::error!("Failed to connect to catalogue database. err: {e}"))
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    "Database connection succeeded, but migrating the database failed! err: {e}"
                )
            })?;

        tracing::debug!("Connected to catalogue database at `{path}`.");
        Ok(Self {
            pool,
            recount: Arc::new(Mutex::new(())),
        })
    }

    /// The underlying pool, for running queries.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Grabs a single connection from the pool.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, DatabaseError> {
        self.pool
            .acquire()
            .await
            .inspect_err(|e| tracing::error!("Failed to get database connection! err: {e}"))
            .map_err(DatabaseError::from)
    }

    /// Waits for any other tag recount on this database to finish, then holds
    /// off new ones until the guard drops.
    pub(crate) async fn lock_recount(&self) -> MutexGuard<'_, ()> {
        self.recount.lock().await
    }
}

/// Something that knows how to write itself into its table.
pub trait InsertIntoTable {
    fn make_insertion_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>>;
}
