use std::fmt;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio::task;

use super::config::SqliteOptions;
use crate::error::SqlHelperError;

type SharedSqliteConnection = Arc<Mutex<Connection>>;

/// An open `SQLite` database.
///
/// rusqlite is blocking, so every operation runs on tokio's blocking pool against the
/// mutex-guarded connection.
pub struct SqliteConnection {
    conn: SharedSqliteConnection,
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection").finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open (creating if needed) the database named by `opts`.
    ///
    /// # Errors
    /// Returns `SqlHelperError::SqliteError` if rusqlite cannot open the database.
    pub async fn open(opts: &SqliteOptions) -> Result<Self, SqlHelperError> {
        let path = opts.db_path.clone();
        let foreign_keys = opts.foreign_keys;
        let conn = task::spawn_blocking(move || -> Result<Connection, SqlHelperError> {
            let conn = Connection::open(&path)?;
            if foreign_keys {
                conn.execute_batch("PRAGMA foreign_keys = ON")?;
            }
            Ok(conn)
        })
        .await
        .map_err(join_error)??;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    ///
    /// # Errors
    /// Returns whatever `f` returns, or `SqlHelperError::ConnectionError` if the blocking
    /// task panicked or the connection lock is poisoned.
    pub async fn interact<F, R>(&self, f: F) -> Result<R, SqlHelperError>
    where
        F: FnOnce(&mut Connection) -> Result<R, SqlHelperError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| poisoned())?;
            f(&mut guard)
        })
        .await
        .map_err(join_error)?
    }

    /// Close the database, surfacing any error `sqlite3_close` reports.
    ///
    /// # Errors
    /// Returns `SqlHelperError::SqliteError` if the close fails.
    pub async fn close(self) -> Result<(), SqlHelperError> {
        let mutex = Arc::try_unwrap(self.conn).map_err(|_| {
            SqlHelperError::ConnectionError("sqlite connection is still in use".into())
        })?;
        let conn = mutex.into_inner().map_err(|_| poisoned())?;
        task::spawn_blocking(move || conn.close().map_err(|(_, e)| SqlHelperError::SqliteError(e)))
            .await
            .map_err(join_error)?
    }
}

fn poisoned() -> SqlHelperError {
    SqlHelperError::ConnectionError("sqlite connection lock poisoned".into())
}

fn join_error(e: task::JoinError) -> SqlHelperError {
    SqlHelperError::ConnectionError(format!("sqlite blocking task failed: {e}"))
}
