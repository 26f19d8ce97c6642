//! Connection sources.
//!
//! Every helper takes "something that can yield a live connection". A caller-owned
//! [`DbContext`] is opened when closed and left open; a connection string (or a parsed
//! [`ConnectionConfig`]) produces a connection the helper owns and closes before returning.

use std::future::Future;

use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::error::SqlHelperError;
use crate::types::DatabaseType;

#[cfg(feature = "mssql")]
use crate::mssql::MssqlClient;
#[cfg(feature = "postgres")]
use crate::postgres::PostgresConnection;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteConnection;

/// A live connection to one backend.
pub enum BackendConnection {
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteConnection),
    #[cfg(feature = "postgres")]
    Postgres(PostgresConnection),
    #[cfg(feature = "mssql")]
    Mssql(Box<MssqlClient>),
}

// Manual Debug implementation because the tiberius client doesn't implement Debug
impl std::fmt::Debug for BackendConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(conn) => f.debug_tuple("Sqlite").field(conn).finish(),
            #[cfg(feature = "postgres")]
            Self::Postgres(conn) => f.debug_tuple("Postgres").field(conn).finish(),
            #[cfg(feature = "mssql")]
            Self::Mssql(_) => f.debug_tuple("Mssql").field(&"<TiberiusClient>").finish(),
        }
    }
}

impl BackendConnection {
    /// Open a new connection described by `config`.
    ///
    /// # Errors
    /// Returns the driver's error when the connection cannot be established.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, SqlHelperError> {
        debug!(backend = ?config.database_type(), "opening connection");
        match config {
            #[cfg(feature = "sqlite")]
            ConnectionConfig::Sqlite(opts) => {
                SqliteConnection::open(opts).await.map(BackendConnection::Sqlite)
            }
            #[cfg(feature = "postgres")]
            ConnectionConfig::Postgres(cfg) => PostgresConnection::connect(cfg)
                .await
                .map(BackendConnection::Postgres),
            #[cfg(feature = "mssql")]
            ConnectionConfig::Mssql(cfg) => crate::mssql::connect(cfg.clone())
                .await
                .map(|client| BackendConnection::Mssql(Box::new(client))),
        }
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => DatabaseType::Sqlite,
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "mssql")]
            Self::Mssql(_) => DatabaseType::Mssql,
        }
    }

    /// Close the connection, waiting for the driver to shut it down.
    ///
    /// # Errors
    /// Returns the driver's error if the close handshake fails.
    pub async fn close(self) -> Result<(), SqlHelperError> {
        let backend = self.database_type();
        let result = match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(conn) => conn.close().await,
            #[cfg(feature = "postgres")]
            Self::Postgres(conn) => {
                conn.close().await;
                Ok(())
            }
            #[cfg(feature = "mssql")]
            Self::Mssql(client) => client.close().await.map_err(SqlHelperError::from),
        };
        debug!(?backend, "connection closed");
        result
    }
}

/// Whether a [`DbContext`] currently holds a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
}

/// A caller-owned connection.
///
/// Helpers open a closed context on first use and never close it; closing (or dropping) the
/// context is the caller's job.
///
/// ```rust,no_run
/// use sql_helper::prelude::*;
///
/// # async fn demo() -> Result<(), SqlHelperError> {
/// let mut ctx = DbContext::from_connection_string("sqlite::memory:")?;
/// assert_eq!(ctx.state(), ConnectionState::Closed);
/// execute_non_query(&mut ctx, &SqlCommand::text("CREATE TABLE t (id INTEGER)")).await?;
/// assert_eq!(ctx.state(), ConnectionState::Open);
/// # Ok(()) }
/// ```
///
/// Each call holds the context mutably, so two calls can never overlap on one connection:
/// ```rust,compile_fail
/// use sql_helper::prelude::*;
///
/// # async fn demo(ctx: &mut DbContext) {
/// let cmd = SqlCommand::text("SELECT 1");
/// let _ = tokio::join!(execute_scalar(&mut *ctx, &cmd), execute_scalar(&mut *ctx, &cmd));
/// # }
/// ```
#[derive(Debug)]
pub struct DbContext {
    config: ConnectionConfig,
    conn: Option<BackendConnection>,
}

impl DbContext {
    /// Create a closed context.
    #[must_use]
    pub fn new(config: impl Into<ConnectionConfig>) -> Self {
        Self {
            config: config.into(),
            conn: None,
        }
    }

    /// Parse `conn_str` into a closed context.
    ///
    /// # Errors
    /// Returns `SqlHelperError::ConfigError` if the string cannot be parsed.
    pub fn from_connection_string(conn_str: &str) -> Result<Self, SqlHelperError> {
        ConnectionConfig::parse(conn_str).map(Self::new)
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if self.conn.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.config.database_type()
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open the connection if it is closed. Opening an open context does nothing.
    ///
    /// # Errors
    /// Returns the driver's error when the connection cannot be established.
    pub async fn open(&mut self) -> Result<(), SqlHelperError> {
        if self.conn.is_none() {
            self.conn = Some(BackendConnection::connect(&self.config).await?);
        }
        Ok(())
    }

    /// Close the connection if it is open.
    ///
    /// # Errors
    /// Returns the driver's error if the close handshake fails.
    pub async fn close(&mut self) -> Result<(), SqlHelperError> {
        match self.conn.take() {
            Some(conn) => conn.close().await,
            None => Ok(()),
        }
    }

    /// The live connection, for work the helpers do not cover.
    pub fn connection_mut(&mut self) -> Option<&mut BackendConnection> {
        self.conn.as_mut()
    }
}

/// A connection acquired for one helper call.
#[derive(Debug)]
pub enum LiveConnection<'a> {
    /// Borrowed from a caller's [`DbContext`]; stays open after the call.
    Borrowed(&'a mut BackendConnection),
    /// Opened by the helper; closed when released or dropped.
    Owned(BackendConnection),
}

impl LiveConnection<'_> {
    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    pub fn backend(&mut self) -> &mut BackendConnection {
        match self {
            Self::Borrowed(conn) => &mut **conn,
            Self::Owned(conn) => conn,
        }
    }

    /// Close an owned connection; leave a borrowed one alone.
    ///
    /// # Errors
    /// Returns the driver's error if closing an owned connection fails.
    pub async fn release(self) -> Result<(), SqlHelperError> {
        match self {
            Self::Borrowed(_) => Ok(()),
            Self::Owned(conn) => conn.close().await,
        }
    }

    /// Release the connection, then hand back `result`.
    ///
    /// The call's own error wins over a close error, which is only logged in that case.
    pub(crate) async fn finish<T>(
        self,
        result: Result<T, SqlHelperError>,
    ) -> Result<T, SqlHelperError> {
        let released = self.release().await;
        match (result, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "closing helper-owned connection failed after an error");
                Err(err)
            }
        }
    }
}

/// Anything that can yield a live connection for one call.
pub trait ConnectionSource<'a> {
    /// Get or open a live connection.
    #[allow(clippy::manual_async_fn)]
    fn acquire(self) -> impl Future<Output = Result<LiveConnection<'a>, SqlHelperError>> + Send;
}

impl<'a> ConnectionSource<'a> for &'a mut DbContext {
    #[allow(clippy::manual_async_fn)]
    fn acquire(self) -> impl Future<Output = Result<LiveConnection<'a>, SqlHelperError>> + Send {
        async move {
            if self.conn.is_none() {
                debug!(backend = ?self.database_type(), "context closed; opening");
            }
            self.open().await?;
            let DbContext { conn, .. } = self;
            conn.as_mut().map(LiveConnection::Borrowed).ok_or_else(|| {
                SqlHelperError::ConnectionError("context did not open a connection".into())
            })
        }
    }
}

impl<'a> ConnectionSource<'a> for &'a ConnectionConfig {
    #[allow(clippy::manual_async_fn)]
    fn acquire(self) -> impl Future<Output = Result<LiveConnection<'a>, SqlHelperError>> + Send {
        async move {
            BackendConnection::connect(self)
                .await
                .map(LiveConnection::Owned)
        }
    }
}

impl<'a> ConnectionSource<'a> for &'a str {
    #[allow(clippy::manual_async_fn)]
    fn acquire(self) -> impl Future<Output = Result<LiveConnection<'a>, SqlHelperError>> + Send {
        async move {
            let config = ConnectionConfig::parse(self)?;
            BackendConnection::connect(&config)
                .await
                .map(LiveConnection::Owned)
        }
    }
}

impl<'a> ConnectionSource<'a> for &'a String {
    #[allow(clippy::manual_async_fn)]
    fn acquire(self) -> impl Future<Output = Result<LiveConnection<'a>, SqlHelperError>> + Send {
        self.as_str().acquire()
    }
}
