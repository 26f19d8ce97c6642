use tracing::debug;

use crate::command::{CallShape, SqlCommand};
use crate::connection::BackendConnection;
use crate::error::SqlHelperError;
use crate::results::DataSet;
use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "mssql")]
use crate::mssql;
#[cfg(feature = "postgres")]
use crate::postgres;
#[cfg(feature = "sqlite")]
use crate::sqlite;

impl BackendConnection {
    /// Executes parameterless SQL (one or more statements) by delegating to the backend.
    ///
    /// No transaction is opened around it.
    ///
    /// # Errors
    /// Returns an error if the database responds with an error.
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlHelperError> {
        debug!(backend = ?self.database_type(), "executing batch");
        match self {
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(conn) => sqlite::executor::execute_batch(conn, sql).await,
            #[cfg(feature = "postgres")]
            BackendConnection::Postgres(conn) => {
                postgres::executor::execute_batch(conn, sql).await
            }
            #[cfg(feature = "mssql")]
            BackendConnection::Mssql(client) => mssql::executor::execute_batch(client, sql).await,
        }
    }

    /// Run `command` and collect its result sets.
    pub(crate) async fn fill_dataset(
        &mut self,
        command: &SqlCommand<'_>,
    ) -> Result<DataSet, SqlHelperError> {
        let sql = command.statement_for(self.database_type(), CallShape::Rows)?;
        debug!(
            backend = ?self.database_type(),
            command_type = ?command.command_type(),
            params = command.values().len(),
            "filling dataset"
        );
        self.query_statement(&sql, command.values()).await
    }

    /// Run `command` for its affected-row count.
    pub(crate) async fn execute_non_query(
        &mut self,
        command: &SqlCommand<'_>,
    ) -> Result<usize, SqlHelperError> {
        let sql = command.statement_for(self.database_type(), CallShape::NonQuery)?;
        debug!(
            backend = ?self.database_type(),
            command_type = ?command.command_type(),
            params = command.values().len(),
            "executing non-query"
        );
        self.execute_statement(&sql, command.values()).await
    }

    async fn query_statement(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<DataSet, SqlHelperError> {
        match self {
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(conn) => {
                sqlite::executor::fill_dataset(conn, sql, params).await
            }
            #[cfg(feature = "postgres")]
            BackendConnection::Postgres(conn) => {
                postgres::executor::fill_dataset(conn, sql, params).await
            }
            #[cfg(feature = "mssql")]
            BackendConnection::Mssql(client) => {
                mssql::executor::fill_dataset(client, sql, params).await
            }
        }
    }

    /// Execute already-built SQL with positional parameters and return the affected rows.
    pub(crate) async fn execute_statement(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<usize, SqlHelperError> {
        match self {
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(conn) => {
                sqlite::executor::execute_non_query(conn, sql, params).await
            }
            #[cfg(feature = "postgres")]
            BackendConnection::Postgres(conn) => {
                postgres::executor::execute_non_query(conn, sql, params).await
            }
            #[cfg(feature = "mssql")]
            BackendConnection::Mssql(client) => {
                mssql::executor::execute_non_query(client, sql, params).await
            }
        }
    }

    /// Columns of `table` whose values the database assigns itself.
    pub(crate) async fn identity_columns(
        &mut self,
        table: &str,
    ) -> Result<Vec<String>, SqlHelperError> {
        match self {
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(conn) => {
                sqlite::executor::identity_columns(conn, table).await
            }
            #[cfg(feature = "postgres")]
            BackendConnection::Postgres(conn) => {
                postgres::executor::identity_columns(conn, table).await
            }
            #[cfg(feature = "mssql")]
            BackendConnection::Mssql(client) => {
                mssql::executor::identity_columns(client, table).await
            }
        }
    }

    pub(crate) async fn begin_transaction(&mut self) -> Result<(), SqlHelperError> {
        let sql = transaction_sql(self.database_type(), TransactionStep::Begin);
        self.execute_batch(sql).await
    }

    pub(crate) async fn commit(&mut self) -> Result<(), SqlHelperError> {
        let sql = transaction_sql(self.database_type(), TransactionStep::Commit);
        self.execute_batch(sql).await
    }

    pub(crate) async fn rollback(&mut self) -> Result<(), SqlHelperError> {
        let sql = transaction_sql(self.database_type(), TransactionStep::Rollback);
        self.execute_batch(sql).await
    }
}

#[derive(Debug, Clone, Copy)]
enum TransactionStep {
    Begin,
    Commit,
    Rollback,
}

fn transaction_sql(db: DatabaseType, step: TransactionStep) -> &'static str {
    match db {
        #[cfg(feature = "mssql")]
        DatabaseType::Mssql => match step {
            TransactionStep::Begin => "BEGIN TRANSACTION",
            TransactionStep::Commit => "COMMIT TRANSACTION",
            TransactionStep::Rollback => "ROLLBACK TRANSACTION",
        },
        #[allow(unreachable_patterns)]
        _ => match step {
            TransactionStep::Begin => "BEGIN",
            TransactionStep::Commit => "COMMIT",
            TransactionStep::Rollback => "ROLLBACK",
        },
    }
}
