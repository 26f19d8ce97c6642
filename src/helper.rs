//! One-call helpers.
//!
//! Every helper takes a [`ConnectionSource`]: a `&mut DbContext` the caller owns (opened if
//! closed, left open afterwards), or a connection string / [`ConnectionConfig`] for which the
//! helper opens a connection and closes it again before returning, whether the call
//! succeeded or not.
//!
//! ```rust,no_run
//! use sql_helper::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlHelperError> {
//! let mut ctx = DbContext::from_connection_string("sqlite:app.db")?;
//! let count: i64 = execute_scalar_as(&mut ctx, &SqlCommand::text("SELECT count(*) FROM users")).await?;
//!
//! // A one-off call on its own connection
//! let names = execute_data_table("sqlite:app.db", &SqlCommand::text("SELECT name FROM users")).await?;
//! # let _ = (count, names);
//! # Ok(()) }
//! ```
//!
//! [`ConnectionConfig`]: crate::ConnectionConfig

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::bulk::{BulkCopyOptions, bulk_insert};
use crate::command::SqlCommand;
use crate::connection::ConnectionSource;
use crate::decode::FromScalar;
use crate::entity::{records_to_table, table_to_entities};
use crate::error::SqlHelperError;
use crate::results::{DataSet, DataTable};
use crate::types::RowValues;

/// Run `command` and return every result set it produced.
///
/// # Errors
/// Returns the connection or driver error, or `SqlHelperError::Unimplemented` for a stored
/// procedure on `SQLite`.
pub async fn execute_dataset<'a, S>(
    source: S,
    command: &SqlCommand<'_>,
) -> Result<DataSet, SqlHelperError>
where
    S: ConnectionSource<'a>,
{
    let mut live = source.acquire().await?;
    let result = live.backend().fill_dataset(command).await;
    live.finish(result).await
}

/// Run `command` and return its first result set.
///
/// # Errors
/// Returns `SqlHelperError::ExecutionError` when the command produced no result set, plus
/// everything [`execute_dataset`] can return.
pub async fn execute_data_table<'a, S>(
    source: S,
    command: &SqlCommand<'_>,
) -> Result<DataTable, SqlHelperError>
where
    S: ConnectionSource<'a>,
{
    execute_dataset(source, command)
        .await?
        .into_first_table()
        .ok_or_else(|| SqlHelperError::ExecutionError("command produced no result set".into()))
}

/// First column of the first row, exactly as the driver returned it.
///
/// `None` when no row came back; `Some(RowValues::Null)` for a NULL cell.
///
/// # Errors
/// Everything [`execute_dataset`] can return.
pub async fn execute_scalar<'a, S>(
    source: S,
    command: &SqlCommand<'_>,
) -> Result<Option<RowValues>, SqlHelperError>
where
    S: ConnectionSource<'a>,
{
    let dataset = execute_dataset(source, command).await?;
    Ok(dataset
        .into_first_table()
        .and_then(|table| table.into_iter().next())
        .and_then(|row| row.values.into_iter().next()))
}

/// First column of the first row, read as `T`.
///
/// ```rust,no_run
/// use sql_helper::prelude::*;
///
/// # async fn demo(ctx: &mut DbContext) -> Result<(), SqlHelperError> {
/// let total: i64 = execute_scalar_as(&mut *ctx, &SqlCommand::text("SELECT count(*) FROM t")).await?;
/// let newest: Option<String> =
///     execute_scalar_as(ctx, &SqlCommand::text("SELECT max(name) FROM t")).await?;
/// # let _ = (total, newest);
/// # Ok(()) }
/// ```
///
/// # Errors
/// Returns `SqlHelperError::InvalidCast` when the value has another runtime type (or does
/// not fit), `SqlHelperError::NullValue` when it is NULL or missing and `T` is not an
/// `Option`, plus everything [`execute_dataset`] can return.
pub async fn execute_scalar_as<'a, T, S>(
    source: S,
    command: &SqlCommand<'_>,
) -> Result<T, SqlHelperError>
where
    T: FromScalar,
    S: ConnectionSource<'a>,
{
    T::from_scalar(execute_scalar(source, command).await?)
}

/// Run `command` for its side effects and return the affected-row count the driver reports.
///
/// # Errors
/// Returns the connection or driver error.
pub async fn execute_non_query<'a, S>(
    source: S,
    command: &SqlCommand<'_>,
) -> Result<usize, SqlHelperError>
where
    S: ConnectionSource<'a>,
{
    let mut live = source.acquire().await?;
    let result = live.backend().execute_non_query(command).await;
    live.finish(result).await
}

/// Run `command` and map each row of its first result set onto a `T`.
///
/// Members are matched to columns by exact name; members with no column keep the value
/// `T::default()` gives them, and integer 0/1 columns fill `bool` members.
///
/// # Errors
/// Returns `SqlHelperError::ParameterError` naming the member a column cannot populate, plus
/// everything [`execute_data_table`] can return.
pub async fn execute_entity<'a, T, S>(
    source: S,
    command: &SqlCommand<'_>,
) -> Result<Vec<T>, SqlHelperError>
where
    T: Serialize + DeserializeOwned + Default,
    S: ConnectionSource<'a>,
{
    let table = execute_data_table(source, command).await?;
    table_to_entities(&table)
}

/// Insert `records` into `table_name` in one transaction.
///
/// Each record must serialize to a map; its member names are the column names.
///
/// # Errors
/// Returns `SqlHelperError::ParameterError` for records that are not maps, or the error of
/// the first failing statement after the transaction has been rolled back.
pub async fn bulk_insert_records<'a, T, S>(
    source: S,
    table_name: &str,
    records: &[T],
    options: &BulkCopyOptions,
) -> Result<usize, SqlHelperError>
where
    T: Serialize,
    S: ConnectionSource<'a>,
{
    let (columns, rows) = records_to_table(records)?.into_parts();
    let mut live = source.acquire().await?;
    let result = bulk_insert(live.backend(), table_name, &columns, rows, options).await;
    live.finish(result).await
}

/// Insert every row of `table` into `table_name` in one transaction.
///
/// # Errors
/// Returns the error of the first failing statement after the transaction has been rolled
/// back, or `SqlHelperError::ParameterError` when no column is left to insert.
pub async fn bulk_insert_table<'a, S>(
    source: S,
    table_name: &str,
    table: &DataTable,
    options: &BulkCopyOptions,
) -> Result<usize, SqlHelperError>
where
    S: ConnectionSource<'a>,
{
    let rows = table.rows().iter().map(|row| row.values.clone()).collect();
    let mut live = source.acquire().await?;
    let result = bulk_insert(live.backend(), table_name, table.columns(), rows, options).await;
    live.finish(result).await
}
