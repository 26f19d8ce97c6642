use super::config::MssqlClient;
use super::params::bind_query_params;
use super::query::build_dataset;
use crate::error::SqlHelperError;
use crate::results::DataSet;
use crate::types::RowValues;

/// Run `query` and collect every result set of the batch.
///
/// # Errors
/// Returns `SqlHelperError::MssqlError` if the batch fails.
pub(crate) async fn fill_dataset(
    client: &mut MssqlClient,
    query: &str,
    params: &[RowValues],
) -> Result<DataSet, SqlHelperError> {
    build_dataset(client, query, params).await
}

/// Run `query` and return the total rows affected across its statements.
///
/// # Errors
/// Returns `SqlHelperError::MssqlError` if the batch fails.
pub(crate) async fn execute_non_query(
    client: &mut MssqlClient,
    query: &str,
    params: &[RowValues],
) -> Result<usize, SqlHelperError> {
    let result = bind_query_params(query, params).execute(client).await?;
    let rows: u64 = result.rows_affected().iter().sum();
    usize::try_from(rows).map_err(|e| {
        SqlHelperError::ExecutionError(format!("SQL Server affected rows conversion error: {e}"))
    })
}

/// Send parameterless SQL as a plain batch, so session settings such as
/// `SET IDENTITY_INSERT` and open transactions outlive it.
///
/// # Errors
/// Returns `SqlHelperError::MssqlError` if the batch fails.
pub(crate) async fn execute_batch(client: &mut MssqlClient, sql: &str) -> Result<(), SqlHelperError> {
    client.simple_query(sql).await?.into_results().await?;
    Ok(())
}

/// Identity columns of `table`.
///
/// # Errors
/// Returns `SqlHelperError::MssqlError` if the catalog query fails.
pub(crate) async fn identity_columns(
    client: &mut MssqlClient,
    table: &str,
) -> Result<Vec<String>, SqlHelperError> {
    let params = [RowValues::Text(table.to_string())];
    let rows = bind_query_params(
        "SELECT c.name FROM sys.columns c \
         WHERE c.object_id = OBJECT_ID(@P1) AND c.is_identity = 1 \
         ORDER BY c.column_id",
        &params,
    )
    .query(client)
    .await?
    .into_first_result()
    .await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get::<&str, _>(0).map(str::to_string))
        .collect())
}
