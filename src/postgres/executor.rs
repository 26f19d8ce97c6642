use super::connection::PostgresConnection;
use super::params::as_refs;
use super::query::build_table;
use crate::error::SqlHelperError;
use crate::results::DataSet;
use crate::types::RowValues;

/// Prepare and run one statement; a statement that returns columns yields one table.
///
/// # Errors
/// Returns `SqlHelperError::PostgresError` if preparing or running the statement fails.
pub(crate) async fn fill_dataset(
    conn: &PostgresConnection,
    query: &str,
    params: &[RowValues],
) -> Result<DataSet, SqlHelperError> {
    let client = conn.client();
    let stmt = client.prepare(query).await?;
    let mut dataset = DataSet::new();
    if stmt.columns().is_empty() {
        client.execute(&stmt, &as_refs(params)).await?;
    } else {
        let rows = client.query(&stmt, &as_refs(params)).await?;
        dataset.push(build_table(&stmt, &rows)?);
    }
    Ok(dataset)
}

/// Run one statement and return the affected-row count the server reports.
///
/// # Errors
/// Returns `SqlHelperError::PostgresError` if the statement fails.
pub(crate) async fn execute_non_query(
    conn: &PostgresConnection,
    query: &str,
    params: &[RowValues],
) -> Result<usize, SqlHelperError> {
    let rows = conn.client().execute(query, &as_refs(params)).await?;
    usize::try_from(rows).map_err(|e| {
        SqlHelperError::ExecutionError(format!("postgres affected rows conversion error: {e}"))
    })
}

/// Execute parameterless SQL over the simple query protocol.
///
/// # Errors
/// Returns `SqlHelperError::PostgresError` if execution fails.
pub(crate) async fn execute_batch(conn: &PostgresConnection, sql: &str) -> Result<(), SqlHelperError> {
    conn.client().batch_execute(sql).await?;
    Ok(())
}

/// Identity columns and serial (`nextval` default) columns of `table`.
///
/// # Errors
/// Returns `SqlHelperError::PostgresError` if the table does not exist or the catalog
/// query fails.
pub(crate) async fn identity_columns(
    conn: &PostgresConnection,
    table: &str,
) -> Result<Vec<String>, SqlHelperError> {
    let rows = conn
        .client()
        .query(
            "SELECT a.attname::text
             FROM pg_attribute a
             LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
             WHERE a.attrelid = $1::text::regclass
               AND a.attnum > 0
               AND NOT a.attisdropped
               AND (a.attidentity <> '' OR pg_get_expr(d.adbin, d.adrelid) LIKE 'nextval(%')
             ORDER BY a.attnum",
            &[&table],
        )
        .await?;
    rows.iter()
        .map(|row| row.try_get::<_, String>(0).map_err(SqlHelperError::from))
        .collect()
}
