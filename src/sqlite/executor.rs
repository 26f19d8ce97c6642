use super::connection::SqliteConnection;
use super::params::to_sqlite_values;
use super::query::run_script;
use crate::error::SqlHelperError;
use crate::results::{DataSet, DataTable};
use crate::types::RowValues;

/// Run `query` and collect one table per statement that returns columns.
///
/// # Errors
/// Returns `SqlHelperError::SqliteError` if preparing or stepping a statement fails.
pub(crate) async fn fill_dataset(
    conn: &SqliteConnection,
    query: &str,
    params: &[RowValues],
) -> Result<DataSet, SqlHelperError> {
    let sql = query.to_owned();
    let values = to_sqlite_values(params);
    conn.interact(move |c| {
        let mut dataset = DataSet::new();
        run_script(c, &sql, &values, |table| dataset.push(table))?;
        Ok(dataset)
    })
    .await
}

/// Run `query` and return the number of rows changed by its statements.
///
/// # Errors
/// Returns `SqlHelperError::SqliteError` if preparing or stepping a statement fails.
pub(crate) async fn execute_non_query(
    conn: &SqliteConnection,
    query: &str,
    params: &[RowValues],
) -> Result<usize, SqlHelperError> {
    let sql = query.to_owned();
    let values = to_sqlite_values(params);
    conn.interact(move |c| run_script(c, &sql, &values, drop::<DataTable>))
        .await
}

/// Execute parameterless SQL, such as transaction control.
///
/// # Errors
/// Returns `SqlHelperError::SqliteError` if execution fails.
pub(crate) async fn execute_batch(conn: &SqliteConnection, sql: &str) -> Result<(), SqlHelperError> {
    let sql = sql.to_owned();
    conn.interact(move |c| c.execute_batch(&sql).map_err(SqlHelperError::from))
        .await
}

/// Columns of `table` that `SQLite` fills in itself: a single-column `INTEGER PRIMARY KEY`,
/// which aliases the rowid.
///
/// # Errors
/// Returns `SqlHelperError::SqliteError` if the table metadata cannot be read.
pub(crate) async fn identity_columns(
    conn: &SqliteConnection,
    table: &str,
) -> Result<Vec<String>, SqlHelperError> {
    let (schema, name) = match table.split_once('.') {
        Some((schema, name)) => (unquote(schema), unquote(name)),
        None => ("main".to_string(), unquote(table)),
    };
    conn.interact(move |c| {
        let mut stmt =
            c.prepare("SELECT name, type, pk FROM pragma_table_info(?1, ?2) WHERE pk > 0")?;
        let keys = stmt
            .query_map([&name, &schema], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match keys.as_slice() {
            [(col, decl)] if decl.eq_ignore_ascii_case("INTEGER") => vec![col.clone()],
            _ => Vec::new(),
        })
    })
    .await
}

fn unquote(ident: &str) -> String {
    ident
        .trim()
        .trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'))
        .to_string()
}
