use fallible_iterator::FallibleIterator;
use rusqlite::types::Value;
use rusqlite::{Batch, Connection, Statement};

use crate::error::SqlHelperError;
use crate::results::DataTable;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
/// Returns `SqlHelperError::SqliteError` if the column cannot be read.
pub(crate) fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, SqlHelperError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Run every statement of `sql` in order.
///
/// Each statement binds the command's parameters by position, so `?2` means the second
/// parameter in whichever statement it appears. Statements that produce columns are
/// collected as tables and passed to `on_table`; the others are executed and their change
/// counts summed into the return value.
pub(crate) fn run_script(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    mut on_table: impl FnMut(DataTable),
) -> Result<usize, SqlHelperError> {
    let mut batch = Batch::new(conn, sql);
    let mut affected = 0usize;
    while let Some(mut stmt) = batch.next()? {
        bind_positional(&mut stmt, params)?;
        if stmt.column_count() == 0 {
            affected += stmt.raw_execute()?;
        } else {
            on_table(collect_table(&mut stmt)?);
        }
    }
    Ok(affected)
}

fn bind_positional(stmt: &mut Statement<'_>, params: &[Value]) -> Result<(), SqlHelperError> {
    let wanted = stmt.parameter_count();
    if wanted > params.len() {
        return Err(SqlHelperError::ParameterError(format!(
            "statement expects {wanted} parameters but the command has {}",
            params.len()
        )));
    }
    for (idx, value) in params.iter().take(wanted).enumerate() {
        stmt.raw_bind_parameter(idx + 1, value)?;
    }
    Ok(())
}

fn collect_table(stmt: &mut Statement<'_>) -> Result<DataTable, SqlHelperError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();
    let mut table = DataTable::with_capacity(column_names, 10);

    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(extract_value(row, i)?);
        }
        table.add_row_values(row_values);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_collects_tables_and_counts_changes() {
        let conn = Connection::open_in_memory().unwrap();
        let mut tables = Vec::new();
        let affected = run_script(
            &conn,
            "CREATE TABLE t (id INTEGER, name TEXT);
             INSERT INTO t VALUES (?1, ?2), (?1 + 1, ?2);
             SELECT id, name FROM t ORDER BY id;
             SELECT count(*) AS n FROM t WHERE id > ?1;",
            &[Value::Integer(10), Value::Text("x".into())],
            |table| tables.push(table),
        )
        .unwrap();

        assert_eq!(affected, 2);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].columns(), ["id", "name"]);
        assert_eq!(tables[0].len(), 2);
        assert_eq!(tables[1].first_value(), Some(&RowValues::Int(1)));
    }

    #[test]
    fn missing_parameters_are_reported() {
        let conn = Connection::open_in_memory().unwrap();
        let err = run_script(&conn, "SELECT ?1, ?2", &[Value::Integer(1)], |_| {}).unwrap_err();
        assert!(matches!(err, SqlHelperError::ParameterError(_)));
    }
}
