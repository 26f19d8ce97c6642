use rusqlite::types::Value;

use crate::types::RowValues;

/// Convert one `RowValues` to the value rusqlite binds.
///
/// `SQLite` has no boolean, timestamp or JSON storage class: booleans bind as 0/1,
/// timestamps as `YYYY-MM-DD HH:MM:SS[.fff]` text and JSON as its serialized text.
pub(crate) fn to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

pub(crate) fn to_sqlite_values(values: &[RowValues]) -> Vec<Value> {
    values.iter().map(to_sqlite_value).collect()
}
