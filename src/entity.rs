//! Rows to records and records to rows, both through `serde`.
//!
//! Reading starts from `T::default()` serialized to a JSON object, overlays every column
//! whose name matches a member, and deserializes the result back into `T`. Members with no
//! matching column keep their default; columns with no matching member are ignored.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::SqlHelperError;
use crate::results::{DataRow, DataTable};
use crate::types::{RowValues, parse_timestamp};

/// Materialize one `T` per row of `table`.
///
/// # Errors
/// Returns `SqlHelperError::ParameterError` if `T` does not serialize to a map, or naming the
/// member a column value cannot populate.
pub(crate) fn table_to_entities<T>(table: &DataTable) -> Result<Vec<T>, SqlHelperError>
where
    T: Serialize + DeserializeOwned + Default,
{
    let template = match serde_json::to_value(T::default())? {
        Value::Object(map) => map,
        other => {
            return Err(SqlHelperError::ParameterError(format!(
                "entity type must serialize to a map of members, not {}",
                json_kind(&other)
            )));
        }
    };
    table
        .rows()
        .iter()
        .map(|row| materialize(&template, row))
        .collect()
}

fn materialize<T: DeserializeOwned>(template: &Map<String, Value>, row: &DataRow) -> Result<T, SqlHelperError> {
    let mut members = template.clone();
    for (name, slot) in &mut members {
        if let Some(value) = row.get(name) {
            *slot = resolve::<T>(template, name, value, slot);
        }
    }
    serde_json::from_value(Value::Object(members)).map_err(|e| {
        let member = culprit::<T>(template, row).unwrap_or_else(|| "<unknown>".to_string());
        SqlHelperError::ParameterError(format!("cannot populate member `{member}`: {e}"))
    })
}

/// The form of `value` that populates member `name`.
///
/// A `None` default says nothing about the member's type, so every reading of the cell is
/// tried against `T` and the first one it accepts wins.
fn resolve<T: DeserializeOwned>(template: &Map<String, Value>, name: &str, value: &RowValues, slot: &Value) -> Value {
    let shaped = column_to_member(value, slot);
    if !slot.is_null() {
        return shaped;
    }
    let candidates = alternatives(value);
    if candidates.is_empty() {
        return shaped;
    }
    let fits = |candidate: &Value| {
        let mut members = template.clone();
        members.insert(name.to_string(), candidate.clone());
        serde_json::from_value::<T>(Value::Object(members)).is_ok()
    };
    if fits(&shaped) {
        return shaped;
    }
    candidates.into_iter().find(|c| fits(c)).unwrap_or(shaped)
}

/// Other readings of a cell, such as 0/1 as a bool or text holding a timestamp or JSON.
fn alternatives(value: &RowValues) -> Vec<Value> {
    match value {
        RowValues::Int(i @ (0 | 1)) => vec![Value::Bool(*i == 1)],
        RowValues::Text(s) => {
            let mut found = Vec::new();
            if let Some(dt) = parse_timestamp(s) {
                found.push(RowValues::Timestamp(dt).to_json());
            }
            if let Ok(json @ (Value::Object(_) | Value::Array(_))) = serde_json::from_str::<Value>(s) {
                found.push(json);
            }
            found
        }
        _ => Vec::new(),
    }
}

/// Shape a cell for the member it populates.
fn column_to_member(value: &RowValues, slot: &Value) -> Value {
    match (value, slot) {
        (RowValues::Int(i @ (0 | 1)), Value::Bool(_)) => Value::Bool(*i == 1),
        // JSON kept as text, as SQLite does
        (RowValues::Text(s), Value::Object(_) | Value::Array(_)) => {
            serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
        }
        // Timestamps read back as text take the form the default value serialized to.
        (RowValues::Text(s), Value::String(default)) if parse_timestamp(default).is_some() => {
            parse_timestamp(s).map_or_else(|| Value::String(s.clone()), |dt| RowValues::Timestamp(dt).to_json())
        }
        _ => value.to_json(),
    }
}

/// First member whose column alone makes deserialization fail.
fn culprit<T: DeserializeOwned>(template: &Map<String, Value>, row: &DataRow) -> Option<String> {
    template.iter().find_map(|(name, slot)| {
        let value = row.get(name)?;
        let mut members = template.clone();
        members.insert(name.clone(), resolve::<T>(template, name, value, slot));
        serde_json::from_value::<T>(Value::Object(members))
            .is_err()
            .then(|| name.clone())
    })
}

/// Lay records out as a table: one column per member name, in first-seen order.
///
/// Members a record lacks are NULL in its row.
///
/// # Errors
/// Returns `SqlHelperError::ParameterError` if a record does not serialize to a map or a
/// member value has no cell representation.
pub(crate) fn records_to_table<T: Serialize>(records: &[T]) -> Result<DataTable, SqlHelperError> {
    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut maps = Vec::with_capacity(records.len());

    for (idx, record) in records.iter().enumerate() {
        match serde_json::to_value(record)? {
            Value::Object(map) => {
                for key in map.keys() {
                    if !seen.contains_key(key) {
                        seen.insert(key.clone(), columns.len());
                        columns.push(key.clone());
                    }
                }
                maps.push(map);
            }
            other => {
                return Err(SqlHelperError::ParameterError(format!(
                    "record {idx} serialized to {}, expected a map of members",
                    json_kind(&other)
                )));
            }
        }
    }

    let mut table = DataTable::with_capacity(columns.clone(), maps.len());
    for mut map in maps {
        let values = columns
            .iter()
            .map(|column| map.remove(column).map_or(Ok(RowValues::Null), RowValues::from_json))
            .collect::<Result<Vec<_>, _>>()?;
        table.add_row_values(values);
    }
    Ok(table)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}
