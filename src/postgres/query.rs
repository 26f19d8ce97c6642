use std::error::Error;
use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use tokio_postgres::Statement;
use tokio_postgres::types::{FromSql, Type};

use crate::error::SqlHelperError;
use crate::results::DataTable;
use crate::types::RowValues;

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `SqlHelperError::PostgresError` if the column cannot be retrieved.
pub(crate) fn extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<RowValues, SqlHelperError> {
    let type_info = row.columns()[idx].type_();

    Ok(match type_info.name() {
        "int2" => {
            let val: Option<i16> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Int)
        }
        "float4" => {
            let val: Option<f32> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v)))
        }
        "float8" => {
            let val: Option<f64> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Float)
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Bool)
        }
        "timestamp" => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Timestamp)
        }
        "timestamptz" => {
            let val: Option<DateTime<Utc>> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc()))
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Timestamp(v.and_time(NaiveTime::MIN)))
        }
        "json" | "jsonb" => {
            let val: Option<Value> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::JSON)
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Blob)
        }
        // sum() and avg() over integers land here too
        "numeric" => {
            let val: Option<Numeric> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Float(v.0))
        }
        "oid" => {
            let val: Option<u32> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        "time" => {
            let val: Option<NaiveTime> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string()))
        }
        "uuid" => {
            let val: Option<Uuid> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Text(v.0))
        }
        _ if <String as FromSql>::accepts(type_info) => {
            let val: Option<String> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Text)
        }
        other => {
            return Err(SqlHelperError::ExecutionError(format!(
                "column `{}` has type {other}, which has no value mapping; cast it to text",
                row.columns()[idx].name()
            )));
        }
    })
}

/// A `numeric` read as `f64`, the way SQL Server decimals are.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Numeric(f64);

impl<'a> FromSql<'a> for Numeric {
    // Binary layout: ndigits, weight, sign, dscale (all 16-bit), then base-10000 digits.
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let word = |i: usize| -> Result<[u8; 2], Box<dyn Error + Sync + Send>> {
            raw.get(i * 2..i * 2 + 2)
                .map(|b| [b[0], b[1]])
                .ok_or_else(|| "truncated numeric value".into())
        };
        let ndigits = u16::from_be_bytes(word(0)?);
        let weight = i32::from(i16::from_be_bytes(word(1)?));
        match u16::from_be_bytes(word(2)?) {
            0xC000 => return Ok(Numeric(f64::NAN)),
            0xD000 => return Ok(Numeric(f64::INFINITY)),
            0xF000 => return Ok(Numeric(f64::NEG_INFINITY)),
            _ => {}
        }
        let negative = u16::from_be_bytes(word(2)?) == 0x4000;
        let digits = (0..usize::from(ndigits))
            .map(|i| word(4 + i).map(u16::from_be_bytes))
            .collect::<Result<Vec<_>, _>>()?;
        let group = |pos: i32| {
            usize::try_from(pos)
                .ok()
                .and_then(|p| digits.get(p))
                .copied()
                .unwrap_or(0)
        };

        let mut text = String::from(if negative { "-" } else { "" });
        if weight < 0 {
            text.push('0');
        } else {
            for pos in 0..=weight {
                if pos == 0 {
                    write!(text, "{}", group(pos))?;
                } else {
                    write!(text, "{:04}", group(pos))?;
                }
            }
        }
        text.push('.');
        let fraction_groups = (i32::from(ndigits) - weight - 1).max(0);
        for k in 1..=fraction_groups {
            write!(text, "{:04}", group(weight + k))?;
        }
        if fraction_groups == 0 {
            text.push('0');
        }
        Ok(Numeric(text.parse()?))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// A `uuid` in its hyphenated text form.
#[derive(Debug, Clone, PartialEq)]
struct Uuid(String);

impl<'a> FromSql<'a> for Uuid {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() != 16 {
            return Err(format!("uuid has {} bytes, expected 16", raw.len()).into());
        }
        let mut text = String::with_capacity(36);
        for (i, byte) in raw.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                text.push('-');
            }
            write!(text, "{byte:02x}")?;
        }
        Ok(Uuid(text))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::UUID
    }
}

/// Build a table using statement metadata for column names, so an empty result still
/// carries its columns.
///
/// # Errors
/// Returns errors from row value extraction.
pub(crate) fn build_table(
    stmt: &Statement,
    rows: &[tokio_postgres::Row],
) -> Result<DataTable, SqlHelperError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut table = DataTable::with_capacity(column_names, rows.len());
    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(extract_value(row, idx)?);
        }
        table.add_row_values(row_values);
    }
    Ok(table)
}
