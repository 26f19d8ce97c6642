use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use tiberius::{ColumnData, FromSql, QueryItem};

use super::config::MssqlClient;
use super::params::bind_query_params;
use crate::error::SqlHelperError;
use crate::results::{DataSet, DataTable};
use crate::types::RowValues;

/// Run `query` and collect every result set it produces, in order.
///
/// # Errors
/// Returns `SqlHelperError::MssqlError` if the batch fails or a value cannot be decoded.
pub(crate) async fn build_dataset(
    client: &mut MssqlClient,
    query: &str,
    params: &[RowValues],
) -> Result<DataSet, SqlHelperError> {
    let mut stream = bind_query_params(query, params).query(client).await?;

    let mut dataset = DataSet::new();
    let mut current: Option<DataTable> = None;
    while let Some(item) = stream.try_next().await? {
        match item {
            QueryItem::Metadata(meta) => {
                if let Some(table) = current.take() {
                    dataset.push(table);
                }
                let column_names = meta.columns().iter().map(|c| c.name().to_string()).collect();
                current = Some(DataTable::with_capacity(column_names, 10));
            }
            QueryItem::Row(row) => {
                let table = current.as_mut().ok_or_else(|| {
                    SqlHelperError::ExecutionError("SQL Server sent a row before its columns".into())
                })?;
                let row_values = row
                    .into_iter()
                    .map(extract_value)
                    .collect::<Result<Vec<_>, _>>()?;
                table.add_row_values(row_values);
            }
        }
    }
    if let Some(table) = current {
        dataset.push(table);
    }
    Ok(dataset)
}

/// Convert one SQL Server cell to a `RowValues`.
fn extract_value(data: ColumnData<'static>) -> Result<RowValues, SqlHelperError> {
    Ok(match &data {
        ColumnData::U8(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map_or(RowValues::Null, RowValues::Int),
        ColumnData::F32(v) => v.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map_or(RowValues::Null, RowValues::Float),
        ColumnData::Bit(v) => v.map_or(RowValues::Null, RowValues::Bool),
        ColumnData::Numeric(v) => v.map_or(RowValues::Null, |n| RowValues::Float(f64::from(n))),
        ColumnData::Guid(v) => v.map_or(RowValues::Null, |g| RowValues::Text(g.to_string())),
        ColumnData::Binary(v) => v
            .as_ref()
            .map_or(RowValues::Null, |b| RowValues::Blob(b.to_vec())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(&data)?.map_or(RowValues::Null, RowValues::Timestamp)
        }
        ColumnData::DateTimeOffset(_) => DateTime::<Utc>::from_sql(&data)?
            .map_or(RowValues::Null, |dt| RowValues::Timestamp(dt.naive_utc())),
        ColumnData::Date(_) => NaiveDate::from_sql(&data)?
            .map_or(RowValues::Null, |d| RowValues::Timestamp(d.and_time(NaiveTime::MIN))),
        ColumnData::Time(_) => NaiveTime::from_sql(&data)?
            .map_or(RowValues::Null, |t| RowValues::Text(t.to_string())),
        // strings and xml
        _ => <&str>::from_sql(&data)?.map_or(RowValues::Null, |s| RowValues::Text(s.to_string())),
    })
}
