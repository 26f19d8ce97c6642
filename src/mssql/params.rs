use std::borrow::Cow;

use tiberius::{ColumnData, Query, ToSql};

use crate::types::RowValues;

impl ToSql for RowValues {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            RowValues::Int(i) => ColumnData::I64(Some(*i)),
            RowValues::Float(f) => ColumnData::F64(Some(*f)),
            RowValues::Text(s) => ColumnData::String(Some(Cow::from(s.as_str()))),
            RowValues::Bool(b) => ColumnData::Bit(Some(*b)),
            RowValues::Timestamp(dt) => dt.to_sql(),
            // An nvarchar NULL: it converts implicitly to every column type except the binary ones.
            RowValues::Null => ColumnData::String(None),
            RowValues::JSON(jsval) => ColumnData::String(Some(Cow::from(jsval.to_string()))),
            RowValues::Blob(bytes) => ColumnData::Binary(Some(Cow::from(bytes.as_slice()))),
        }
    }
}

/// A query with `params` bound in order to `@P1`, `@P2`, ...
pub(crate) fn bind_query_params<'a>(query: &'a str, params: &'a [RowValues]) -> Query<'a> {
    let mut query_builder = Query::new(query);
    for param in params {
        query_builder.bind(param);
    }
    query_builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_data_per_variant() {
        assert!(matches!(RowValues::Int(5).to_sql(), ColumnData::I64(Some(5))));
        assert!(matches!(RowValues::Bool(true).to_sql(), ColumnData::Bit(Some(true))));
        assert!(matches!(RowValues::Null.to_sql(), ColumnData::String(None)));
        let ts = chrono::NaiveDate::from_ymd_opt(2023, 5, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        assert!(matches!(RowValues::Timestamp(ts).to_sql(), ColumnData::DateTime2(Some(_))));
    }
}
