use std::collections::HashMap;
use std::sync::Arc;

use super::row::{DataRow, index_columns};
use crate::error::SqlHelperError;
use crate::types::RowValues;

/// One tabular result: named columns and ordered rows.
///
/// Tables come back from query helpers, and callers build them by hand to feed
/// [`bulk_insert_table`](crate::bulk_insert_table):
/// ```rust
/// use sql_helper::prelude::*;
///
/// # fn demo() -> Result<(), SqlHelperError> {
/// let mut table = DataTable::new(vec!["id".into(), "name".into()]);
/// table.push_row(vec![RowValues::Int(1), RowValues::Text("alice".into())])?;
/// assert_eq!(table.len(), 1);
/// # Ok(()) }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
    rows: Vec<DataRow>,
    /// Rows the producing statement reported as affected (rows read for a SELECT)
    pub rows_affected: usize,
}

impl DataTable {
    /// Create an empty table with the given columns.
    #[must_use]
    pub fn new(column_names: Vec<String>) -> Self {
        Self::with_capacity(column_names, 0)
    }

    /// Create an empty table with preallocated room for `capacity` rows.
    #[must_use]
    pub fn with_capacity(column_names: Vec<String>, capacity: usize) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            column_names: Arc::new(column_names),
            column_index,
            rows: Vec::with_capacity(capacity),
            rows_affected: 0,
        }
    }

    /// Column names, in result order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Append a row, checking it has one value per column.
    ///
    /// # Errors
    /// Returns `SqlHelperError::ParameterError` when the value count does not match the columns.
    pub fn push_row(&mut self, values: Vec<RowValues>) -> Result<(), SqlHelperError> {
        if values.len() != self.column_names.len() {
            return Err(SqlHelperError::ParameterError(format!(
                "row has {} values but the table has {} columns",
                values.len(),
                self.column_names.len()
            )));
        }
        self.add_row_values(values);
        Ok(())
    }

    // Backends produce rows straight from column metadata, so the width is already right.
    pub(crate) fn add_row_values(&mut self, values: Vec<RowValues>) {
        self.rows.push(DataRow {
            column_names: Arc::clone(&self.column_names),
            values,
            column_index: Arc::clone(&self.column_index),
        });
        self.rows_affected += 1;
    }

    #[must_use]
    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row, if there is one.
    #[must_use]
    pub fn first_value(&self) -> Option<&RowValues> {
        self.rows.first().and_then(|row| row.get_by_index(0))
    }

    /// All values of one column, top to bottom.
    pub fn column_values<'a>(
        &'a self,
        column_name: &str,
    ) -> Option<impl Iterator<Item = &'a RowValues> + use<'a>> {
        let idx = *self.column_index.get(column_name)?;
        Some(self.rows.iter().filter_map(move |row| row.get_by_index(idx)))
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vec<RowValues>>) {
        let columns = Arc::unwrap_or_clone(self.column_names);
        let rows = self.rows.into_iter().map(|row| row.values).collect();
        (columns, rows)
    }
}

impl IntoIterator for DataTable {
    type Item = DataRow;
    type IntoIter = std::vec::IntoIter<DataRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a DataTable {
    type Item = &'a DataRow;
    type IntoIter = std::slice::Iter<'a, DataRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
