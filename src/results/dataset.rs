use super::table::DataTable;

/// Every result set one command produced, in order.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    pub tables: Vec<DataTable>,
}

impl DataSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: DataTable) {
        self.tables.push(table);
    }

    #[must_use]
    pub fn table(&self, index: usize) -> Option<&DataTable> {
        self.tables.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Take the first result set, dropping the rest.
    #[must_use]
    pub fn into_first_table(self) -> Option<DataTable> {
        self.tables.into_iter().next()
    }
}
