mod dataset;
mod row;
mod table;

pub use dataset::DataSet;
pub use row::DataRow;
pub use table::DataTable;
