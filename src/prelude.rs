//! Convenient imports for common functionality.
//!
//! `use sql_helper::prelude::*;` brings in the helpers, the command and result types, the
//! connection types and the error type.

pub use crate::bulk::{BulkCopyFlags, BulkCopyOptions};
pub use crate::command::{SqlCommand, SqlParameter};
pub use crate::config::ConnectionConfig;
pub use crate::connection::{ConnectionSource, ConnectionState, DbContext};
pub use crate::decode::FromScalar;
pub use crate::error::SqlHelperError;
pub use crate::helper::{
    bulk_insert_records, bulk_insert_table, execute_data_table, execute_dataset, execute_entity,
    execute_non_query, execute_scalar, execute_scalar_as,
};
pub use crate::results::{DataRow, DataSet, DataTable};
pub use crate::types::{CommandType, DatabaseType, RowValues};

#[cfg(feature = "mssql")]
pub use crate::config::{MssqlOptions, MssqlOptionsBuilder};
#[cfg(feature = "sqlite")]
pub use crate::config::SqliteOptions;
