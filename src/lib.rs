//! Single-call helpers for everyday relational database work.
//!
//! Scalars, tables, entity lists, affected-row counts and transactional bulk loads, each
//! from one async function over `SQLite` (rusqlite), `PostgreSQL` (tokio-postgres) or SQL
//! Server (tiberius). Every helper accepts either a caller-owned [`DbContext`] or a
//! connection string.
//!
//! ```rust,no_run
//! use sql_helper::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlHelperError> {
//! let mut ctx = DbContext::from_connection_string("sqlite::memory:")?;
//! execute_non_query(&mut ctx, &SqlCommand::text("CREATE TABLE t (id INTEGER, name TEXT)")).await?;
//! execute_non_query(
//!     &mut ctx,
//!     &SqlCommand::text("INSERT INTO t VALUES (?1, ?2)").param(1).param("one"),
//! )
//! .await?;
//! let name: String = execute_scalar_as(&mut ctx, &SqlCommand::text("SELECT name FROM t")).await?;
//! assert_eq!(name, "one");
//! # Ok(()) }
//! ```

#[cfg(not(any(feature = "sqlite", feature = "postgres", feature = "mssql")))]
compile_error!("enable at least one backend feature: `sqlite`, `postgres` or `mssql`");

pub mod bulk;
pub mod command;
pub mod config;
pub mod connection;
pub mod decode;
mod entity;
pub mod error;
mod executor;
pub mod helper;
pub mod prelude;
pub mod results;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use bulk::{BulkCopyFlags, BulkCopyOptions};
pub use command::{SqlCommand, SqlParameter};
pub use config::ConnectionConfig;
pub use connection::{BackendConnection, ConnectionSource, ConnectionState, DbContext, LiveConnection};
pub use decode::FromScalar;
pub use error::SqlHelperError;
pub use helper::{
    bulk_insert_records, bulk_insert_table, execute_data_table, execute_dataset, execute_entity,
    execute_non_query, execute_scalar, execute_scalar_as,
};
pub use results::{DataRow, DataSet, DataTable};
pub use types::{CommandType, DatabaseType, RowValues};
