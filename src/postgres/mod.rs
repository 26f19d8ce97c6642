// PostgreSQL backend, built on tokio-postgres.
//
// - connection: client plus the spawned connection task
// - params: `ToSql` for `RowValues`
// - query: result extraction and table building
// - executor: the async entry points the helpers call

mod connection;
pub(crate) mod executor;
mod params;
mod query;

pub use connection::PostgresConnection;
