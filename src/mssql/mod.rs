// SQL Server backend, built on tiberius.
//
// - config: connection options and the client type
// - client: TCP connect, instance lookup and routing redirects
// - params: `ToSql` for `RowValues` and query binding
// - query: result-set streaming and value extraction
// - executor: the async entry points the helpers call

pub mod client;
pub mod config;
pub(crate) mod executor;
mod params;
mod query;

pub use client::connect;
pub use config::{MssqlClient, MssqlOptions, MssqlOptionsBuilder};
