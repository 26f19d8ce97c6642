// SQLite backend, built on rusqlite.
//
// - config: options for opening a database
// - connection: the connection handle and its blocking-pool bridge
// - params: conversion from `RowValues` to rusqlite values
// - query: statement execution and result extraction
// - executor: the async entry points the helpers call

pub mod config;
mod connection;
pub(crate) mod executor;
mod params;
mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteConnection;
