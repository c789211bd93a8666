//! Database module
//!
//! SQLite connection pool and schema migrations for users and submitted responses.

pub mod connection;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
