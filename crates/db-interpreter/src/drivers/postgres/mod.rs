//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: catalog queries and DDL syntax
//! - [`PostgresConnection`]: one sqlx connection implementing `QueryExecutor`

mod connection;
mod dialect;

pub use connection::PostgresConnection;
pub use dialect::PostgresDialect;
