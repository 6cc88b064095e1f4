//! Microsoft SQL Server driver.
//!
//! - [`MssqlDialect`]: catalog queries and DDL syntax
//! - [`MssqlConnection`]: one Tiberius client implementing `QueryExecutor`

mod connection;
mod dialect;

pub use connection::MssqlConnection;
pub use dialect::MssqlDialect;
