//! MySQL/MariaDB database driver.
//!
//! - [`MysqlDialect`]: catalog queries and DDL syntax
//! - [`MysqlConnection`]: one sqlx connection implementing `QueryExecutor`
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod connection;
mod dialect;

pub use connection::MysqlConnection;
pub use dialect::MysqlDialect;
