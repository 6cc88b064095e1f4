//! Helpers shared across database drivers.
//!
//! - [`SslMode`]: `ssl_mode` setting for the sqlx-backed connections
//! - catalog query fragments (name filters, definition guards)

use sqlx::mysql::MySqlSslMode;
use sqlx::postgres::PgSslMode;

use crate::core::identifier::in_list;
use crate::error::{InterpretError, Result};

/// SSL verification modes for MySQL and PostgreSQL connections.
///
/// Values match PostgreSQL's standard `sslmode` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// No SSL/TLS (plain TCP connection).
    Disable,
    /// Use SSL when the server offers it.
    #[default]
    Prefer,
    /// Use SSL but don't verify server certificate.
    Require,
    /// Verify server certificate against CA but not hostname.
    VerifyCa,
    /// Full certificate and hostname verification.
    VerifyFull,
}

impl SslMode {
    /// Parse an SSL mode from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "disable" | "disabled" => Ok(SslMode::Disable),
            "prefer" | "preferred" | "" => Ok(SslMode::Prefer),
            "require" | "required" => Ok(SslMode::Require),
            "verify-ca" | "verify_ca" => Ok(SslMode::VerifyCa),
            "verify-full" | "verify_identity" => Ok(SslMode::VerifyFull),
            other => Err(InterpretError::Config(format!(
                "Invalid ssl_mode '{}'. Valid values: disable, prefer, require, verify-ca, verify-full",
                other
            ))),
        }
    }

    pub fn to_mysql(self) -> MySqlSslMode {
        match self {
            SslMode::Disable => MySqlSslMode::Disabled,
            SslMode::Prefer => MySqlSslMode::Preferred,
            SslMode::Require => MySqlSslMode::Required,
            SslMode::VerifyCa => MySqlSslMode::VerifyCa,
            SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
        }
    }

    pub fn to_postgres(self) -> PgSslMode {
        match self {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
            SslMode::VerifyCa => PgSslMode::VerifyCa,
            SslMode::VerifyFull => PgSslMode::VerifyFull,
        }
    }
}

/// ` AND column IN (...)`, or nothing when `names` is empty.
pub(crate) fn and_in(column: &str, names: &[String]) -> String {
    if names.is_empty() {
        String::new()
    } else {
        format!(" AND {} IN ({})", column, in_list(names))
    }
}

/// Insert ` IF NOT EXISTS` after the object keyword of a CREATE statement.
///
/// Definitions that already carry the clause, or whose keyword cannot be
/// found, are returned unchanged.
pub(crate) fn insert_if_not_exists(definition: &str, keyword: &str) -> String {
    let lower = definition.to_lowercase();
    if lower.contains("if not exists") {
        return definition.to_string();
    }
    let Some(create_at) = lower.find("create") else {
        return definition.to_string();
    };
    let keyword_lower = keyword.to_lowercase();
    match lower[create_at..].find(&keyword_lower) {
        Some(offset) => {
            let split = create_at + offset + keyword_lower.len();
            format!("{} IF NOT EXISTS{}", &definition[..split], &definition[split..])
        }
        None => definition.to_string(),
    }
}

/// Turn a leading `CREATE` into `CREATE OR REPLACE`.
pub(crate) fn create_or_replace(definition: &str) -> String {
    let trimmed = definition.trim_start();
    let lower = trimmed.to_lowercase();
    if lower.starts_with("create or replace") || !lower.starts_with("create") {
        return definition.to_string();
    }
    format!("CREATE OR REPLACE{}", &trimmed["create".len()..])
}
