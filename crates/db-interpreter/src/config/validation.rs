//! Configuration validation.

use super::{Config, ConnectionConfig};
use crate::core::identifier::validate_identifier;
use crate::drivers::DialectImpl;
use crate::error::{InterpretError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_connection("source", &config.source)?;
    validate_connection("target", &config.target)?;

    // Cannot convert a database into itself
    if config.source.host == config.target.host
        && config.source.port() == config.target.port()
        && config.source.database == config.target.database
        && config.source.schema == config.target.schema
    {
        return Err(InterpretError::Config(
            "source and target cannot be the same database".into(),
        ));
    }

    if config.options.data_batch_size == 0 {
        return Err(InterpretError::Config(
            "options.data_batch_size must be at least 1".into(),
        ));
    }

    if let Some(owner) = &config.options.target_owner {
        validate_identifier(owner)?;
    }

    Ok(())
}

fn validate_connection(section: &str, conn: &ConnectionConfig) -> Result<()> {
    if conn.host.is_empty() {
        return Err(InterpretError::Config(format!("{}.host is required", section)));
    }
    if conn.database.is_empty() {
        return Err(InterpretError::Config(format!(
            "{}.database is required",
            section
        )));
    }
    if conn.user.is_empty() {
        return Err(InterpretError::Config(format!("{}.user is required", section)));
    }

    DialectImpl::from_db_type(&conn.r#type).map_err(|_| {
        InterpretError::Config(format!(
            "{}.type must be one of mysql, postgres, mssql; got '{}'",
            section, conn.r#type
        ))
    })?;

    if let Some(schema) = &conn.schema {
        validate_identifier(schema)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DialectSettings, InterpreterOptions};

    fn valid_config() -> Config {
        Config {
            source: ConnectionConfig {
                r#type: "mysql".to_string(),
                host: "localhost".to_string(),
                port: Some(3306),
                database: "shop".to_string(),
                user: "root".to_string(),
                password: "password".to_string(),
                schema: None,
                ssl_mode: "disable".to_string(),
                encrypt: false,
                trust_server_cert: false,
            },
            target: ConnectionConfig {
                r#type: "mssql".to_string(),
                host: "localhost".to_string(),
                port: Some(1433),
                database: "shop".to_string(),
                user: "sa".to_string(),
                password: "password".to_string(),
                schema: Some("dbo".to_string()),
                ssl_mode: "prefer".to_string(),
                encrypt: false,
                trust_server_cert: true,
            },
            options: InterpreterOptions::default(),
            settings: DialectSettings::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_source_host() {
        let mut config = valid_config();
        config.source.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_target_user() {
        let mut config = valid_config();
        config.target.user = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_source_type() {
        let mut config = valid_config();
        config.source.r#type = "oracle".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("source.type"));
    }

    #[test]
    fn test_type_aliases_accepted() {
        let mut config = valid_config();
        config.source.r#type = "MariaDB".to_string();
        config.target.r#type = "sqlserver".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_same_database_rejected() {
        let mut config = valid_config();
        config.target = config.source.clone();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = valid_config();
        config.options.data_batch_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_connection_debug_redacts_password() {
        let mut config = valid_config();
        config.source.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.source);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }

    #[test]
    fn test_default_ports() {
        let mut config = valid_config();
        config.source.port = None;
        config.target.port = None;
        assert_eq!(config.source.port(), 3306);
        assert_eq!(config.target.port(), 1433);
    }
}
