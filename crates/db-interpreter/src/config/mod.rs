//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::ObjectFetchMode;

    const MINIMAL: &str = r#"
source:
  type: mysql
  host: localhost
  database: shop
  user: root
target:
  type: postgres
  host: localhost
  database: shop_copy
  user: postgres
"#;

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.source.port(), 3306);
        assert_eq!(config.target.port(), 5432);
        assert!(config.options.generate_primary_key);
        assert!(config.options.return_as_text);
        assert!(!config.options.write_to_file);
        assert_eq!(config.options.fetch_mode, ObjectFetchMode::Details);
        assert_eq!(config.options.data_batch_size, 500);
        assert_eq!(config.settings.mysql_charset.as_deref(), Some("utf8mb4"));
    }

    #[test]
    fn test_from_yaml_reads_options() {
        let yaml = format!(
            "{}options:\n  generate_index: false\n  fetch_mode: simple\n  target_owner: sales\nsettings:\n  mssql_legacy_pagination: true\n",
            MINIMAL
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert!(!config.options.generate_index);
        assert_eq!(config.options.fetch_mode, ObjectFetchMode::Simple);
        assert_eq!(config.options.target_owner.as_deref(), Some("sales"));
        assert!(config.settings.mssql_legacy_pagination);
    }

    #[test]
    fn test_from_yaml_rejects_missing_target() {
        let yaml = "source:\n  type: mysql\n  host: h\n  database: d\n  user: u\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, crate::error::InterpretError::Io(_)));
    }
}
