//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::traits::{Dialect, ObjectFetchMode};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database the schema is read from.
    pub source: ConnectionConfig,

    /// Database scripts are generated for (and optionally executed on).
    pub target: ConnectionConfig,

    /// Script generation behavior.
    #[serde(default)]
    pub options: InterpreterOptions,

    /// Engine-specific rendering settings.
    #[serde(default)]
    pub settings: DialectSettings,
}

/// Connection parameters for one database.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database type: mysql, postgres or mssql (aliases accepted).
    pub r#type: String,

    /// Database host.
    pub host: String,

    /// Database port. Defaults to the engine's standard port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Schema to read or write. MySQL uses the database name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// SSL mode for MySQL/PostgreSQL (default: "prefer").
    #[serde(default = "default_prefer")]
    pub ssl_mode: String,

    /// Encrypt SQL Server connections (default: false).
    #[serde(default)]
    pub encrypt: bool,

    /// Trust the SQL Server certificate without validation (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .finish()
    }
}

impl ConnectionConfig {
    /// Configured port, or the engine's standard one.
    pub fn port(&self) -> u16 {
        if let Some(port) = self.port {
            return port;
        }
        match self.r#type.to_lowercase().as_str() {
            "mysql" | "mariadb" => 3306,
            "mssql" | "sqlserver" | "sql_server" => 1433,
            _ => 5432,
        }
    }

    /// Owner (schema) objects are read from or written to.
    ///
    /// An explicit `schema` wins; otherwise the dialect's default schema,
    /// falling back to the database name for engines without schemas.
    pub fn owner(&self, dialect: &dyn Dialect) -> String {
        match self.schema.as_deref().filter(|s| !s.is_empty()) {
            Some(schema) => schema.to_string(),
            None if !dialect.default_owner().is_empty() => dialect.default_owner().to_string(),
            None => self.database.clone(),
        }
    }

    /// `host:port/database`, for log lines.
    pub fn display_name(&self) -> String {
        format!("{}:{}/{}", self.host, self.port(), self.database)
    }
}

/// Script generation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterOptions {
    /// Render inline PRIMARY KEY clauses (default: true).
    #[serde(default = "default_true")]
    pub generate_primary_key: bool,

    /// Render FOREIGN KEY constraints (default: true).
    #[serde(default = "default_true")]
    pub generate_foreign_key: bool,

    /// Render stand-alone index statements (default: true).
    #[serde(default = "default_true")]
    pub generate_index: bool,

    /// Render identity clauses on identity columns (default: true).
    #[serde(default = "default_true")]
    pub generate_identity: bool,

    /// Render table and column comments (default: true).
    #[serde(default = "default_true")]
    pub generate_comment: bool,

    /// Guard routines, views and triggers so replay skips existing ones
    /// (default: false).
    #[serde(default)]
    pub not_create_if_exists: bool,

    /// Write generated scripts under `output_folder` (default: false).
    #[serde(default)]
    pub write_to_file: bool,

    /// Return generated scripts as text (default: true).
    #[serde(default = "default_true")]
    pub return_as_text: bool,

    /// Skip objects with inconsistent or missing metadata instead of
    /// aborting (default: false).
    #[serde(default)]
    pub skip_object_error: bool,

    /// Keep executing after a statement fails (default: false).
    #[serde(default)]
    pub skip_script_error: bool,

    /// How much catalog detail to fetch (default: details).
    #[serde(default)]
    pub fetch_mode: ObjectFetchMode,

    /// Rows per page when reading table data (default: 500).
    #[serde(default = "default_data_batch_size")]
    pub data_batch_size: u64,

    /// Render binary values as NULL in data scripts (default: false).
    #[serde(default)]
    pub treat_bytes_as_null: bool,

    /// List system databases too (default: false).
    #[serde(default)]
    pub show_builtin_databases: bool,

    /// Owner written into generated scripts instead of the source owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_owner: Option<String>,

    /// Directory generated script files are written to (default: "output").
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,

    /// Wrap data transfer in one target transaction (default: true).
    #[serde(default = "default_true")]
    pub use_transaction: bool,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            generate_primary_key: true,
            generate_foreign_key: true,
            generate_index: true,
            generate_identity: true,
            generate_comment: true,
            not_create_if_exists: false,
            write_to_file: false,
            return_as_text: true,
            skip_object_error: false,
            skip_script_error: false,
            fetch_mode: ObjectFetchMode::Details,
            data_batch_size: default_data_batch_size(),
            treat_bytes_as_null: false,
            show_builtin_databases: false,
            target_owner: None,
            output_folder: default_output_folder(),
            use_transaction: true,
        }
    }
}

/// Engine-specific rendering settings handed to dialect constructors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialectSettings {
    /// Character set appended to MySQL character columns.
    #[serde(default = "default_mysql_charset")]
    pub mysql_charset: Option<String>,

    /// Collation appended to MySQL character columns.
    #[serde(default = "default_mysql_collation")]
    pub mysql_collation: Option<String>,

    /// Page with ROW_NUMBER() instead of OFFSET/FETCH (SQL Server 2008).
    #[serde(default)]
    pub mssql_legacy_pagination: bool,
}

impl Default for DialectSettings {
    fn default() -> Self {
        Self {
            mysql_charset: default_mysql_charset(),
            mysql_collation: default_mysql_collation(),
            mssql_legacy_pagination: false,
        }
    }
}

// Default value functions for serde
fn default_prefer() -> String {
    "prefer".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_batch_size() -> u64 {
    500
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("output")
}

fn default_mysql_charset() -> Option<String> {
    Some("utf8mb4".to_string())
}

fn default_mysql_collation() -> Option<String> {
    Some("utf8mb4_general_ci".to_string())
}
