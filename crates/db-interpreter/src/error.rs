//! Error types for the interpreter library.

use thiserror::Error;

/// Process exit codes used by the CLI.
pub const EXIT_CONFIG_ERROR: u8 = 1;
pub const EXIT_CONNECTION_ERROR: u8 = 2;
pub const EXIT_SCRIPT_ERROR: u8 = 3;
pub const EXIT_EXECUTION_ERROR: u8 = 4;
pub const EXIT_CANCELLED: u8 = 5;
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for interpreter operations.
#[derive(Error, Debug)]
pub enum InterpretError {
    /// Configuration error (invalid YAML, missing fields, bad options).
    #[error("Configuration error: {0}")]
    Config(String),

    /// MySQL/PostgreSQL driver error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// SQL Server driver error.
    #[error("SQL Server error: {0}")]
    Mssql(#[from] tiberius::error::Error),

    /// Connection could not be opened, with context.
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// A catalog row could not be mapped into the schema model.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Definition text was requested for an object fetched without it.
    #[error("Definition unavailable for {kind} {name}: fetch it in details mode")]
    DefinitionUnavailable { kind: String, name: String },

    /// Metadata is internally inconsistent and no script can be rendered.
    #[error("Script generation failed for {object}: {message}")]
    ScriptGeneration { object: String, message: String },

    /// The target rejected a generated statement.
    #[error("Execution failed: {message}\n  Statement: {statement}")]
    Execution { statement: String, message: String },

    /// IO error (script files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operation was cancelled (SIGINT, caller token).
    #[error("Operation cancelled")]
    Cancelled,
}

impl InterpretError {
    /// Create a Connection error with context about where it occurred.
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        InterpretError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a DefinitionUnavailable error.
    pub fn definition_unavailable(kind: impl ToString, name: impl Into<String>) -> Self {
        InterpretError::DefinitionUnavailable {
            kind: kind.to_string(),
            name: name.into(),
        }
    }

    /// Create a ScriptGeneration error.
    pub fn script_generation(object: impl Into<String>, message: impl Into<String>) -> Self {
        InterpretError::ScriptGeneration {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Create an Execution error carrying the rejected statement verbatim.
    pub fn execution(statement: impl Into<String>, message: impl ToString) -> Self {
        InterpretError::Execution {
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    /// Whether `skip_object_error` may downgrade this error to a skipped object.
    pub fn is_object_error(&self) -> bool {
        matches!(
            self,
            InterpretError::DefinitionUnavailable { .. } | InterpretError::ScriptGeneration { .. }
        )
    }

    /// Map the error to a process exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            InterpretError::Config(_) | InterpretError::Yaml(_) | InterpretError::Json(_) => {
                EXIT_CONFIG_ERROR
            }
            InterpretError::Database(_)
            | InterpretError::Mssql(_)
            | InterpretError::Connection { .. }
            | InterpretError::Catalog(_) => EXIT_CONNECTION_ERROR,
            InterpretError::DefinitionUnavailable { .. }
            | InterpretError::ScriptGeneration { .. } => EXIT_SCRIPT_ERROR,
            InterpretError::Execution { .. } => EXIT_EXECUTION_ERROR,
            InterpretError::Cancelled => EXIT_CANCELLED,
            InterpretError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for interpreter operations.
pub type Result<T> = std::result::Result<T, InterpretError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_surfaces_statement() {
        let err = InterpretError::execution("CREATE TABLE `t` (`a` int)", "syntax error");
        let text = err.to_string();
        assert!(text.contains("syntax error"));
        assert!(text.contains("CREATE TABLE `t` (`a` int)"));
        assert_eq!(err.exit_code(), EXIT_EXECUTION_ERROR);
    }

    #[test]
    fn test_object_errors_are_skippable() {
        assert!(InterpretError::definition_unavailable("View", "v_orders").is_object_error());
        assert!(InterpretError::script_generation("orders", "bad column").is_object_error());
        assert!(!InterpretError::Cancelled.is_object_error());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(InterpretError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(InterpretError::from(io).exit_code(), EXIT_IO_ERROR);
        assert_eq!(InterpretError::Cancelled.exit_code(), EXIT_CANCELLED);
    }

    #[test]
    fn test_format_detailed_includes_message() {
        let err = InterpretError::connection("refused", "opening MySQL connection");
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: Connection error: refused"));
        assert!(detailed.contains("opening MySQL connection"));
    }
}
