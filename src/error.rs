//! Error types for ddlgen.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for ddlgen operations.
#[derive(Debug, Error)]
pub enum GenError {
    /// The leading keyword of a statement is not one the analyzer knows.
    #[error("Unknown statement kind '{keyword}': {statement}")]
    UnknownStatementKind { keyword: String, statement: String },

    /// A recognized statement does not have the expected shape.
    #[error("Invalid statement ({reason}): {statement}")]
    InvalidStatement { reason: String, statement: String },

    /// A field's SQL type has no entry in the type table.
    #[error("Unsupported SQL type '{sql_type}' for field '{field}'")]
    UnsupportedType { field: String, sql_type: String },

    /// Malformed template text.
    #[error("Template syntax error in '{name}': {message}")]
    TemplateSyntax { name: String, message: String },

    /// A template failed while rendering its data.
    #[error("Template render error in '{name}': {message}")]
    TemplateRender { name: String, message: String },

    /// A template name was registered twice.
    #[error("Template '{0}' is already registered")]
    DuplicateTemplate(String),

    /// The generated source failed the post-process step.
    #[error("Format error: {0}")]
    Format(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any error raised while processing one statement file.
    #[error("{}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: Box<GenError>,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenError {
    /// Create an invalid statement error.
    pub fn invalid(reason: impl Into<String>, statement: impl Into<String>) -> Self {
        Self::InvalidStatement {
            reason: reason.into(),
            statement: statement.into(),
        }
    }

    /// Create a template syntax error.
    pub fn syntax(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateSyntax {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a template render error.
    pub fn render(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateRender {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Attach the statement file path to an error.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::Source {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for ddlgen operations.
pub type GenResult<T> = Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GenError::invalid("expected KEY after PRIMARY", "PRIMARY FOO (id)");
        assert_eq!(
            err.to_string(),
            "Invalid statement (expected KEY after PRIMARY): PRIMARY FOO (id)"
        );
    }

    #[test]
    fn test_source_wraps_path() {
        let err = GenError::UnsupportedType {
            field: "score".to_string(),
            sql_type: "NUMERIC".to_string(),
        }
        .in_file("sql/user.sql");
        assert_eq!(
            err.to_string(),
            "sql/user.sql: Unsupported SQL type 'NUMERIC' for field 'score'"
        );
    }
}
