//! Unified error types for the topoc workspace.
//!
//! Only fatal conditions live here. Lookups that fail during resolution are
//! recorded as [`crate::warning::ResolutionWarning`] instead.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum TopocError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The topology document is missing a required section or has duplicates.
    #[error("schema error: {message}")]
    Schema {
        /// Description of the structural problem.
        message: String,
    },

    /// A YAML document could not be parsed or mapped onto the model.
    #[error("YAML error: {source}")]
    Parse {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A manifest template is missing an expected document or field.
    #[error("template {name}: {message}")]
    Template {
        /// Template file name.
        name: String,
        /// Description of the problem.
        message: String,
    },

    /// JSON serialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// Publishing to the external settings store failed.
    #[error("failed to publish settings: {message}")]
    Publish {
        /// Description of the failure.
        message: String,
    },
}

impl TopocError {
    /// Builds an [`TopocError::Io`] for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a [`TopocError::Schema`] from a message.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Builds a [`TopocError::Template`] for the named template.
    pub fn template(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TopocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_display_includes_message() {
        let err = TopocError::schema("no EnvironmentDetails section");
        assert_eq!(
            err.to_string(),
            "schema error: no EnvironmentDetails section"
        );
    }

    #[test]
    fn io_error_display_includes_path() {
        let err = TopocError::io(
            "/tmp/out",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out"), "got: {msg}");
        assert!(msg.contains("denied"), "got: {msg}");
    }

    #[test]
    fn yaml_error_converts_via_from() {
        let yaml_err = serde_yaml::from_str::<u32>("not: [a number").unwrap_err();
        let err: TopocError = yaml_err.into();
        assert!(matches!(err, TopocError::Parse { .. }));
    }
}
