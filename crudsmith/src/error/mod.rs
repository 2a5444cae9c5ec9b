//! Error types and error handling
//!
//! Generation itself never fails: malformed metadata falls back to defaults.
//! These errors belong to the input layer only (parsing field specs, loading
//! metadata documents and configuration, resolving target names).

use thiserror::Error;

/// Crate result alias
pub type Result<T> = std::result::Result<T, CrudsmithError>;

/// Framework error type
#[derive(Debug, Error)]
pub enum CrudsmithError {
    /// A compact field spec (`name:type[:modifiers]`) could not be parsed
    #[error("Invalid field spec '{spec}': {reason}")]
    FieldSpec {
        /// The offending spec string
        spec: String,
        /// Why it was rejected
        reason: String,
    },

    /// Metadata document could not be decoded
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// JSON metadata document error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML metadata document error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// No emission target registered under this name
    #[error("Unknown emission target '{name}'. Available targets: {available}")]
    UnknownTarget {
        /// Requested target name
        name: String,
        /// Comma-separated registered names
        available: String,
    },

    /// I/O error while reading an input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CrudsmithError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CrudsmithError {
    /// Build a field spec error
    pub fn field_spec(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FieldSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}
