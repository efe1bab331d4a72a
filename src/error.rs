use crate::value::{FieldKind, Value};

/// Error types for sqlx-named-map
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error while compiling the named-token pattern
    #[error("Failed to parse SQL template: {0}")]
    Parse(#[from] regex::Error),

    /// Error from SQLx database operations (prepare, execute, fetch, decode)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Number of token occurrences differs from the argument's field or key count
    #[error("Template references {tokens} placeholder(s) but the argument has {fields} field(s)")]
    TemplateArgumentMismatch { tokens: usize, fields: usize },

    /// Argument source is not a record or a keyed mapping
    #[error("Unsupported argument shape: {0}")]
    UnsupportedArgumentShape(&'static str),

    /// Placeholder was referenced but the argument has no field or key of that name
    #[error("Placeholder '{0}' was not bound by the argument")]
    UnboundPlaceholder(String),

    /// Destination cannot hold the result set (e.g. scalar with column count != 1)
    #[error("Destination shape error: {0}")]
    DestinationShape(String),

    /// Destination field missing, or incompatible with the coerced value
    #[error("Cannot bind field '{field}': {reason}")]
    FieldBinding { field: String, reason: String },

    /// Temporal field without a format, or text that does not parse with it
    #[error("Cannot parse temporal field '{field}': {reason}")]
    TemporalFormat { field: String, reason: String },

    /// A driver value could not be represented as a raw `Value`
    #[error("Cannot scan column '{column}': {reason}")]
    Scan { column: String, reason: String },

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn field_mismatch(field: &str, expected: FieldKind, found: &Value) -> Self {
        Error::FieldBinding {
            field: field.to_owned(),
            reason: format!("expected {expected}, found {}", found.type_name()),
        }
    }
}

/// Result type alias for sqlx-named-map operations
pub type Result<T> = std::result::Result<T, Error>;
