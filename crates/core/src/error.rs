//! Error types for the annotation engine

/// Errors surfaced by [`crate::Editor`] construction, image loading and import.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// The drawing surface handed to the editor has no usable area
    #[error("drawing surface has invalid size {width}x{height}")]
    InvalidSurface { width: f64, height: f64 },

    /// The decoded image reported unusable natural dimensions
    #[error("image has invalid natural size {width}x{height}")]
    InvalidImage { width: f64, height: f64 },

    /// Interchange data could not be parsed
    #[error("invalid annotation data: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for editor operations
pub type EditorResult<T> = Result<T, EditorError>;

/// Reason a single interchange record was rejected during import.
///
/// These are never propagated past the store: the record is logged and skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("unrecognized annotation kind `{0}`")]
    UnknownKind(String),

    #[error("{kind} record is missing `{field}`")]
    MissingField { kind: &'static str, field: &'static str },

    #[error("circle radius must be positive, got {0}")]
    NonPositiveRadius(f64),

    #[error("record contains a non-finite coordinate")]
    NonFinite,
}

/// Errors raised while loading [`crate::EditorConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value was out of range or failed to parse
    #[error("invalid configuration value for {0}")]
    InvalidValue(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
