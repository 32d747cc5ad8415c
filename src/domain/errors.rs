use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised while building the service state.
///
/// Any of these stops the process before the listener is bound.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Feature manifest not found at {path:?}")]
    ManifestNotFound { path: PathBuf },

    #[error("Feature manifest at {path:?} is invalid: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Feature listing is empty: cannot determine feature shape")]
    EmptyFeatureSpec,

    #[error("Duplicate feature column: {name}")]
    DuplicateFeature { name: String },

    #[error("Unsupported dtype '{dtype}' for column {name}")]
    UnsupportedDtype { name: String, dtype: String },

    #[error("Model artifact not found at {path:?}")]
    ModelNotFound { path: PathBuf },

    #[error("Model artifact at {path:?} is unreadable or corrupt: {reason}")]
    ModelCorrupt { path: PathBuf, reason: String },

    #[error("Model/manifest contract mismatch: {reason}")]
    FeatureContractMismatch { reason: String },
}

/// What went wrong with a single request field
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    Missing,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    NotFinite,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Missing => write!(f, "field required"),
            ViolationKind::WrongType { expected, found } => {
                write!(f, "expected {}, got {}", expected, found)
            }
            ViolationKind::NotFinite => write!(f, "value must be finite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub field: String,
    pub kind: ViolationKind,
}

/// Per-request validation failure. Never touches shared state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Request body must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    #[error("Invalid fields: {}", format_fields(.0))]
    Fields(Vec<FieldViolation>),
}

fn format_fields(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{} ({})", v.field, v.kind))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    /// Field names in the order they were reported
    pub fn fields(&self) -> Vec<&str> {
        match self {
            ValidationError::NotAnObject { .. } => Vec::new(),
            ValidationError::Fields(v) => v.iter().map(|v| v.field.as_str()).collect(),
        }
    }
}

/// Runtime failure inside a model backend
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Model returned no prediction")]
    EmptyOutput,

    #[error("Model backend failure: {0}")]
    Backend(String),
}

/// Per-request error taxonomy surfaced by the prediction service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Model is not loaded")]
    NotReady,

    #[error(transparent)]
    Model(#[from] PredictError),
}
