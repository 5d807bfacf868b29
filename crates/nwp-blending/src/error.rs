//! Error types for cascade storage and blending.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while storing, loading, or blending cascades.
#[derive(Error, Debug)]
pub enum BlendingError {
    /// The decomposition capability rejected a field.
    #[error("decomposition failed: {0}")]
    Decomposition(String),

    /// The motion capability failed for a window of fields.
    #[error("motion estimation failed: {0}")]
    MotionEstimation(String),

    /// The recomposition capability rejected the levels.
    #[error("recomposition failed: {0}")]
    Recomposition(String),

    /// Level count, source count, or grid dimensions disagree.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// No stored record has exactly the requested valid time.
    #[error("no stored record is valid at {requested}")]
    TimeNotFound { requested: DateTime<Utc> },

    /// The requested window runs past the last stored record.
    #[error(
        "window of {requested} records starting at index {start_index} exceeds the {available} stored records"
    )]
    InsufficientHorizon {
        start_index: usize,
        requested: usize,
        available: usize,
    },

    /// Artifact read or write failure.
    #[error("artifact I/O error: {0}")]
    Io(String),

    /// Artifact attributes do not match the expected schema.
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Caller supplied inputs that can never be stored.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BlendingError {
    /// Create a Decomposition error.
    pub fn decomposition(msg: impl Into<String>) -> Self {
        Self::Decomposition(msg.into())
    }

    /// Create a MotionEstimation error.
    pub fn motion_estimation(msg: impl Into<String>) -> Self {
        Self::MotionEstimation(msg.into())
    }

    /// Create a Recomposition error.
    pub fn recomposition(msg: impl Into<String>) -> Self {
        Self::Recomposition(msg.into())
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Create an Io error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Create an InvalidArtifact error.
    pub fn invalid_artifact(msg: impl Into<String>) -> Self {
        Self::InvalidArtifact(msg.into())
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True when a stored run simply cannot serve the requested issue time.
    ///
    /// Callers treat these as routine: try another run or fall back to the
    /// nowcast alone.
    pub fn is_unservable(&self) -> bool {
        matches!(
            self,
            Self::TimeNotFound { .. } | Self::InsufficientHorizon { .. }
        )
    }
}

impl From<std::io::Error> for BlendingError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BlendingError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArtifact(err.to_string())
    }
}

impl From<ndarray::ShapeError> for BlendingError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::ShapeMismatch(err.to_string())
    }
}

/// Result type for blending operations.
pub type Result<T> = std::result::Result<T, BlendingError>;
