//! Error types for image-metrics operations.

use thiserror::Error;

use crate::tensor::Shape;

/// Result type alias for image-metrics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while comparing image tensors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The generated and target tensors have different shapes.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Shape of the first (generated) tensor.
        expected: Shape,
        /// Shape of the second (target) tensor.
        actual: Shape,
    },

    /// The tensor is empty, has an inconsistent length or holds non-finite values.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A pixel value lies outside the accepted input range.
    ///
    /// Only produced under [`RangePolicy::Reject`](crate::range::RangePolicy::Reject).
    #[error("Value {value} at index {index} is outside [{min}, {max}]")]
    InvalidRange {
        /// Flat index of the offending element.
        index: usize,
        /// The offending value.
        value: f32,
        /// Lower bound of the accepted range.
        min: f32,
        /// Upper bound of the accepted range.
        max: f32,
    },

    /// A configuration parameter is out of its allowed domain.
    #[error("Invalid configuration: {parameter}: {reason}")]
    InvalidConfig {
        /// Name of the parameter.
        parameter: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A wrapped metric backend failed.
    #[error("Metric calculation failed: {metric}: {reason}")]
    MetricCalculation {
        /// Name of the metric that failed.
        metric: String,
        /// Reason for the failure.
        reason: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            parameter,
            reason: reason.into(),
        }
    }
}
