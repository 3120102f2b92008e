//! Error types for coverage generation.

use thiserror::Error;

/// Coverage engine errors.
///
/// Only conditions that make the result meaningless are errors. Dropped clip
/// results, skipped mandatory checks, and uncoverable universes are reported
/// through [`CoverSolution`](crate::CoverSolution) and
/// [`CoverageStats`](crate::CoverageStats) instead.
#[derive(Error, Debug)]
pub enum CoverageError {
    /// WKT parsing error.
    #[error("WKT parse error: {0}")]
    WktParse(String),

    /// Geometry the engine cannot operate on (non-finite coordinates,
    /// non-polygonal query region). Geometric operations are deterministic,
    /// so this is never retried.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A candidate has no usable value for the identifier attribute.
    #[error("Feature '{feature}' has no usable '{attribute}' attribute")]
    MissingIdAttribute { feature: String, attribute: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Feature source error.
    #[error("Feature source error: {0}")]
    Source(String),
}

/// Result type for coverage operations.
pub type Result<T> = std::result::Result<T, CoverageError>;
