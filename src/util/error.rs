//! Error types for misreg.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for misreg operations.
pub type Result<T> = std::result::Result<T, MisregError>;

/// Errors that can occur while measuring band misregistration.
///
/// Every variant stores owned, comparable context so that a failure can be
/// recorded in the report after the mosaic that produced it is gone.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MisregError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The requested capability was compiled out.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    /// An external toolkit program could not be run or reported failure.
    #[error("`{program}` failed: {reason}")]
    Toolkit { program: String, reason: String },
    /// The label text does not follow the key-value block grammar.
    #[error("label parse error at line {line}: {reason}")]
    MetadataParse { line: usize, reason: String },
    /// The label is well formed but lacks a required key.
    #[error("label has no `{key}` entry")]
    MissingMetadata { key: String },
    /// Splitting a mosaic into single-band files failed.
    #[error("band split of {mosaic} failed: {reason}", mosaic = .mosaic.display())]
    Explode { mosaic: PathBuf, reason: String },
    /// The template-matching invocation failed.
    #[error("registration failed: {reason}")]
    Registration { reason: String },
    /// The registration results table could not be read.
    #[error("malformed registration results at line {line}: {reason}")]
    MalformedResults { line: usize, reason: String },
    /// No defined values exist to derive a display range from.
    #[error("matrix has no defined values")]
    EmptyMatrix,
    /// Grid or image dimensions are unusable.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Filesystem failure.
    #[error("{context}: {reason}")]
    Io { context: String, reason: String },
    /// Image encoding failure.
    #[error("image io: {reason}")]
    ImageIo { reason: String },
    /// Report reading or writing failure.
    #[error("report: {reason}")]
    Report { reason: String },
}

impl MisregError {
    /// Wraps an I/O error with a short description of the failed operation.
    pub fn io(context: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            reason: err.to_string(),
        }
    }

    /// Returns true for failures of the template-matching step.
    pub fn is_registration_failure(&self) -> bool {
        matches!(
            self,
            Self::Registration { .. } | Self::MalformedResults { .. }
        )
    }
}

impl From<csv::Error> for MisregError {
    fn from(err: csv::Error) -> Self {
        Self::Report {
            reason: err.to_string(),
        }
    }
}
