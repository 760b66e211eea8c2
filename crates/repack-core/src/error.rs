//! Error types for extraction and repack operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Errors that can occur while filtering or extracting an archive.
///
/// Blocked members are deliberately *not* errors: a member whose path or link
/// target escapes the base directory is recorded as a
/// [`Classification`](crate::filter::Classification), reported, and skipped
/// while the pass continues. This enum covers the failures that abort the
/// pass instead, because safety can no longer be assessed or a safe member
/// could not be written.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive is corrupted or not a gzip-compressed tar stream.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// A filesystem query needed to canonicalize a path failed for a reason
    /// other than the path not existing yet (e.g. permission denied).
    ///
    /// Fatal by design: without a resolved path the containment check cannot
    /// run, and an unresolvable member must never be treated as safe.
    #[error("failed to resolve {path}: {source}")]
    Resolution {
        /// The path that could not be resolved.
        path: PathBuf,
        /// The underlying filesystem error.
        source: std::io::Error,
    },
}

impl ExtractionError {
    /// Returns `true` if this error means safety could not be determined,
    /// as opposed to a plain read/write failure.
    #[must_use]
    pub const fn is_resolution_failure(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }
}
