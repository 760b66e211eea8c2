//! Error conversion utilities for the CLI.
//!
//! Converts repack-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::Result;
use anyhow::anyhow;
use repack_core::ExtractionError;
use std::path::Path;

/// Converts `ExtractionError` to a user-friendly anyhow error with context.
pub fn convert_extraction_error(err: ExtractionError, archive: &Path) -> anyhow::Error {
    match err {
        ExtractionError::InvalidArchive(reason) => {
            anyhow!(
                "Invalid archive '{}': {}\n\
                 HINT: The archive may be corrupted, or not a gzip-compressed tar.",
                archive.display(),
                reason
            )
        }
        ExtractionError::Resolution { path, source } => {
            anyhow!(
                "Cannot assess safety of '{}' in '{}': {}\n\
                 HINT: Check filesystem permissions under the output directory.",
                path.display(),
                archive.display(),
                source
            )
        }
        ExtractionError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                archive.display(),
                io_err
            )
        }
    }
}

/// Adds archive context to a core result.
pub fn add_archive_context<T>(
    result: Result<T, ExtractionError>,
    archive: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_extraction_error(e, archive))
}
