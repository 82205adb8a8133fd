//! Error conversion utilities for CLI.
//!
//! Converts jarpipe-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use jarpipe_core::PipelineError;
use std::path::Path;

/// Converts `PipelineError` to user-friendly anyhow error with context
pub fn convert_pipeline_error(err: PipelineError, target: &Path) -> anyhow::Error {
    match err {
        PipelineError::NullArgument { argument } => {
            anyhow!("Missing required input: {argument}")
        }
        PipelineError::InvalidArchiveFormat { path, reason } => {
            anyhow!(
                "Invalid archive '{}': {}\n\
                 HINT: The file must exist and be a ZIP-structured JAR.",
                path.display(),
                reason
            )
        }
        PipelineError::InsufficientInputs { provided } => {
            anyhow!(
                "Cannot merge {provided} archive(s)\n\
                 HINT: Pass at least two JAR files to merge."
            )
        }
        PipelineError::EntryDecodeFailure {
            archive,
            entry,
            source,
        } => {
            anyhow!(
                "Entry '{entry}' in '{archive}' could not be decoded: {source}\n\
                 HINT: The archive may be corrupted or truncated."
            )
        }
        PipelineError::OutputAssemblyFailure {
            file_name,
            entry,
            reason,
        } => {
            let entry = entry.map(|e| format!(" at entry '{e}'")).unwrap_or_default();
            anyhow!(
                "Failed to write '{}' ({file_name}){entry}: {reason}",
                target.display()
            )
        }
        PipelineError::ChangeFunctionFailure { entry, source } => {
            anyhow!("Transform failed on entry '{entry}': {source}")
        }
        PipelineError::DuplicateArchive { name } => {
            anyhow!(
                "Archive '{name}' was given more than once\n\
                 HINT: Archives are identified by file name; rename one of them."
            )
        }
        PipelineError::Io(io_err) => {
            anyhow!("I/O error while processing '{}': {}", target.display(), io_err)
        }
        PipelineError::WorkerPool(_) => anyhow::Error::from(err)
            .context("Could not start worker threads")
            .context("HINT: Try a smaller --threads value."),
    }
}

/// Adds archive context to a core result
pub fn add_archive_context<T>(
    result: Result<T, PipelineError>,
    target: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_pipeline_error(e, target))
}
