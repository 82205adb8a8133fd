//! Error types for archive pipeline operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `PipelineError`.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Boxed error returned by caller-supplied change functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while reading, transforming, merging or assembling
/// archives.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required input was not supplied.
    #[error("required argument missing: {argument}")]
    NullArgument {
        /// Name of the missing argument.
        argument: &'static str,
    },

    /// The path does not denote a readable ZIP-structured archive.
    #[error("invalid archive {}: {reason}", path.display())]
    InvalidArchiveFormat {
        /// The offending path (or archive name).
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// A merge was requested with too few source archives.
    #[error("merging requires more than one source archive, got {provided}")]
    InsufficientInputs {
        /// Number of archives supplied.
        provided: usize,
    },

    /// A single entry could not be decoded. Non-fatal during ingestion: the
    /// entry is dropped and the failure is recorded in the read report.
    #[error("failed to decode entry '{entry}' in {archive}: {source}")]
    EntryDecodeFailure {
        /// Name of the archive being read.
        archive: String,
        /// Name of the entry that failed.
        entry: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Serializing an output archive failed. No partial output is returned.
    #[error("failed to assemble {file_name}{}: {reason}", entry_suffix(entry.as_deref()))]
    OutputAssemblyFailure {
        /// Name of the archive being assembled.
        file_name: String,
        /// Entry being written when the failure happened, if any.
        entry: Option<String>,
        /// Underlying cause.
        reason: String,
    },

    /// A caller-supplied change function failed.
    #[error("change function failed on entry '{entry}': {source}")]
    ChangeFunctionFailure {
        /// Entry the change function was applied to.
        entry: String,
        /// Error raised by the change function.
        #[source]
        source: BoxError,
    },

    /// An archive with the same name is already registered.
    #[error("archive already registered: {name}")]
    DuplicateArchive {
        /// The registry name that collided.
        name: String,
    },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

fn entry_suffix(entry: Option<&str>) -> String {
    entry.map(|e| format!(" (entry '{e}')")).unwrap_or_default()
}

impl PipelineError {
    /// Returns `true` if this error aborts the operation that raised it.
    ///
    /// Entry decode failures and duplicate registrations are recovered
    /// locally: the entry or archive is skipped and the failure is reported.
    ///
    /// # Examples
    ///
    /// ```
    /// use jarpipe_core::PipelineError;
    ///
    /// let err = PipelineError::InsufficientInputs { provided: 1 };
    /// assert!(err.is_fatal());
    ///
    /// let err = PipelineError::DuplicateArchive { name: "a.jar".into() };
    /// assert!(!err.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::EntryDecodeFailure { .. } | Self::DuplicateArchive { .. }
        )
    }

    /// Returns the entry name this error refers to, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use jarpipe_core::PipelineError;
    ///
    /// let err = PipelineError::ChangeFunctionFailure {
    ///     entry: "a/B.class".into(),
    ///     source: "boom".into(),
    /// };
    /// assert_eq!(err.entry_name(), Some("a/B.class"));
    ///
    /// let err = PipelineError::InsufficientInputs { provided: 0 };
    /// assert_eq!(err.entry_name(), None);
    /// ```
    #[must_use]
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Self::EntryDecodeFailure { entry, .. } | Self::ChangeFunctionFailure { entry, .. } => {
                Some(entry)
            }
            Self::OutputAssemblyFailure { entry, .. } => entry.as_deref(),
            _ => None,
        }
    }

    /// Returns a context string for this error, if available.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::InvalidArchiveFormat { reason, .. }
            | Self::OutputAssemblyFailure { reason, .. } => Some(reason),
            Self::WorkerPool(msg) => Some(msg),
            _ => None,
        }
    }

    pub(crate) fn invalid_archive(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidArchiveFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::NullArgument { argument: "path" };
        assert_eq!(err.to_string(), "required argument missing: path");

        let err = PipelineError::InsufficientInputs { provided: 1 };
        assert!(err.to_string().contains("more than one"));
        assert!(err.to_string().contains('1'));
    }

    #[test]
    fn test_invalid_archive_carries_path_and_cause() {
        let err = PipelineError::invalid_archive("libs/broken.jar", "invalid Zip archive");
        let display = err.to_string();
        assert!(display.contains("libs/broken.jar"));
        assert!(display.contains("invalid Zip archive"));
        assert_eq!(err.context(), Some("invalid Zip archive"));
    }

    #[test]
    fn test_output_assembly_failure_display() {
        let err = PipelineError::OutputAssemblyFailure {
            file_name: "out.jar".into(),
            entry: Some("a/B.class".into()),
            reason: "disk full".into(),
        };
        let display = err.to_string();
        assert!(display.contains("out.jar"));
        assert!(display.contains("a/B.class"));
        assert!(display.contains("disk full"));

        let err = PipelineError::OutputAssemblyFailure {
            file_name: "out.jar".into(),
            entry: None,
            reason: "bad level".into(),
        };
        assert!(!err.to_string().contains("entry"));
        assert_eq!(err.entry_name(), None);
    }

    #[test]
    fn test_is_fatal() {
        let decode = PipelineError::EntryDecodeFailure {
            archive: "a.jar".into(),
            entry: "x.txt".into(),
            source: std::io::Error::other("crc mismatch"),
        };
        assert!(!decode.is_fatal());
        assert_eq!(decode.entry_name(), Some("x.txt"));

        assert!(PipelineError::NullArgument { argument: "path" }.is_fatal());
        assert!(PipelineError::WorkerPool("no threads".into()).is_fatal());
    }

    #[test]
    fn test_change_failure_source_chain() {
        use std::error::Error;

        let err = PipelineError::ChangeFunctionFailure {
            entry: "a/B.class".into(),
            source: "rewrite failed".into(),
        };
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("rewrite failed"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
