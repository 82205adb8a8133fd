//! Output formatter trait for CLI results.

use anyhow::Result;
use jarpipe_core::Entry;
use jarpipe_core::Generation;
use jarpipe_core::MergeReport;
use jarpipe_core::ReadReport;
use jarpipe_core::TransformReport;
use serde::Serialize;
use std::path::Path;

/// Summary of a `repack` run
pub struct RepackSummary<'a> {
    pub output: &'a Path,
    pub read: &'a ReadReport,
    pub transform: &'a TransformReport,
    pub entries_written: usize,
    pub bytes_written: u64,
}

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the entries of a JAR
    fn format_listing(
        &self,
        name: &str,
        generation: &Generation,
        read: &ReadReport,
        long: bool,
        human_readable: bool,
    ) -> Result<()>;

    /// Format repack result
    fn format_repack_result(&self, summary: &RepackSummary<'_>) -> Result<()>;

    /// Format merge result
    fn format_merge_result(
        &self,
        output: &Path,
        report: &MergeReport,
        bytes_written: u64,
    ) -> Result<()>;

    /// Format a single found entry
    fn format_entry(&self, entry: &Entry, written_to: Option<&Path>) -> Result<()>;

    /// Format error message
    fn format_error(&self, error: &anyhow::Error);

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> JsonOutput<()> {
        JsonOutput {
            operation: operation.into(),
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}
