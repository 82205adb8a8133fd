//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use super::formatter::RepackSummary;
use anyhow::Result;
use jarpipe_core::Entry;
use jarpipe_core::Generation;
use jarpipe_core::MergeReport;
use jarpipe_core::ReadReport;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct EntryInfo<'a> {
    name: &'a str,
    kind: &'static str,
    size: usize,
}

impl<'a> EntryInfo<'a> {
    fn from_entry(entry: &'a Entry) -> Self {
        Self {
            name: entry.name(),
            kind: entry.kind().as_str(),
            size: entry.bytes().len(),
        }
    }
}

fn failure_strings(read: &ReadReport) -> Vec<String> {
    read.failures.iter().map(ToString::to_string).collect()
}

impl OutputFormatter for JsonFormatter {
    fn format_listing(
        &self,
        name: &str,
        generation: &Generation,
        read: &ReadReport,
        _long: bool,
        _human_readable: bool,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct ListOutput<'a> {
            archive: &'a str,
            classes: usize,
            resources: usize,
            total_size: u64,
            entries: Vec<EntryInfo<'a>>,
            failures: Vec<String>,
        }

        let entries = generation
            .classes()
            .sorted()
            .into_iter()
            .chain(generation.resources().sorted())
            .map(EntryInfo::from_entry)
            .collect();

        let data = ListOutput {
            archive: name,
            classes: generation.classes().len(),
            resources: generation.resources().len(),
            total_size: read.bytes_read,
            entries,
            failures: failure_strings(read),
        };

        Self::output(&JsonOutput::success("list", data))
    }

    fn format_repack_result(&self, summary: &RepackSummary<'_>) -> Result<()> {
        #[derive(Serialize)]
        struct RepackOutput {
            output_path: String,
            entries_read: usize,
            entries_written: usize,
            entries_removed: usize,
            entries_renamed: usize,
            stages_applied: usize,
            bytes_written: u64,
            collisions: Vec<String>,
            failures: Vec<String>,
            duration_ms: u128,
        }

        let data = RepackOutput {
            output_path: summary.output.display().to_string(),
            entries_read: summary.read.entries_read(),
            entries_written: summary.entries_written,
            entries_removed: summary.transform.entries_removed,
            entries_renamed: summary.transform.entries_renamed,
            stages_applied: summary.transform.stages_applied,
            bytes_written: summary.bytes_written,
            collisions: summary.transform.collisions.clone(),
            failures: failure_strings(summary.read),
            duration_ms: (summary.read.duration + summary.transform.duration).as_millis(),
        };

        Self::output(&JsonOutput::success("repack", data))
    }

    fn format_merge_result(
        &self,
        output: &Path,
        report: &MergeReport,
        bytes_written: u64,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct MergeOutput<'a> {
            output_path: String,
            sources: usize,
            entries_merged: usize,
            duplicates_dropped: usize,
            main_class: Option<&'a str>,
            main_class_source: Option<&'a str>,
            stripped_main_classes: &'a [(String, String)],
            manifest_rewritten: bool,
            bytes_written: u64,
            warnings: &'a [String],
            duration_ms: u128,
        }

        let data = MergeOutput {
            output_path: output.display().to_string(),
            sources: report.sources,
            entries_merged: report.entries_merged,
            duplicates_dropped: report.duplicates_dropped,
            main_class: report.main_class.as_deref(),
            main_class_source: report.main_class_source.as_deref(),
            stripped_main_classes: &report.stripped_main_classes,
            manifest_rewritten: report.manifest_rewritten,
            bytes_written,
            warnings: &report.warnings,
            duration_ms: report.duration.as_millis(),
        };

        Self::output(&JsonOutput::success("merge", data))
    }

    fn format_entry(&self, entry: &Entry, written_to: Option<&Path>) -> Result<()> {
        #[derive(Serialize)]
        struct FindOutput<'a> {
            #[serde(flatten)]
            entry: EntryInfo<'a>,
            #[serde(skip_serializing_if = "Option::is_none")]
            written_to: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            text: Option<&'a str>,
        }

        let data = FindOutput {
            entry: EntryInfo::from_entry(entry),
            written_to: written_to.map(|p| p.display().to_string()),
            text: if written_to.is_none() {
                std::str::from_utf8(entry.bytes()).ok()
            } else {
                None
            },
        };

        Self::output(&JsonOutput::success("find", data))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error("error", format!("{error:?}"));
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
