//! Operation reports and progress callbacks.

use std::path::PathBuf;
use std::time::Duration;

use crate::PipelineError;

/// Report of reading one archive into memory.
///
/// Per-entry decode failures do not abort a read; they are collected here as
/// [`PipelineError::EntryDecodeFailure`] values.
#[derive(Debug, Default)]
pub struct ReadReport {
    /// Number of class entries kept.
    pub classes: usize,

    /// Number of resource entries kept.
    pub resources: usize,

    /// Number of directory markers skipped.
    pub directories_skipped: usize,

    /// Number of entries dropped because an earlier entry had the same name.
    pub duplicates_discarded: usize,

    /// Total payload bytes kept.
    pub bytes_read: u64,

    /// Entries that could not be decoded and were dropped.
    pub failures: Vec<PipelineError>,

    /// Duration of the read.
    pub duration: Duration,
}

impl ReadReport {
    /// Creates a new empty read report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries kept.
    #[must_use]
    pub fn entries_read(&self) -> usize {
        self.classes + self.resources
    }

    /// Returns whether any entry was dropped because it failed to decode.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Names of the entries that failed to decode.
    #[must_use]
    pub fn failed_entries(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter_map(PipelineError::entry_name)
            .collect()
    }
}

/// Report of running a change chain over one collection.
#[derive(Debug, Clone, Default)]
pub struct TransformReport {
    /// Number of stages that ran.
    pub stages_applied: usize,

    /// Entries in the collection before the first stage.
    pub entries_in: usize,

    /// Entries in the collection after the last stage.
    pub entries_out: usize,

    /// Entries removed by a stage returning nothing, summed over stages.
    pub entries_removed: usize,

    /// Entries returned under a different name, summed over stages.
    pub entries_renamed: usize,

    /// Names on which two results of the same stage collided.
    pub collisions: Vec<String>,

    /// Duration of the transform.
    pub duration: Duration,
}

impl TransformReport {
    /// Creates a new empty transform report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds another report into this one (used when class and resource
    /// chains run back to back).
    pub fn absorb(&mut self, other: Self) {
        self.stages_applied += other.stages_applied;
        self.entries_in += other.entries_in;
        self.entries_out += other.entries_out;
        self.entries_removed += other.entries_removed;
        self.entries_renamed += other.entries_renamed;
        self.collisions.extend(other.collisions);
        self.duration += other.duration;
    }

    /// Returns whether any intra-stage collision happened.
    #[must_use]
    pub fn has_collisions(&self) -> bool {
        !self.collisions.is_empty()
    }
}

/// Report of merging several archives.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    /// Number of source archives merged.
    pub sources: usize,

    /// Entries in the merged archive.
    pub entries_merged: usize,

    /// Entries dropped because an earlier source already had the name.
    pub duplicates_dropped: usize,

    /// The chosen main class, if any source declared one.
    pub main_class: Option<String>,

    /// Source that contributed the chosen main class.
    pub main_class_source: Option<String>,

    /// Main classes stripped from later sources, as `(source, main class)`.
    pub stripped_main_classes: Vec<(String, String)>,

    /// Whether the merged manifest bytes were rewritten.
    pub manifest_rewritten: bool,

    /// Warnings generated during the merge.
    pub warnings: Vec<String>,

    /// Duration of the merge.
    pub duration: Duration,
}

impl MergeReport {
    /// Creates a new empty merge report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Report of loading a batch of archives into a multi-archive manager.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Registered archives with their read reports, in load order.
    pub reads: Vec<(String, ReadReport)>,

    /// Paths that were skipped, with the reason.
    pub rejected: Vec<(PathBuf, PipelineError)>,
}

impl LoadReport {
    /// Creates a new empty load report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the archives registered by this load.
    #[must_use]
    pub fn loaded(&self) -> Vec<&str> {
        self.reads.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Returns whether any path was skipped.
    #[must_use]
    pub fn has_rejections(&self) -> bool {
        !self.rejected.is_empty()
    }
}

/// Callback trait for archive-level progress reporting.
///
/// Multi-archive operations call this once per archive. The trait requires
/// `Send` so implementations can be moved across threads.
///
/// # Examples
///
/// ```
/// use jarpipe_core::ProgressCallback;
///
/// struct Printer;
///
/// impl ProgressCallback for Printer {
///     fn on_archive_start(&mut self, name: &str, total: usize, current: usize) {
///         println!("[{current}/{total}] {name}");
///     }
///
///     fn on_archive_complete(&mut self, _name: &str, _entries: usize) {}
///
///     fn on_complete(&mut self) {
///         println!("done");
///     }
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called before an archive is processed.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the archive
    /// * `total` - Number of archives in the batch
    /// * `current` - Current archive number (1-indexed)
    fn on_archive_start(&mut self, name: &str, total: usize, current: usize);

    /// Called after an archive has been processed.
    fn on_archive_complete(&mut self, name: &str, entries: usize);

    /// Called when the whole batch is complete.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_archive_start(&mut self, _name: &str, _total: usize, _current: usize) {}

    fn on_archive_complete(&mut self, _name: &str, _entries: usize) {}

    fn on_complete(&mut self) {}
}
