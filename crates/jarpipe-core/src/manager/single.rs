//! [`JarManager`]: one archive, read, transformed and written in place.

use std::path::Path;

use crate::ArchiveReader;
use crate::PipelineConfig;
use crate::Result;
use crate::TransformPipeline;
use crate::assembler::OutputFile;
use crate::change::ChangeFunction;
use crate::report::ReadReport;
use crate::report::TransformReport;
use crate::types::Archive;
use crate::types::EntryKind;

/// Holds a single archive and applies changes to it.
///
/// # Examples
///
/// ```no_run
/// use jarpipe_core::ChangeFunction;
/// use jarpipe_core::ChangeResult;
/// use jarpipe_core::JarManager;
/// use jarpipe_core::Payload;
///
/// # fn main() -> Result<(), jarpipe_core::PipelineError> {
/// let mut manager = JarManager::new()?;
/// manager.read_jar("app.jar")?;
/// manager.apply_class_changes(&[ChangeFunction::class(|_: &str, _: &Payload| -> ChangeResult {
///     Ok(None)
/// })])?;
/// if let Some(output) = manager.output_file() {
///     output.write_to("app-stripped.jar", 9)?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct JarManager {
    reader: ArchiveReader,
    pipeline: TransformPipeline,
    archive: Option<Archive>,
    last_read: Option<ReadReport>,
}

impl JarManager {
    /// Creates a manager that only accepts `.jar` files.
    pub fn new() -> Result<Self> {
        Self::with_config(PipelineConfig::default().with_require_jar_extension(true))
    }

    /// Creates a manager with a custom configuration.
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        let pipeline = TransformPipeline::with_config(&config)?;
        Ok(Self {
            reader: ArchiveReader::with_config(config)?,
            pipeline,
            archive: None,
            last_read: None,
        })
    }

    /// Reads `path`, replacing any archive held before.
    ///
    /// # Errors
    ///
    /// Any error of [`ArchiveReader::read`]. The previously held archive is
    /// kept in that case.
    pub fn read_jar<P: AsRef<Path>>(&mut self, path: P) -> Result<&ReadReport> {
        let (archive, report) = self.reader.read(path)?;
        self.archive = Some(archive);
        Ok(self.last_read.insert(report))
    }

    /// Applies the class stages of `changes`.
    ///
    /// Does nothing if no archive has been read.
    ///
    /// # Errors
    ///
    /// [`crate::PipelineError::ChangeFunctionFailure`] if a change fails; the
    /// archive is left as it was.
    pub fn apply_class_changes(&self, changes: &[ChangeFunction]) -> Result<TransformReport> {
        self.apply_kind(EntryKind::Class, changes)
    }

    /// Applies the resource stages of `changes`.
    ///
    /// # Errors
    ///
    /// Same as [`JarManager::apply_class_changes`].
    pub fn apply_resource_changes(&self, changes: &[ChangeFunction]) -> Result<TransformReport> {
        self.apply_kind(EntryKind::Resource, changes)
    }

    /// Applies class and resource stages of `changes` in one step.
    ///
    /// # Errors
    ///
    /// Same as [`JarManager::apply_class_changes`].
    pub fn apply(&self, changes: &[ChangeFunction]) -> Result<TransformReport> {
        match &self.archive {
            Some(archive) => self.pipeline.transform(archive, changes),
            None => Ok(TransformReport::new()),
        }
    }

    fn apply_kind(&self, kind: EntryKind, changes: &[ChangeFunction]) -> Result<TransformReport> {
        let Some(archive) = &self.archive else {
            return Ok(TransformReport::new());
        };
        let _writes = archive.lock_writes();
        let snapshot = archive.snapshot();
        match kind {
            EntryKind::Class => {
                let (classes, report) = self.pipeline.apply(snapshot.classes(), kind, changes)?;
                if report.stages_applied > 0 {
                    archive.swap_classes(classes);
                }
                Ok(report)
            }
            EntryKind::Resource => {
                let (resources, report) =
                    self.pipeline.apply(snapshot.resources(), kind, changes)?;
                if report.stages_applied > 0 {
                    archive.swap_resources(resources);
                }
                Ok(report)
            }
        }
    }

    /// Returns an output handle for the current generation, or `None` if no
    /// archive is held.
    #[must_use]
    pub fn output_file(&self) -> Option<OutputFile> {
        self.archive.as_ref().and_then(OutputFile::from_archive)
    }

    /// The held archive's file name.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.archive.as_ref().and_then(Archive::source_name)
    }

    /// The held archive.
    #[must_use]
    pub fn archive(&self) -> Option<&Archive> {
        self.archive.as_ref()
    }

    /// Report of the last successful [`JarManager::read_jar`].
    #[must_use]
    pub fn last_read_report(&self) -> Option<&ReadReport> {
        self.last_read.as_ref()
    }

    /// Releases the held archive.
    pub fn close(&mut self) {
        if let Some(mut archive) = self.archive.take() {
            archive.close();
        }
        self.last_read = None;
    }
}
