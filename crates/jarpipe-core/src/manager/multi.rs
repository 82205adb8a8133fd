//! [`MultiJarManager`]: a registry of archives keyed by file name.

use std::path::Path;

use tracing::debug;
use tracing::warn;

use crate::ArchiveReader;
use crate::PipelineConfig;
use crate::PipelineError;
use crate::Result;
use crate::TransformPipeline;
use crate::assembler::OutputFile;
use crate::change::ChangeFunction;
use crate::config::has_jar_extension;
use crate::reader::source_name_of;
use crate::report::LoadReport;
use crate::report::NoopProgress;
use crate::report::ProgressCallback;
use crate::report::TransformReport;
use crate::types::Archive;

/// A registry of archives keyed by file name.
///
/// Archives are kept in load order; [`MultiJarManager::names`] and
/// [`MultiJarManager::output_all`] follow that order.
///
/// # Examples
///
/// ```no_run
/// use jarpipe_core::MultiJarManager;
///
/// # fn main() -> Result<(), jarpipe_core::PipelineError> {
/// let mut manager = MultiJarManager::new()?;
/// let report = manager.load(&["libs/a.jar", "libs/b.jar"])?;
/// for (name, read) in &report.reads {
///     println!("{name}: {} entries", read.entries_read());
/// }
/// for output in manager.output_all() {
///     output.write_to(format!("out/{}", output.file_name()), 6)?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MultiJarManager {
    reader: ArchiveReader,
    pipeline: TransformPipeline,
    archives: Vec<Archive>,
}

impl MultiJarManager {
    /// Creates an empty manager with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(PipelineConfig::default())
    }

    /// Creates an empty manager with a custom configuration.
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        let pipeline = TransformPipeline::with_config(&config)?;
        Ok(Self {
            reader: ArchiveReader::with_config(config)?,
            pipeline,
            archives: Vec::new(),
        })
    }

    /// Reads and registers every path.
    ///
    /// Paths whose file name does not end in `.jar`, and names that are
    /// already registered, are skipped and listed in
    /// [`LoadReport::rejected`].
    ///
    /// # Errors
    ///
    /// The first read failure aborts the batch. Archives registered before
    /// the failure stay registered.
    pub fn load<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<LoadReport> {
        let mut progress = NoopProgress;
        self.load_with_progress(paths, &mut progress)
    }

    /// Like [`MultiJarManager::load`], reporting per-archive progress.
    ///
    /// # Errors
    ///
    /// Same as [`MultiJarManager::load`].
    pub fn load_with_progress<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        progress: &mut dyn ProgressCallback,
    ) -> Result<LoadReport> {
        let mut report = LoadReport::new();
        let total = paths.len();

        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            if path.as_os_str().is_empty() {
                return Err(PipelineError::NullArgument { argument: "path" });
            }
            let name = source_name_of(path);
            progress.on_archive_start(&name, total, index + 1);

            if !has_jar_extension(path) {
                warn!(path = %path.display(), "skipping input that is not a .jar file");
                report.rejected.push((
                    path.to_path_buf(),
                    PipelineError::invalid_archive(path, "file name does not end in .jar"),
                ));
                continue;
            }
            if self.contains(&name) {
                warn!(name = %name, "archive already registered, skipping");
                report
                    .rejected
                    .push((path.to_path_buf(), PipelineError::DuplicateArchive { name }));
                continue;
            }

            let (archive, read) = self.reader.read(path)?;
            debug!(name = %name, entries = read.entries_read(), "archive registered");
            progress.on_archive_complete(&name, read.entries_read());
            self.archives.push(archive);
            report.reads.push((name, read));
        }

        progress.on_complete();
        Ok(report)
    }

    /// Applies `changes` to the archive registered as `name`.
    ///
    /// Returns `Ok(false)` without doing anything if no such archive exists.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ChangeFunctionFailure`] if a change fails; that
    /// archive is left as it was.
    pub fn apply_targeted(&self, name: &str, changes: &[ChangeFunction]) -> Result<bool> {
        let Some(archive) = self.archive(name) else {
            debug!(name, "no archive registered under this name");
            return Ok(false);
        };
        self.pipeline.transform(archive, changes)?;
        Ok(true)
    }

    /// Applies `changes` to every registered archive, one after another.
    ///
    /// # Errors
    ///
    /// The first failure stops the loop. Archives processed before it keep
    /// their new generation.
    pub fn apply_all(&self, changes: &[ChangeFunction]) -> Result<TransformReport> {
        let mut report = TransformReport::new();
        for archive in &self.archives {
            report.absorb(self.pipeline.transform(archive, changes)?);
        }
        Ok(report)
    }

    /// Returns an output handle for the archive registered as `name`.
    #[must_use]
    pub fn output_targeted(&self, name: &str) -> Option<OutputFile> {
        self.archive(name).and_then(OutputFile::from_archive)
    }

    /// Returns output handles for every registered archive, in load order.
    #[must_use]
    pub fn output_all(&self) -> Vec<OutputFile> {
        self.archives
            .iter()
            .filter_map(OutputFile::from_archive)
            .collect()
    }

    /// Unregisters `name`. Returns whether it was registered.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        self.archives.remove(index).close();
        true
    }

    /// Unregisters every archive.
    pub fn close(&mut self) {
        for mut archive in self.archives.drain(..) {
            archive.close();
        }
    }

    /// Registered names, in load order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.archives.iter().filter_map(Archive::source_name).collect()
    }

    /// The archive registered as `name`.
    #[must_use]
    pub fn archive(&self, name: &str) -> Option<&Archive> {
        self.archives.iter().find(|a| a.source_name() == Some(name))
    }

    /// Returns whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of registered archives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    /// Returns `true` if no archive is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.archives
            .iter()
            .position(|a| a.source_name() == Some(name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::change::ChangeResult;
    use crate::test_utils::create_test_zip;
    use crate::test_utils::read_zip_entries;
    use crate::types::Entry;
    use crate::types::Payload;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_jar(dir: &Path, name: &str, entries: Vec<(&str, &[u8])>) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, create_test_zip(entries)).unwrap();
        path
    }

    fn loaded(temp: &TempDir) -> MultiJarManager {
        let a = write_jar(temp.path(), "a.jar", vec![("a/A.class", b"a"), ("a.txt", b"a")]);
        let b = write_jar(temp.path(), "b.jar", vec![("b/B.class", b"b")]);
        let mut manager = MultiJarManager::new().unwrap();
        manager.load(&[a, b]).unwrap();
        manager
    }

    fn drop_classes() -> ChangeFunction {
        ChangeFunction::class(|_: &str, _: &Payload| -> ChangeResult { Ok(None) })
    }

    #[test]
    fn test_load_registers_in_order() {
        let temp = TempDir::new().unwrap();
        let manager = loaded(&temp);
        assert_eq!(manager.names(), vec!["a.jar", "b.jar"]);
        assert_eq!(manager.len(), 2);
        assert!(manager.contains("a.jar"));
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ProgressCallback for Recorder {
        fn on_archive_start(&mut self, name: &str, total: usize, current: usize) {
            self.events.push(format!("start {name} {current}/{total}"));
        }

        fn on_archive_complete(&mut self, name: &str, entries: usize) {
            self.events.push(format!("done {name} {entries}"));
        }

        fn on_complete(&mut self) {
            self.events.push("complete".into());
        }
    }

    #[test]
    fn test_load_with_progress_reports_each_archive() {
        let temp = TempDir::new().unwrap();
        let a = write_jar(temp.path(), "a.jar", vec![("a/A.class", b"a"), ("a.txt", b"a")]);
        let skipped = write_jar(temp.path(), "notes.zip", vec![("x.txt", b"x")]);

        let mut recorder = Recorder::default();
        let mut manager = MultiJarManager::new().unwrap();
        manager.load_with_progress(&[a, skipped], &mut recorder).unwrap();

        assert_eq!(
            recorder.events,
            vec!["start a.jar 1/2", "done a.jar 2", "start notes.zip 2/2", "complete"]
        );
    }

    #[test]
    fn test_load_rejects_non_jar_and_duplicates() {
        let temp = TempDir::new().unwrap();
        let a = write_jar(temp.path(), "a.jar", vec![("x.txt", b"x")]);
        let zip = write_jar(temp.path(), "notes.zip", vec![("x.txt", b"x")]);
        let nested = temp.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        let a_again = write_jar(&nested, "a.jar", vec![("y.txt", b"y")]);

        let mut manager = MultiJarManager::new().unwrap();
        let report = manager.load(&[a, zip, a_again]).unwrap();

        assert_eq!(report.loaded(), vec!["a.jar"]);
        assert_eq!(report.rejected.len(), 2);
        assert!(matches!(
            report.rejected[0].1,
            PipelineError::InvalidArchiveFormat { .. }
        ));
        assert!(matches!(
            report.rejected[1].1,
            PipelineError::DuplicateArchive { .. }
        ));
        // First registration wins.
        let snapshot = manager.archive("a.jar").unwrap().snapshot();
        assert!(snapshot.resources().contains("x.txt"));
    }

    #[test]
    fn test_load_failure_keeps_earlier_archives() {
        let temp = TempDir::new().unwrap();
        let a = write_jar(temp.path(), "a.jar", vec![("x.txt", b"x")]);
        let broken = temp.path().join("broken.jar");
        std::fs::write(&broken, b"not a zip").unwrap();
        let c = write_jar(temp.path(), "c.jar", vec![("x.txt", b"x")]);

        let mut manager = MultiJarManager::new().unwrap();
        let err = manager.load(&[a, broken, c]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArchiveFormat { .. }));
        assert_eq!(manager.names(), vec!["a.jar"]);
    }

    #[test]
    fn test_apply_targeted_unknown_is_noop() {
        let temp = TempDir::new().unwrap();
        let manager = loaded(&temp);
        assert!(!manager.apply_targeted("missing.jar", &[drop_classes()]).unwrap());
        assert_eq!(
            manager.archive("a.jar").unwrap().snapshot().classes().len(),
            1
        );
    }

    #[test]
    fn test_apply_targeted_only_touches_target() {
        let temp = TempDir::new().unwrap();
        let manager = loaded(&temp);
        assert!(manager.apply_targeted("a.jar", &[drop_classes()]).unwrap());
        assert!(manager.archive("a.jar").unwrap().snapshot().classes().is_empty());
        assert_eq!(
            manager.archive("b.jar").unwrap().snapshot().classes().len(),
            1
        );
    }

    #[test]
    fn test_apply_all_and_output_all() {
        let temp = TempDir::new().unwrap();
        let manager = loaded(&temp);
        let report = manager.apply_all(&[drop_classes()]).unwrap();
        assert_eq!(report.entries_removed, 2);

        let outputs = manager.output_all();
        let names: Vec<&str> = outputs.iter().map(OutputFile::file_name).collect();
        assert_eq!(names, vec!["a.jar", "b.jar"]);
        let a = read_zip_entries(&outputs[0].to_bytes(0).unwrap());
        assert_eq!(a, vec![("a.txt".to_owned(), b"a".to_vec())]);
        assert!(read_zip_entries(&outputs[1].to_bytes(0).unwrap()).is_empty());
    }

    #[test]
    fn test_apply_all_stops_at_first_failure() {
        let temp = TempDir::new().unwrap();
        let manager = loaded(&temp);
        let fail_on_b = ChangeFunction::class(|name: &str, payload: &Payload| -> ChangeResult {
            if name.starts_with("b/") {
                Err("refusing b".into())
            } else {
                Ok(Some(Entry::class(format!("x/{name}"), Payload::clone(payload))))
            }
        });
        assert!(manager.apply_all(&[fail_on_b]).is_err());
        // a.jar was processed before the failure and keeps its new generation.
        let a = manager.archive("a.jar").unwrap().snapshot();
        assert!(a.classes().contains("x/a/A.class"));
        let b = manager.archive("b.jar").unwrap().snapshot();
        assert!(b.classes().contains("b/B.class"));
    }

    #[test]
    fn test_output_targeted_and_remove() {
        let temp = TempDir::new().unwrap();
        let mut manager = loaded(&temp);
        assert_eq!(manager.output_targeted("b.jar").unwrap().file_name(), "b.jar");
        assert!(manager.output_targeted("c.jar").is_none());

        assert!(manager.remove("b.jar"));
        assert!(!manager.remove("b.jar"));
        assert_eq!(manager.names(), vec!["a.jar"]);

        manager.close();
        assert!(manager.is_empty());
    }
}
