//! Merging several archives into one.

use std::path::Path;
use std::time::Instant;

use tracing::info;
use tracing::warn;

use crate::ArchiveReader;
use crate::ManifestPolicy;
use crate::PipelineConfig;
use crate::PipelineError;
use crate::Result;
use crate::manifest::MANIFEST_PATH;
use crate::manifest::Manifest;
use crate::report::MergeReport;
use crate::report::NoopProgress;
use crate::report::ProgressCallback;
use crate::types::Archive;
use crate::types::CollisionPolicy;
use crate::types::Entry;
use crate::types::EntryCollection;
use crate::types::Generation;

/// Folds several source archives into one merged archive.
///
/// Sources are processed in the order given. For every name, the entry of the
/// earliest source that has it is kept. At most one `Main-Class` survives: the
/// first source whose manifest declares one wins, and later declarations are
/// stripped.
///
/// # Examples
///
/// ```
/// use jarpipe_core::ArchiveReader;
/// use jarpipe_core::MergeCoordinator;
/// use jarpipe_core::test_utils::ZipTestBuilder;
///
/// # fn main() -> Result<(), jarpipe_core::PipelineError> {
/// let reader = ArchiveReader::new()?;
/// let (a, _) = reader.read_bytes("a.jar", ZipTestBuilder::new().add_manifest(Some("a.Main")).build())?;
/// let (b, _) = reader.read_bytes("b.jar", ZipTestBuilder::new().add_manifest(Some("b.Main")).build())?;
///
/// let mut merger = MergeCoordinator::new("merged.jar")?;
/// let (merged, report) = merger.merge(&[&a, &b])?;
/// assert_eq!(merged.source_name(), Some("merged.jar"));
/// assert_eq!(report.main_class.as_deref(), Some("a.Main"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MergeCoordinator {
    merged_name: String,
    config: PipelineConfig,
    chosen: Option<Manifest>,
}

impl MergeCoordinator {
    /// Creates a coordinator producing an archive called `merged_name`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidArchiveFormat`] if the name does not end in
    /// `.jar`.
    pub fn new(merged_name: impl Into<String>) -> Result<Self> {
        Self::with_config(merged_name, PipelineConfig::default())
    }

    /// Creates a coordinator with a custom configuration.
    ///
    /// # Errors
    ///
    /// Same as [`MergeCoordinator::new`].
    pub fn with_config(merged_name: impl Into<String>, config: PipelineConfig) -> Result<Self> {
        let merged_name = merged_name.into();
        if merged_name.is_empty() {
            return Err(PipelineError::NullArgument {
                argument: "merged_name",
            });
        }
        if !merged_name.ends_with(".jar") {
            return Err(PipelineError::invalid_archive(
                &merged_name,
                "merged archive name must end in .jar",
            ));
        }
        Ok(Self {
            merged_name,
            config,
            chosen: None,
        })
    }

    /// Returns the merged archive's name.
    #[must_use]
    pub fn merged_name(&self) -> &str {
        &self.merged_name
    }

    /// Returns the main attributes adopted by the last merge, if any source
    /// declared a main class.
    #[must_use]
    pub fn chosen_manifest(&self) -> Option<&Manifest> {
        self.chosen.as_ref()
    }

    /// Merges `sources` in order.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InsufficientInputs`] unless more than one source is
    /// given.
    pub fn merge(&mut self, sources: &[&Archive]) -> Result<(Archive, MergeReport)> {
        let start = Instant::now();
        if sources.len() < 2 {
            return Err(PipelineError::InsufficientInputs {
                provided: sources.len(),
            });
        }

        self.chosen = None;
        let mut report = MergeReport::new();
        let mut classes = EntryCollection::new();
        let mut resources = EntryCollection::new();

        for source in sources {
            let name = source.source_name().unwrap_or("<closed>");
            let snapshot = source.snapshot();

            self.check_manifest(name, snapshot.resources(), &mut report);

            let dropped = fold_into(&mut classes, snapshot.classes())
                + fold_into(&mut resources, snapshot.resources());
            report.duplicates_dropped += dropped;
            report.sources += 1;
        }

        if self.config.manifest_policy == ManifestPolicy::Rewrite {
            report.manifest_rewritten = self.rewrite_manifest(&mut resources);
        }

        report.entries_merged = classes.len() + resources.len();
        report.duration = start.elapsed();
        info!(
            merged = %self.merged_name,
            sources = report.sources,
            entries = report.entries_merged,
            duplicates = report.duplicates_dropped,
            main_class = report.main_class.as_deref().unwrap_or("-"),
            "merge complete"
        );

        let merged = Archive::from_generation(&self.merged_name, Generation::new(classes, resources));
        Ok((merged, report))
    }

    /// Reads every path and merges the results.
    ///
    /// Entries that fail to decode are dropped and reported as warnings.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InsufficientInputs`] unless more than one path is
    /// given, or any read error.
    pub fn merge_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(Archive, MergeReport)> {
        let mut progress = NoopProgress;
        self.merge_files_with_progress(paths, &mut progress)
    }

    /// Reads every path and merges the results, reporting per-archive
    /// progress.
    ///
    /// # Errors
    ///
    /// Same as [`MergeCoordinator::merge_files`].
    pub fn merge_files_with_progress<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        progress: &mut dyn ProgressCallback,
    ) -> Result<(Archive, MergeReport)> {
        if paths.len() < 2 {
            return Err(PipelineError::InsufficientInputs {
                provided: paths.len(),
            });
        }

        let reader = ArchiveReader::with_config(self.config.clone())?;
        let total = paths.len();
        let mut archives = Vec::with_capacity(total);
        let mut warnings = Vec::new();

        for (index, path) in paths.iter().enumerate() {
            let display = path.as_ref().display().to_string();
            progress.on_archive_start(&display, total, index + 1);
            let (archive, read) = reader.read(path)?;
            warnings.extend(read.failures.iter().map(ToString::to_string));
            progress.on_archive_complete(&display, read.entries_read());
            archives.push(archive);
        }

        let refs: Vec<&Archive> = archives.iter().collect();
        let (merged, mut report) = self.merge(&refs)?;
        for warning in warnings {
            report.add_warning(warning);
        }
        progress.on_complete();
        Ok((merged, report))
    }

    /// Clears the adopted main attributes.
    pub fn close(&mut self) {
        self.chosen = None;
    }

    fn check_manifest(&mut self, source: &str, resources: &EntryCollection, report: &mut MergeReport) {
        let Some(entry) = resources.get(MANIFEST_PATH).filter(|e| e.has_payload()) else {
            return;
        };
        let manifest = Manifest::parse(entry.bytes());
        let Some(main_class) = manifest.main_class() else {
            return;
        };

        if self.chosen.is_none() {
            report.main_class = Some(main_class.to_owned());
            report.main_class_source = Some(source.to_owned());
            self.chosen = Some(manifest);
        } else {
            warn!(source, main_class, "dropping main class of later source");
            report.add_warning(format!("{source}: main class {main_class} stripped"));
            report
                .stripped_main_classes
                .push((source.to_owned(), main_class.to_owned()));
        }
    }

    /// Makes the merged manifest declare exactly the chosen main class.
    /// Returns whether the bytes changed.
    fn rewrite_manifest(&self, resources: &mut EntryCollection) -> bool {
        let Some(entry) = resources.get(MANIFEST_PATH).filter(|e| e.has_payload()) else {
            return false;
        };
        let mut manifest = Manifest::parse(entry.bytes());
        let chosen = self.chosen.as_ref().and_then(Manifest::main_class);
        if manifest.main_class() == chosen {
            return false;
        }

        match chosen {
            Some(main_class) => manifest.set_main_class(main_class),
            None => {
                manifest.remove_main_class();
            }
        }
        resources.remove(MANIFEST_PATH);
        resources.insert(
            Entry::resource(MANIFEST_PATH, manifest.to_bytes()),
            CollisionPolicy::MergeFirstArchiveWins,
        );
        true
    }
}

/// Adds every entry of `source` not already in `target`. Returns the number
/// dropped.
fn fold_into(target: &mut EntryCollection, source: &EntryCollection) -> usize {
    let mut dropped = 0;
    for entry in source.sorted() {
        if target
            .insert(entry.clone(), CollisionPolicy::MergeFirstArchiveWins)
            .collided()
        {
            dropped += 1;
        }
    }
    dropped
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::ZipTestBuilder;
    use crate::test_utils::create_test_zip;
    use crate::test_utils::manifest;

    fn read(name: &str, data: Vec<u8>) -> Archive {
        ArchiveReader::new().unwrap().read_bytes(name, data).unwrap().0
    }

    fn merged_manifest(archive: &Archive) -> Manifest {
        let snapshot = archive.snapshot();
        Manifest::parse(snapshot.resources().get(MANIFEST_PATH).unwrap().bytes())
    }

    #[test]
    fn test_name_must_end_in_jar() {
        assert!(MergeCoordinator::new("out.jar").is_ok());
        let err = MergeCoordinator::new("out.zip").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArchiveFormat { .. }));
        let err = MergeCoordinator::new("").unwrap_err();
        assert!(matches!(err, PipelineError::NullArgument { .. }));
    }

    #[test]
    fn test_single_source_is_insufficient() {
        let a = read("a.jar", create_test_zip(vec![("x.txt", b"x")]));
        let err = MergeCoordinator::new("m.jar").unwrap().merge(&[&a]).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientInputs { provided: 1 }));

        let err = MergeCoordinator::new("m.jar").unwrap().merge(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientInputs { provided: 0 }));
    }

    #[test]
    fn test_first_archive_wins() {
        let a = read(
            "a.jar",
            create_test_zip(vec![("shared.txt", b"A"), ("a/A.class", b"a")]),
        );
        let b = read(
            "b.jar",
            create_test_zip(vec![("shared.txt", b"B"), ("b/B.class", b"b")]),
        );
        let (merged, report) = MergeCoordinator::new("m.jar")
            .unwrap()
            .merge(&[&a, &b])
            .unwrap();
        let snapshot = merged.snapshot();
        assert_eq!(snapshot.resources().get("shared.txt").unwrap().bytes(), b"A");
        assert_eq!(snapshot.classes().len(), 2);
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(report.entries_merged, 3);
        assert_eq!(report.sources, 2);
    }

    #[test]
    fn test_main_class_first_declaration_wins() {
        let a = read("a.jar", ZipTestBuilder::new().add_manifest(None).build());
        let b = read("b.jar", ZipTestBuilder::new().add_manifest(Some("b.Main")).build());
        let c = read("c.jar", ZipTestBuilder::new().add_manifest(Some("c.Main")).build());

        let mut merger = MergeCoordinator::new("m.jar").unwrap();
        let (merged, report) = merger.merge(&[&a, &b, &c]).unwrap();

        assert_eq!(report.main_class.as_deref(), Some("b.Main"));
        assert_eq!(report.main_class_source.as_deref(), Some("b.jar"));
        assert_eq!(
            report.stripped_main_classes,
            vec![("c.jar".to_owned(), "c.Main".to_owned())]
        );
        assert!(report.has_warnings());
        assert_eq!(
            merger.chosen_manifest().and_then(Manifest::main_class),
            Some("b.Main")
        );

        // a.jar's manifest bytes won, rewritten to carry b's main class.
        assert!(report.manifest_rewritten);
        let mf = merged_manifest(&merged);
        assert_eq!(mf.main_class(), Some("b.Main"));
        assert_eq!(mf.get("Created-By"), Some("jarpipe tests"));
    }

    #[test]
    fn test_preserve_keeps_first_manifest_bytes() {
        let a = read("a.jar", ZipTestBuilder::new().add_manifest(None).build());
        let b = read("b.jar", ZipTestBuilder::new().add_manifest(Some("b.Main")).build());

        let config = PipelineConfig::new().with_manifest_policy(ManifestPolicy::Preserve);
        let (merged, report) = MergeCoordinator::with_config("m.jar", config)
            .unwrap()
            .merge(&[&a, &b])
            .unwrap();

        assert_eq!(report.main_class.as_deref(), Some("b.Main"));
        assert!(!report.manifest_rewritten);
        let snapshot = merged.snapshot();
        assert_eq!(
            snapshot.resources().get(MANIFEST_PATH).unwrap().bytes(),
            manifest(None).as_slice()
        );
    }

    #[test]
    fn test_rewrite_untouched_when_already_correct() {
        let a = read("a.jar", ZipTestBuilder::new().add_manifest(Some("a.Main")).build());
        let b = read("b.jar", ZipTestBuilder::new().add_manifest(Some("b.Main")).build());
        let (merged, report) = MergeCoordinator::new("m.jar")
            .unwrap()
            .merge(&[&a, &b])
            .unwrap();
        assert!(!report.manifest_rewritten);
        assert_eq!(
            merged.snapshot().resources().get(MANIFEST_PATH).unwrap().bytes(),
            manifest(Some("a.Main")).as_slice()
        );
    }

    #[test]
    fn test_merge_does_not_modify_sources() {
        let a = read("a.jar", create_test_zip(vec![("x.txt", b"a")]));
        let b = read("b.jar", create_test_zip(vec![("x.txt", b"b")]));
        MergeCoordinator::new("m.jar").unwrap().merge(&[&a, &b]).unwrap();
        assert_eq!(b.snapshot().resources().get("x.txt").unwrap().bytes(), b"b");
    }

    #[test]
    fn test_close_resets_chosen_manifest() {
        let a = read("a.jar", ZipTestBuilder::new().add_manifest(Some("a.Main")).build());
        let b = read("b.jar", create_test_zip(vec![("x.txt", b"b")]));
        let mut merger = MergeCoordinator::new("m.jar").unwrap();
        merger.merge(&[&a, &b]).unwrap();
        assert!(merger.chosen_manifest().is_some());
        merger.close();
        assert!(merger.chosen_manifest().is_none());
    }

    #[test]
    fn test_merge_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let a = temp.path().join("a.jar");
        let b = temp.path().join("b.jar");
        std::fs::write(&a, create_test_zip(vec![("a.txt", b"a")])).unwrap();
        std::fs::write(&b, create_test_zip(vec![("b.txt", b"b")])).unwrap();

        let (merged, report) = MergeCoordinator::new("m.jar")
            .unwrap()
            .merge_files(&[&a, &b])
            .unwrap();
        assert_eq!(merged.snapshot().resources().names(), vec!["a.txt", "b.txt"]);
        assert_eq!(report.sources, 2);

        let err = MergeCoordinator::new("m.jar")
            .unwrap()
            .merge_files(&[&a])
            .unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientInputs { provided: 1 }));
    }
}
