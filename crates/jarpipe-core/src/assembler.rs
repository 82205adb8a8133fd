//! Serialization of entry collections into JAR bytes.

use std::io::Cursor;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::PipelineError;
use crate::Result;
use crate::types::Archive;
use crate::types::CLASS_MARKER;
use crate::types::Entry;
use crate::types::EntryCollection;
use crate::types::Generation;

/// Highest deflate level accepted by [`OutputAssembler::assemble`].
const MAX_LEVEL: u32 = 9;

/// Writes class and resource collections into a single JAR.
///
/// Classes are written first, then resources, each sorted by name. Every
/// entry carries the same fixed modification time, so assembling equal
/// collections with the same level yields byte-identical output.
///
/// # Examples
///
/// ```
/// use jarpipe_core::CollisionPolicy;
/// use jarpipe_core::Entry;
/// use jarpipe_core::EntryCollection;
/// use jarpipe_core::OutputAssembler;
///
/// # fn main() -> Result<(), jarpipe_core::PipelineError> {
/// let mut resources = EntryCollection::new();
/// resources.insert(Entry::resource("data.txt", b"hello".as_slice()), CollisionPolicy::IngestFirstWins);
///
/// let bytes = OutputAssembler::new("out.jar").assemble(&EntryCollection::new(), &resources, 9)?;
/// assert_eq!(&bytes[..2], b"PK");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OutputAssembler {
    file_name: String,
}

impl OutputAssembler {
    /// Creates an assembler for an archive called `file_name`.
    ///
    /// The name is only used in diagnostics.
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Returns the output archive's file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Serializes `classes` and `resources` into JAR bytes.
    ///
    /// `level` must be in `0..=9`: `0` stores entries uncompressed, `1..=9`
    /// deflates them at that level.
    ///
    /// Class entries whose name no longer contains `.class` get the marker
    /// appended. Resource entries without a payload are skipped.
    ///
    /// # Errors
    ///
    /// [`PipelineError::OutputAssemblyFailure`] if the level is out of range,
    /// a class entry has no payload, two entries end up with the same name, or
    /// the ZIP writer fails. No partial output is returned.
    pub fn assemble(
        &self,
        classes: &EntryCollection,
        resources: &EntryCollection,
        level: u32,
    ) -> Result<Vec<u8>> {
        let start = Instant::now();
        let options = self.entry_options(level)?;
        let capacity = usize::try_from(classes.total_bytes() + resources.total_bytes())
            .unwrap_or(usize::MAX)
            .min(64 * 1024 * 1024);
        let mut zip = ZipWriter::new(Cursor::new(Vec::with_capacity(capacity)));

        let mut written = 0usize;
        for entry in classes.sorted() {
            let Some(payload) = entry.payload() else {
                return Err(self.failure(Some(entry.name()), "class entry has no payload"));
            };
            let name = class_entry_name(entry);
            self.write_entry(&mut zip, &name, payload, options)?;
            written += 1;
        }

        let mut skipped = 0usize;
        for entry in resources.sorted() {
            let Some(payload) = entry.payload() else {
                skipped += 1;
                continue;
            };
            self.write_entry(&mut zip, entry.name(), payload, options)?;
            written += 1;
        }

        let bytes = zip
            .finish()
            .map_err(|e| self.failure(None, e.to_string()))?
            .into_inner();

        debug!(
            file_name = %self.file_name,
            entries = written,
            skipped,
            level,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "assembled archive"
        );
        Ok(bytes)
    }

    /// Assembles a whole generation.
    ///
    /// # Errors
    ///
    /// Same as [`OutputAssembler::assemble`].
    pub fn assemble_generation(&self, generation: &Generation, level: u32) -> Result<Vec<u8>> {
        self.assemble(generation.classes(), generation.resources(), level)
    }

    fn entry_options(&self, level: u32) -> Result<SimpleFileOptions> {
        if level > MAX_LEVEL {
            return Err(self.failure(
                None,
                format!("compression level {level} is outside 0..={MAX_LEVEL}"),
            ));
        }

        let options = SimpleFileOptions::default().last_modified_time(zip::DateTime::default());
        if level == 0 {
            Ok(options.compression_method(CompressionMethod::Stored))
        } else {
            Ok(options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(level))))
        }
    }

    fn write_entry(
        &self,
        zip: &mut ZipWriter<Cursor<Vec<u8>>>,
        name: &str,
        payload: &[u8],
        options: SimpleFileOptions,
    ) -> Result<()> {
        zip.start_file(name, options)
            .map_err(|e| self.failure(Some(name), e.to_string()))?;
        zip.write_all(payload)
            .map_err(|e| self.failure(Some(name), e.to_string()))
    }

    fn failure(&self, entry: Option<&str>, reason: impl Into<String>) -> PipelineError {
        PipelineError::OutputAssemblyFailure {
            file_name: self.file_name.clone(),
            entry: entry.map(str::to_owned),
            reason: reason.into(),
        }
    }
}

fn class_entry_name(entry: &Entry) -> std::borrow::Cow<'_, str> {
    if entry.name().contains(CLASS_MARKER) {
        entry.name().into()
    } else {
        format!("{}{CLASS_MARKER}", entry.name()).into()
    }
}

/// An archive ready to be written out.
///
/// Holds the output file name and the generation that was current when the
/// handle was created; later transforms of the source archive do not affect
/// it.
#[derive(Debug, Clone)]
pub struct OutputFile {
    assembler: OutputAssembler,
    generation: Arc<Generation>,
}

impl OutputFile {
    /// Creates an output handle for `generation`.
    #[must_use]
    pub fn new(file_name: impl Into<String>, generation: Arc<Generation>) -> Self {
        Self {
            assembler: OutputAssembler::new(file_name),
            generation,
        }
    }

    /// Captures the current generation of `archive` under its source name.
    ///
    /// Returns `None` once the archive has been closed.
    #[must_use]
    pub fn from_archive(archive: &Archive) -> Option<Self> {
        let name = archive.source_name()?;
        Some(Self::new(name, archive.snapshot()))
    }

    /// Returns the output file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.assembler.file_name()
    }

    /// Returns the captured generation.
    #[must_use]
    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Assembles the archive bytes at compression `level`.
    ///
    /// # Errors
    ///
    /// Same as [`OutputAssembler::assemble`].
    pub fn to_bytes(&self, level: u32) -> Result<Vec<u8>> {
        self.assembler.assemble_generation(&self.generation, level)
    }

    /// Assembles the archive and writes it to `path`.
    ///
    /// Nothing is written if assembly fails.
    ///
    /// # Errors
    ///
    /// [`PipelineError::OutputAssemblyFailure`] if assembly fails, or
    /// [`PipelineError::Io`] if the file cannot be written.
    pub fn write_to<P: AsRef<Path>>(&self, path: P, level: u32) -> Result<u64> {
        let bytes = self.to_bytes(level)?;
        std::fs::write(path.as_ref(), &bytes)?;
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::read_zip_entries;
    use crate::types::CollisionPolicy;
    use tempfile::TempDir;

    fn collection(entries: Vec<Entry>) -> EntryCollection {
        let mut c = EntryCollection::new();
        for entry in entries {
            c.insert(entry, CollisionPolicy::IngestFirstWins);
        }
        c
    }

    #[test]
    fn test_assemble_writes_classes_and_resources() {
        let classes = collection(vec![Entry::class("a/B.class", b"\xCA\xFE".as_slice())]);
        let resources = collection(vec![Entry::resource("data.txt", b"12345".as_slice())]);
        let bytes = OutputAssembler::new("out.jar")
            .assemble(&classes, &resources, 6)
            .unwrap();
        assert_eq!(
            read_zip_entries(&bytes),
            vec![
                ("a/B.class".to_owned(), b"\xCA\xFE".to_vec()),
                ("data.txt".to_owned(), b"12345".to_vec()),
            ]
        );
    }

    #[test]
    fn test_class_marker_is_appended() {
        let classes = collection(vec![Entry::class("shaded/Foo", b"x".as_slice())]);
        let bytes = OutputAssembler::new("out.jar")
            .assemble(&classes, &EntryCollection::new(), 0)
            .unwrap();
        assert_eq!(read_zip_entries(&bytes)[0].0, "shaded/Foo.class");
    }

    #[test]
    fn test_classes_written_before_resources() {
        let classes = collection(vec![Entry::class("z/Z.class", b"z".as_slice())]);
        let resources = collection(vec![Entry::resource("a.txt", b"a".as_slice())]);
        let bytes = OutputAssembler::new("out.jar")
            .assemble(&classes, &resources, 0)
            .unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.by_index(0).unwrap().name(), "z/Z.class");
        assert_eq!(zip.by_index(1).unwrap().name(), "a.txt");
    }

    #[test]
    fn test_resource_without_payload_is_skipped() {
        let resources = collection(vec![
            Entry::resource_without_payload("ghost.txt"),
            Entry::resource("real.txt", b"r".as_slice()),
        ]);
        let bytes = OutputAssembler::new("out.jar")
            .assemble(&EntryCollection::new(), &resources, 0)
            .unwrap();
        let entries = read_zip_entries(&bytes);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "real.txt");
    }

    #[test]
    fn test_class_without_payload_fails() {
        let mut classes = EntryCollection::new();
        classes.insert(
            Entry::resource_without_payload("a/B.class").into_kind(crate::EntryKind::Class),
            CollisionPolicy::IngestFirstWins,
        );
        let err = OutputAssembler::new("out.jar")
            .assemble(&classes, &EntryCollection::new(), 0)
            .unwrap_err();
        assert!(matches!(err, PipelineError::OutputAssemblyFailure { .. }));
        assert_eq!(err.entry_name(), Some("a/B.class"));
    }

    #[test]
    fn test_level_out_of_range_fails() {
        let err = OutputAssembler::new("out.jar")
            .assemble(&EntryCollection::new(), &EntryCollection::new(), 10)
            .unwrap_err();
        assert!(matches!(err, PipelineError::OutputAssemblyFailure { .. }));
        assert!(err.to_string().contains("out.jar"));
    }

    #[test]
    fn test_every_level_is_readable() {
        let resources = collection(vec![Entry::resource("data.txt", b"abcabcabc".as_slice())]);
        let assembler = OutputAssembler::new("out.jar");
        for level in 0..=MAX_LEVEL {
            let bytes = assembler
                .assemble(&EntryCollection::new(), &resources, level)
                .unwrap();
            assert_eq!(
                read_zip_entries(&bytes),
                vec![("data.txt".to_string(), b"abcabcabc".to_vec())],
                "level {level}"
            );
        }
    }

    #[test]
    fn test_stored_vs_deflated() {
        let resources = collection(vec![Entry::resource("big.txt", vec![b'a'; 8192])]);
        let assembler = OutputAssembler::new("out.jar");
        let stored = assembler.assemble(&EntryCollection::new(), &resources, 0).unwrap();
        let deflated = assembler.assemble(&EntryCollection::new(), &resources, 9).unwrap();
        assert!(deflated.len() < stored.len());

        let mut zip = zip::ZipArchive::new(Cursor::new(stored)).unwrap();
        assert_eq!(zip.by_index(0).unwrap().compression(), CompressionMethod::Stored);
        let mut zip = zip::ZipArchive::new(Cursor::new(deflated)).unwrap();
        assert_eq!(zip.by_index(0).unwrap().compression(), CompressionMethod::Deflated);
    }

    #[test]
    fn test_output_is_deterministic() {
        let classes = collection(vec![
            Entry::class("b/B.class", b"b".as_slice()),
            Entry::class("a/A.class", b"a".as_slice()),
        ]);
        let resources = collection(vec![
            Entry::resource("y.txt", b"y".as_slice()),
            Entry::resource("x.txt", b"x".as_slice()),
        ]);
        let assembler = OutputAssembler::new("out.jar");
        let first = assembler.assemble(&classes, &resources, 5).unwrap();
        let second = assembler.assemble(&classes, &resources, 5).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_output_file_write_to() {
        let temp = TempDir::new().unwrap();
        let generation = Arc::new(Generation::new(
            collection(vec![Entry::class("A.class", b"a".as_slice())]),
            EntryCollection::new(),
        ));
        let output = OutputFile::new("out.jar", generation);
        assert_eq!(output.file_name(), "out.jar");

        let path = temp.path().join("out.jar");
        let written = output.write_to(&path, 6).unwrap();
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk.len() as u64, written);
        assert_eq!(read_zip_entries(&on_disk)[0].0, "A.class");
    }

    #[test]
    fn test_output_file_from_archive() {
        let mut archive = Archive::new(
            "app.jar",
            collection(vec![Entry::class("A.class", b"a".as_slice())]),
            EntryCollection::new(),
        );
        let output = OutputFile::from_archive(&archive).unwrap();
        assert_eq!(output.file_name(), "app.jar");
        assert_eq!(output.generation().entry_count(), 1);

        archive.close();
        assert!(OutputFile::from_archive(&archive).is_none());
        // The captured generation outlives the close.
        assert_eq!(output.generation().entry_count(), 1);
    }

    #[test]
    fn test_output_file_failure_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let output = OutputFile::new("out.jar", Arc::new(Generation::default()));
        let path = temp.path().join("out.jar");
        assert!(output.write_to(&path, 42).is_err());
        assert!(!path.exists());
    }
}
