//! Archive ingestion.
//!
//! The reader loads a ZIP-structured file into memory, then decodes its
//! entries on the worker pool. A failure on one entry drops that entry and is
//! recorded in the [`ReadReport`]; a failure to open the archive itself is
//! fatal.
//!
//! Names that occur more than once in the central directory are decoded from
//! their raw records, so every copy is seen and the first one that decodes is
//! kept.

use std::collections::HashSet;
use std::io::Cursor;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;
use tracing::warn;
use zip::ZipArchive;

use crate::PipelineConfig;
use crate::PipelineError;
use crate::Result;
use crate::central_directory;
use crate::central_directory::CentralRecord;
use crate::config::has_jar_extension;
use crate::report::ReadReport;
use crate::types::Archive;
use crate::types::CollisionPolicy;
use crate::types::Entry;
use crate::types::EntryCollection;
use crate::types::EntryKind;
use crate::types::InsertOutcome;

/// Upper bound on the buffer preallocated from an entry's declared size.
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

type SharedZip = ZipArchive<Cursor<Arc<[u8]>>>;

/// Outcome of decoding one central-directory record.
enum Decoded {
    Directory,
    Entry(Entry),
    Failed(PipelineError),
}

/// One unit of decode work.
enum Job<'a> {
    /// An entry `ZipArchive` resolves on its own.
    Indexed(usize),
    /// One copy of a repeated name.
    Raw(&'a CentralRecord),
}

/// Reads archives into memory.
///
/// # Examples
///
/// ```no_run
/// use jarpipe_core::ArchiveReader;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let reader = ArchiveReader::new()?;
/// let (archive, report) = reader.read("libs/app.jar")?;
/// println!(
///     "{}: {} classes, {} resources, {} dropped",
///     archive.source_name().unwrap_or_default(),
///     report.classes,
///     report.resources,
///     report.failures.len()
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ArchiveReader {
    config: PipelineConfig,
    pool: rayon::ThreadPool,
}

impl ArchiveReader {
    /// Creates a reader with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(PipelineConfig::default())
    }

    /// Creates a reader with a custom configuration.
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        let pool = config.build_pool()?;
        Ok(Self { config, pool })
    }

    /// Returns the reader configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Reads the archive at `path`.
    ///
    /// The archive is registered under its file name.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NullArgument`] if `path` is empty.
    /// - [`PipelineError::InvalidArchiveFormat`] if the path does not denote a
    ///   readable, ZIP-structured regular file (or lacks the `.jar` extension
    ///   when the configuration requires it).
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<(Archive, ReadReport)> {
        let path = path.as_ref();
        check_input_path(path, &self.config)?;

        let data =
            std::fs::read(path).map_err(|e| PipelineError::invalid_archive(path, e.to_string()))?;
        let source_name = source_name_of(path);
        self.decode(&source_name, path, Arc::from(data))
    }

    /// Reads an archive that is already in memory, registering it as
    /// `source_name`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidArchiveFormat`] if `data` is not a ZIP archive.
    pub fn read_bytes(
        &self,
        source_name: &str,
        data: impl Into<Arc<[u8]>>,
    ) -> Result<(Archive, ReadReport)> {
        if source_name.is_empty() {
            return Err(PipelineError::NullArgument {
                argument: "source_name",
            });
        }
        self.decode(source_name, Path::new(source_name), data.into())
    }

    fn decode(
        &self,
        source_name: &str,
        path: &Path,
        data: Arc<[u8]>,
    ) -> Result<(Archive, ReadReport)> {
        let start = Instant::now();
        let zip = ZipArchive::new(Cursor::new(Arc::clone(&data))).map_err(|e| {
            PipelineError::invalid_archive(path, format!("failed to open ZIP archive: {e}"))
        })?;
        let count = zip.len();

        let repeated = central_directory::repeated_records(&data);
        let jobs: Vec<Job<'_>> = if repeated.is_empty() {
            (0..count).map(Job::Indexed).collect()
        } else {
            // Every copy of a repeated name comes first, in directory order.
            // `ZipArchive` only knows the last copy, so its index is skipped.
            let names: HashSet<&str> = repeated.iter().map(|r| r.name.as_str()).collect();
            repeated
                .iter()
                .map(Job::Raw)
                .chain(
                    (0..count)
                        .filter(|&i| zip.name_for_index(i).is_none_or(|n| !names.contains(n)))
                        .map(Job::Indexed),
                )
                .collect()
        };
        debug!(
            archive = %source_name,
            entries = jobs.len(),
            repeated = repeated.len(),
            "decoding archive"
        );

        // Results come back in job order regardless of which worker decoded
        // them, so first-wins below is deterministic.
        let decoded: Vec<Decoded> = self.pool.install(|| {
            jobs.into_par_iter()
                .map_init(
                    || zip.clone(),
                    |zip, job| match job {
                        Job::Indexed(index) => decode_entry(zip, index, source_name),
                        Job::Raw(record) => decode_record(&data, record, source_name),
                    },
                )
                .collect()
        });

        let mut report = ReadReport::new();
        let mut classes = EntryCollection::with_capacity(count);
        let mut resources = EntryCollection::new();

        for outcome in decoded {
            match outcome {
                Decoded::Directory => report.directories_skipped += 1,
                Decoded::Failed(err) => {
                    warn!(archive = %source_name, error = %err, "dropping entry that failed to decode");
                    report.failures.push(err);
                }
                Decoded::Entry(entry) => {
                    let size = entry.bytes().len() as u64;
                    let target = match entry.kind() {
                        EntryKind::Class => &mut classes,
                        EntryKind::Resource => &mut resources,
                    };
                    match target.insert(entry, CollisionPolicy::IngestFirstWins) {
                        InsertOutcome::Discarded => report.duplicates_discarded += 1,
                        InsertOutcome::Inserted | InsertOutcome::Replaced => {
                            report.bytes_read += size;
                        }
                    }
                }
            }
        }

        report.classes = classes.len();
        report.resources = resources.len();
        report.duration = start.elapsed();
        debug!(
            archive = %source_name,
            classes = report.classes,
            resources = report.resources,
            failures = report.failures.len(),
            "archive decoded"
        );

        Ok((Archive::new(source_name, classes, resources), report))
    }
}

/// Validates an input path before anything is read from it.
pub(crate) fn check_input_path(path: &Path, config: &PipelineConfig) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(PipelineError::NullArgument { argument: "path" });
    }
    if config.require_jar_extension && !has_jar_extension(path) {
        return Err(PipelineError::invalid_archive(
            path,
            "file name does not end in .jar",
        ));
    }
    let metadata =
        std::fs::metadata(path).map_err(|e| PipelineError::invalid_archive(path, e.to_string()))?;
    if !metadata.is_file() {
        return Err(PipelineError::invalid_archive(path, "not a regular file"));
    }
    Ok(())
}

/// The registry name of an archive: its file name.
pub(crate) fn source_name_of(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn decode_entry(zip: &mut SharedZip, index: usize, source_name: &str) -> Decoded {
    let name = zip
        .name_for_index(index)
        .map_or_else(|| format!("<entry #{index}>"), str::to_owned);
    if name.ends_with('/') {
        return Decoded::Directory;
    }

    let failure = |source: std::io::Error| {
        Decoded::Failed(PipelineError::EntryDecodeFailure {
            archive: source_name.to_owned(),
            entry: name.clone(),
            source,
        })
    };

    let mut file = match zip.by_index(index) {
        Ok(file) => file,
        Err(e) => return failure(std::io::Error::other(e)),
    };
    if file.is_dir() {
        return Decoded::Directory;
    }

    let capacity = usize::try_from(file.size())
        .unwrap_or(MAX_PREALLOCATION)
        .min(MAX_PREALLOCATION);
    let mut data = Vec::with_capacity(capacity);
    if let Err(e) = file.read_to_end(&mut data) {
        return failure(e);
    }
    drop(file);

    let kind = EntryKind::classify(&name);
    Decoded::Entry(Entry::new(name, data, kind))
}

fn decode_record(data: &[u8], record: &CentralRecord, source_name: &str) -> Decoded {
    if record.name.ends_with('/') {
        return Decoded::Directory;
    }
    match central_directory::read_record(data, record) {
        Ok(bytes) => {
            let kind = EntryKind::classify(&record.name);
            Decoded::Entry(Entry::new(record.name.clone(), bytes, kind))
        }
        Err(source) => Decoded::Failed(PipelineError::EntryDecodeFailure {
            archive: source_name.to_owned(),
            entry: record.name.clone(),
            source,
        }),
    }
}
