//! Single-entry lookup without reading the whole archive.

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::PipelineConfig;
use crate::PipelineError;
use crate::Result;
use crate::reader::check_input_path;
use crate::reader::source_name_of;
use crate::types::Entry;
use crate::types::EntryKind;

/// Reads the entry called `entry_name` from the archive at `path`.
///
/// Only that entry is decompressed. Returns `Ok(None)` if the archive has no
/// such file entry.
///
/// # Errors
///
/// - [`PipelineError::InvalidArchiveFormat`] if `path` is missing or not a ZIP
///   archive.
/// - [`PipelineError::EntryDecodeFailure`] if the entry exists but cannot be
///   decoded.
///
/// # Examples
///
/// ```no_run
/// use jarpipe_core::find_entry;
///
/// # fn main() -> Result<(), jarpipe_core::PipelineError> {
/// if let Some(entry) = find_entry("app.jar", "META-INF/MANIFEST.MF")? {
///     println!("{}", String::from_utf8_lossy(entry.bytes()));
/// }
/// # Ok(())
/// # }
/// ```
pub fn find_entry<P: AsRef<Path>>(path: P, entry_name: &str) -> Result<Option<Entry>> {
    let path = path.as_ref();
    if entry_name.is_empty() {
        return Err(PipelineError::NullArgument {
            argument: "entry_name",
        });
    }
    check_input_path(path, &PipelineConfig::default())?;

    let file = File::open(path).map_err(|e| PipelineError::invalid_archive(path, e.to_string()))?;
    let mut zip = ZipArchive::new(BufReader::new(file))
        .map_err(|e| PipelineError::invalid_archive(path, e.to_string()))?;

    let decode_failure = |source: std::io::Error| PipelineError::EntryDecodeFailure {
        archive: source_name_of(path),
        entry: entry_name.to_owned(),
        source,
    };

    let mut file = match zip.by_name(entry_name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(decode_failure(std::io::Error::other(e))),
    };
    if file.is_dir() {
        return Ok(None);
    }

    let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0).min(16 << 20));
    file.read_to_end(&mut data).map_err(decode_failure)?;

    Ok(Some(Entry::new(
        entry_name,
        data,
        EntryKind::classify(entry_name),
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::ZipTestBuilder;
    use crate::test_utils::corrupt_payload;
    use crate::test_utils::create_test_zip;
    use tempfile::TempDir;

    fn write(temp: &TempDir, name: &str, data: Vec<u8>) -> std::path::PathBuf {
        let path = temp.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_find_existing_entry() {
        let temp = TempDir::new().unwrap();
        let path = write(
            &temp,
            "app.jar",
            ZipTestBuilder::new()
                .add_manifest(Some("app.Main"))
                .add_deflated("a/B.class", b"cafebabe")
                .build(),
        );

        let entry = find_entry(&path, "a/B.class").unwrap().unwrap();
        assert_eq!(entry.bytes(), b"cafebabe");
        assert_eq!(entry.kind(), EntryKind::Class);

        let manifest = find_entry(&path, "META-INF/MANIFEST.MF").unwrap().unwrap();
        assert_eq!(manifest.kind(), EntryKind::Resource);
    }

    #[test]
    fn test_unknown_entry_is_none() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "app.jar", create_test_zip(vec![("a.txt", b"a")]));
        assert!(find_entry(&path, "b.txt").unwrap().is_none());
    }

    #[test]
    fn test_directory_entry_is_none() {
        let temp = TempDir::new().unwrap();
        let path = write(
            &temp,
            "app.jar",
            ZipTestBuilder::new().add_directory("com/").build(),
        );
        assert!(find_entry(&path, "com/").unwrap().is_none());
    }

    #[test]
    fn test_missing_or_invalid_archive() {
        let temp = TempDir::new().unwrap();
        let err = find_entry(temp.path().join("missing.jar"), "a.txt").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArchiveFormat { .. }));

        let path = write(&temp, "junk.jar", b"definitely not a zip".to_vec());
        let err = find_entry(&path, "a.txt").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArchiveFormat { .. }));
    }

    #[test]
    fn test_corrupted_entry_fails() {
        let temp = TempDir::new().unwrap();
        let jar = create_test_zip(vec![("bad.txt", b"CORRUPTED-PAYLOAD-1234")]);
        let path = write(&temp, "app.jar", corrupt_payload(jar, b"CORRUPTED-PAYLOAD-1234"));
        let err = find_entry(&path, "bad.txt").unwrap_err();
        assert!(matches!(err, PipelineError::EntryDecodeFailure { .. }));
    }

    #[test]
    fn test_empty_entry_name() {
        let err = find_entry("app.jar", "").unwrap_err();
        assert!(matches!(err, PipelineError::NullArgument { .. }));
    }
}
