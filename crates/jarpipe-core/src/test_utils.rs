//! Test utilities for building in-memory JAR archives.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Cursor;
use std::io::Write;

use zip::write::SimpleFileOptions;
use zip::write::ZipWriter;

/// Creates an in-memory ZIP archive from a list of entries.
///
/// Each entry is a tuple of (name, content). Entries are stored uncompressed.
///
/// # Examples
///
/// ```
/// use jarpipe_core::test_utils::create_test_zip;
///
/// let jar = create_test_zip(vec![("a/B.class", b"cafebabe"), ("data.txt", b"hello")]);
/// assert!(!jar.is_empty());
/// ```
#[must_use]
pub fn create_test_zip(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    entries
        .into_iter()
        .fold(ZipTestBuilder::new(), |builder, (name, data)| {
            builder.add_file(name, data)
        })
        .build()
}

/// Renders a minimal manifest, optionally declaring a main class.
///
/// # Examples
///
/// ```
/// use jarpipe_core::test_utils::manifest;
///
/// let mf = manifest(Some("app.Main"));
/// assert!(String::from_utf8(mf).unwrap().contains("Main-Class: app.Main"));
/// ```
#[must_use]
pub fn manifest(main_class: Option<&str>) -> Vec<u8> {
    let mut text = String::from("Manifest-Version: 1.0\r\nCreated-By: jarpipe tests\r\n");
    if let Some(main_class) = main_class {
        text.push_str("Main-Class: ");
        text.push_str(main_class);
        text.push_str("\r\n");
    }
    text.push_str("\r\n");
    text.into_bytes()
}

/// Flips one byte of the first occurrence of `needle` inside `archive`.
///
/// Used to corrupt a stored entry's data so that its CRC check fails while
/// the archive structure stays readable.
#[must_use]
pub fn corrupt_payload(mut archive: Vec<u8>, needle: &[u8]) -> Vec<u8> {
    let position = archive
        .windows(needle.len())
        .position(|window| window == needle)
        .unwrap();
    archive[position] ^= 0xFF;
    archive
}

/// Rewrites every occurrence of the entry name `from` to `to`.
///
/// Both names must have the same length. Patching the local and central
/// headers this way produces archives with repeated names, which
/// `ZipWriter` refuses to write.
#[must_use]
pub fn rename_entry(mut archive: Vec<u8>, from: &str, to: &str) -> Vec<u8> {
    assert_eq!(from.len(), to.len(), "names must have the same length");
    let (from, to) = (from.as_bytes(), to.as_bytes());
    let mut at = 0;
    while let Some(offset) = archive[at..]
        .windows(from.len())
        .position(|window| window == from)
    {
        let start = at + offset;
        archive[start..start + to.len()].copy_from_slice(to);
        at = start + to.len();
    }
    archive
}

/// Builder for ZIP test archives.
///
/// # Examples
///
/// ```
/// use jarpipe_core::test_utils::ZipTestBuilder;
///
/// let jar = ZipTestBuilder::new()
///     .add_directory("com/")
///     .add_file("com/x/Y.class", b"\xCA\xFE\xBA\xBE")
///     .add_deflated("big.txt", &[b'a'; 4096])
///     .build();
/// assert!(!jar.is_empty());
/// ```
pub struct ZipTestBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipTestBuilder {
    /// Creates a new ZIP test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Adds a stored file.
    #[must_use]
    pub fn add_file(mut self, name: &str, data: &[u8]) -> Self {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        self.writer.start_file(name, options).unwrap();
        self.writer.write_all(data).unwrap();
        self
    }

    /// Adds a deflated file.
    #[must_use]
    pub fn add_deflated(mut self, name: &str, data: &[u8]) -> Self {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        self.writer.start_file(name, options).unwrap();
        self.writer.write_all(data).unwrap();
        self
    }

    /// Adds a directory marker.
    #[must_use]
    pub fn add_directory(mut self, name: &str) -> Self {
        self.writer
            .add_directory(name, SimpleFileOptions::default())
            .unwrap();
        self
    }

    /// Adds `META-INF/MANIFEST.MF`, optionally declaring a main class.
    #[must_use]
    pub fn add_manifest(self, main_class: Option<&str>) -> Self {
        let data = manifest(main_class);
        self.add_file("META-INF/MANIFEST.MF", &data)
    }

    /// Builds the archive and returns its bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.writer.finish().unwrap().into_inner()
    }
}

impl Default for ZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads every file entry of a ZIP archive as `(name, bytes)`, sorted by
/// name.
#[must_use]
pub fn read_zip_entries(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    use std::io::Read;

    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut entries = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let mut file = zip.by_index(index).unwrap();
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        entries.push((file.name().to_owned(), data));
    }
    entries.sort();
    entries
}
