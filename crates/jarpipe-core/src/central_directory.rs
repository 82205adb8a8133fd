//! Raw central-directory records.
//!
//! `ZipArchive` indexes entries by name and keeps a single record per name,
//! the last one. Archives that repeat a name need every record in directory
//! order, so those records are located and decoded here.

use std::collections::HashMap;
use std::io;
use std::io::Read;

use flate2::Crc;
use flate2::read::DeflateDecoder;

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const CENTRAL_SIGNATURE: u32 = 0x0201_4b50;
const LOCAL_SIGNATURE: u32 = 0x0403_4b50;

const EOCD_LEN: usize = 22;
const CENTRAL_LEN: usize = 46;
const LOCAL_LEN: usize = 30;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

const FLAG_ENCRYPTED: u16 = 1;
const FLAG_UTF8: u16 = 1 << 11;

/// Upper bound on the buffer preallocated from a record's declared size.
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// One central-directory file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CentralRecord {
    pub(crate) name: String,
    flags: u16,
    method: u16,
    crc32: u32,
    compressed_size: usize,
    uncompressed_size: usize,
    local_header_offset: usize,
}

/// Records whose name occurs more than once, in directory order.
///
/// Empty when no name repeats, or when the directory cannot be walked here
/// (ZIP64, split archives, non-UTF-8 names); the archive is then read through
/// `ZipArchive` alone.
pub(crate) fn repeated_records(data: &[u8]) -> Vec<CentralRecord> {
    let Some(records) = scan(data) else {
        return Vec::new();
    };

    let mut counts: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    for record in &records {
        *counts.entry(record.name.as_str()).or_default() += 1;
    }
    if counts.values().all(|&n| n == 1) {
        return Vec::new();
    }

    let repeated: Vec<bool> = records
        .iter()
        .map(|r| counts.get(r.name.as_str()).is_some_and(|&n| n > 1))
        .collect();
    records
        .into_iter()
        .zip(repeated)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}

/// Lists every central-directory record in order.
pub(crate) fn scan(data: &[u8]) -> Option<Vec<CentralRecord>> {
    let eocd = find_eocd(data)?;
    if u16_at(data, eocd + 4)? != 0 || u16_at(data, eocd + 6)? != 0 {
        return None;
    }
    let count = u16_at(data, eocd + 10)?;
    let size = u32_at(data, eocd + 12)?;
    let offset = u32_at(data, eocd + 16)?;
    if count == u16::MAX || size == u32::MAX || offset == u32::MAX {
        return None;
    }

    let offset = usize::try_from(offset).ok()?;
    let end = offset.checked_add(usize::try_from(size).ok()?)?;
    // Bytes prepended to the archive shift every stored offset.
    let shift = eocd.checked_sub(end)?;

    let mut at = offset + shift;
    let mut records = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        if u32_at(data, at)? != CENTRAL_SIGNATURE {
            return None;
        }
        let flags = u16_at(data, at + 8)?;
        let method = u16_at(data, at + 10)?;
        let crc32 = u32_at(data, at + 16)?;
        let compressed = u32_at(data, at + 20)?;
        let uncompressed = u32_at(data, at + 24)?;
        let name_len = usize::from(u16_at(data, at + 28)?);
        let extra_len = usize::from(u16_at(data, at + 30)?);
        let comment_len = usize::from(u16_at(data, at + 32)?);
        let local = u32_at(data, at + 42)?;
        if compressed == u32::MAX || uncompressed == u32::MAX || local == u32::MAX {
            return None;
        }

        let name_bytes = data.get(at + CENTRAL_LEN..at + CENTRAL_LEN + name_len)?;
        // Names without the UTF-8 flag are CP437; only ASCII reads the same.
        if flags & FLAG_UTF8 == 0 && !name_bytes.is_ascii() {
            return None;
        }
        let name = std::str::from_utf8(name_bytes).ok()?.to_owned();

        records.push(CentralRecord {
            name,
            flags,
            method,
            crc32,
            compressed_size: usize::try_from(compressed).ok()?,
            uncompressed_size: usize::try_from(uncompressed).ok()?,
            local_header_offset: usize::try_from(local).ok()? + shift,
        });
        at += CENTRAL_LEN + name_len + extra_len + comment_len;
    }
    Some(records)
}

/// Decodes the payload of `record`, checking its size and CRC.
pub(crate) fn read_record(data: &[u8], record: &CentralRecord) -> io::Result<Vec<u8>> {
    if record.flags & FLAG_ENCRYPTED != 0 {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "encrypted entries are not supported",
        ));
    }

    let at = record.local_header_offset;
    if u32_at(data, at) != Some(LOCAL_SIGNATURE) {
        return Err(invalid("missing local file header"));
    }
    let name_len = u16_at(data, at + 26).ok_or_else(|| invalid("truncated local file header"))?;
    let extra_len = u16_at(data, at + 28).ok_or_else(|| invalid("truncated local file header"))?;
    let start = at + LOCAL_LEN + usize::from(name_len) + usize::from(extra_len);
    let raw = data
        .get(start..start + record.compressed_size)
        .ok_or_else(|| invalid("entry data runs past the end of the archive"))?;

    let mut out = Vec::with_capacity(record.uncompressed_size.min(MAX_PREALLOCATION));
    match record.method {
        METHOD_STORED => out.extend_from_slice(raw),
        METHOD_DEFLATED => {
            DeflateDecoder::new(raw).read_to_end(&mut out)?;
        }
        other => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("compression method {other} is not supported"),
            ));
        }
    }

    if out.len() != record.uncompressed_size {
        return Err(invalid("decoded size does not match the directory"));
    }
    let mut crc = Crc::new();
    crc.update(&out);
    if crc.sum() != record.crc32 {
        return Err(invalid("invalid checksum"));
    }
    Ok(out)
}

fn find_eocd(data: &[u8]) -> Option<usize> {
    let last = data.len().checked_sub(EOCD_LEN)?;
    let first = last.saturating_sub(usize::from(u16::MAX));
    (first..=last)
        .rev()
        .find(|&at| u32_at(data, at) == Some(EOCD_SIGNATURE))
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_owned())
}

fn u16_at(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn u32_at(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::ZipTestBuilder;
    use crate::test_utils::corrupt_payload;
    use crate::test_utils::create_test_zip;
    use crate::test_utils::rename_entry;

    #[test]
    fn test_scan_lists_records_in_order() {
        let jar = create_test_zip(vec![("b.txt", b"b"), ("a.txt", b"a")]);
        let names: Vec<_> = scan(&jar).unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
    }

    #[test]
    fn test_scan_handles_prepended_bytes() {
        let mut data = b"#!/bin/sh\nexec java -jar \"$0\"\n".to_vec();
        data.extend(create_test_zip(vec![("a.txt", b"alpha")]));
        let records = scan(&data).unwrap();
        assert_eq!(read_record(&data, &records[0]).unwrap(), b"alpha");
    }

    #[test]
    fn test_scan_rejects_garbage() {
        assert!(scan(b"not a zip").is_none());
        assert!(scan(&[]).is_none());
    }

    #[test]
    fn test_read_record_deflated() {
        let text = b"deflate me deflate me deflate me".repeat(8);
        let jar = ZipTestBuilder::new().add_deflated("d.txt", &text).build();
        let records = scan(&jar).unwrap();
        assert_eq!(read_record(&jar, &records[0]).unwrap(), text);
    }

    #[test]
    fn test_read_record_checks_crc() {
        let jar = create_test_zip(vec![("a.txt", b"PAYLOAD-TO-BREAK")]);
        let jar = corrupt_payload(jar, b"PAYLOAD-TO-BREAK");
        let records = scan(&jar).unwrap();
        let err = read_record(&jar, &records[0]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_repeated_records() {
        let jar = create_test_zip(vec![
            ("aaaa.txt", b"FIRST"),
            ("only.txt", b"x"),
            ("bbbb.txt", b"SECOND"),
        ]);
        assert!(repeated_records(&jar).is_empty());

        let jar = rename_entry(jar, "bbbb.txt", "aaaa.txt");
        let repeated = repeated_records(&jar);
        assert_eq!(repeated.len(), 2);
        assert!(repeated.iter().all(|r| r.name == "aaaa.txt"));
        assert_eq!(read_record(&jar, &repeated[0]).unwrap(), b"FIRST");
        assert_eq!(read_record(&jar, &repeated[1]).unwrap(), b"SECOND");
    }
}
