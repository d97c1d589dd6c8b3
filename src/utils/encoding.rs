//! Source decoding with BOM handling and a detected-encoding fallback.
//!
//! Strict UTF-8 is tried first. Anything else goes through chardetng and is
//! decoded with replacement characters.

use crate::error::Result;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const DEFAULT_SAMPLE_SIZE: usize = 8192;

/// Detect if a file is binary (not text).
///
/// A UTF-16 BOM marks it text. Otherwise a null byte in the sample, or fewer
/// than 70% printable bytes, marks it binary.
/// Unreadable files count as binary so the scanner skips them.
pub fn is_binary_file(path: &Path, sample_size: usize) -> bool {
    is_binary_file_impl(path, sample_size).unwrap_or(true)
}

fn is_binary_file_impl(path: &Path, sample_size: usize) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let mut sample = vec![0u8; sample_size];
    let bytes_read = file.read(&mut sample)?;
    sample.truncate(bytes_read);

    if sample.is_empty() {
        return Ok(false);
    }
    if has_utf16_bom(&sample) {
        return Ok(false);
    }
    if sample.contains(&0) {
        return Ok(true);
    }

    let printable = sample
        .iter()
        .filter(|&&b| (32..=126).contains(&b) || b == 9 || b == 10 || b == 13 || b >= 0x80)
        .count();
    Ok((printable as f64 / sample.len() as f64) < 0.70)
}

fn has_utf16_bom(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xff, 0xfe]) || bytes.starts_with(&[0xfe, 0xff])
}

/// Read a file as text, returning `(content, encoding_label)`.
pub fn read_file_safe(path: &Path) -> Result<(String, String)> {
    let bytes = std::fs::read(path)?;
    Ok(decode_bytes(&bytes))
}

fn decode_bytes(bytes: &[u8]) -> (String, String) {
    if let Some(rest) = bytes.strip_prefix(&[0xef, 0xbb, 0xbf]) {
        let (text, _) = UTF_8.decode_without_bom_handling(rest);
        return (text.into_owned(), "utf-8-sig".to_string());
    }
    if let Some(rest) = bytes.strip_prefix(&[0xff, 0xfe]) {
        let (text, _) = UTF_16LE.decode_without_bom_handling(rest);
        return (text.into_owned(), "utf-16le".to_string());
    }
    if let Some(rest) = bytes.strip_prefix(&[0xfe, 0xff]) {
        let (text, _) = UTF_16BE.decode_without_bom_handling(rest);
        return (text.into_owned(), "utf-16be".to_string());
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), "utf-8".to_string());
    }

    let encoding = detect_encoding(bytes);
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    tracing::debug!(encoding = encoding.name(), "decoded non-UTF-8 source");
    (text.into_owned(), encoding.name().to_lowercase())
}

fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let sample = &bytes[..bytes.len().min(DEFAULT_SAMPLE_SIZE)];
    let mut detector = EncodingDetector::new();
    detector.feed(sample, sample.len() == bytes.len());
    detector.guess(None, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_utf8() {
        let file = temp_with("String s = \"caf\u{e9} 🚀\";".as_bytes());
        let (content, encoding) = read_file_safe(file.path()).unwrap();
        assert_eq!(content, "String s = \"caf\u{e9} 🚀\";");
        assert_eq!(encoding, "utf-8");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice(b"class A {}");
        let (content, encoding) = read_file_safe(temp_with(&bytes).path()).unwrap();
        assert_eq!(content, "class A {}");
        assert_eq!(encoding, "utf-8-sig");
    }

    #[test]
    fn test_utf16_le_bom() {
        let mut bytes = vec![0xff, 0xfe];
        for unit in "int x;".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let file = temp_with(&bytes);
        assert!(!is_binary_file(file.path(), DEFAULT_SAMPLE_SIZE));
        let (content, _) = read_file_safe(file.path()).unwrap();
        assert_eq!(content, "int x;");
    }

    #[test]
    fn test_latin1_fallback() {
        let file = temp_with(b"// r\xe9sum\xe9 of the caf\xe9 menu items\nclass Menu {}");
        let (content, encoding) = read_file_safe(file.path()).unwrap();
        assert!(content.contains("class Menu {}"));
        assert_ne!(encoding, "utf-8");
    }

    #[test]
    fn test_is_binary_null_byte() {
        assert!(is_binary_file(temp_with(&[0x00, 0x01, 0x02]).path(), DEFAULT_SAMPLE_SIZE));
        assert!(!is_binary_file(temp_with(b"Normal text file").path(), DEFAULT_SAMPLE_SIZE));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_file_safe(Path::new("/definitely/not/here.java")).unwrap_err();
        assert!(matches!(err, crate::error::LocalizeError::Io(_)));
    }
}
