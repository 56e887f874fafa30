//! xlsx package: an ordered set of named parts in a zip container

use std::io::{Cursor, Read, Write};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{XlsxError, XlsxResult};

/// Worksheet part holding the task rows
pub const SHEET_PART: &str = "xl/worksheets/sheet1.xml";

/// Shared strings part
pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Largest part accepted when reading a package
pub const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

/// In-memory xlsx package. Part order is preserved on write.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XlsxPackage {
    parts: Vec<(String, Vec<u8>)>,
}

impl XlsxPackage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every file entry of a zip archive
    pub fn from_bytes(bytes: &[u8]) -> XlsxResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut package = Self::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = normalize_part_name(file.name());
            if package.contains(&name) {
                return Err(XlsxError::MalformedPackage(format!("duplicate part '{name}'")));
            }
            // The declared size is untrusted; grow the buffer from what is actually read.
            let mut data = Vec::new();
            (&mut file).take(MAX_PART_BYTES + 1).read_to_end(&mut data)?;
            if data.len() as u64 > MAX_PART_BYTES {
                return Err(XlsxError::MalformedPackage(format!(
                    "part '{name}' exceeds {MAX_PART_BYTES} bytes"
                )));
            }
            package.parts.push((name, data));
        }

        debug!(parts = package.parts.len(), bytes = bytes.len(), "read package");
        Ok(package)
    }

    /// Minimal workbook with a header row and no data rows
    pub fn template() -> XlsxResult<Self> {
        crate::template::package()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    pub fn part(&self, name: &str) -> XlsxResult<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
            .ok_or_else(|| XlsxError::MissingPart(name.to_string()))
    }

    /// Part content as text, without a leading byte order mark
    pub fn part_str(&self, name: &str) -> XlsxResult<&str> {
        let text = std::str::from_utf8(self.part(name)?)?;
        Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
    }

    /// Replace a part, or append it when absent
    pub fn set_part(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        let name = normalize_part_name(name);
        let data = data.into();
        match self.parts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = data,
            None => self.parts.push((name, data)),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    /// Write the package as a deflated zip archive
    pub fn to_bytes(&self) -> XlsxResult<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, data) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }

        let bytes = zip.finish()?.into_inner();
        debug!(parts = self.parts.len(), bytes = bytes.len(), "wrote package");
        Ok(bytes)
    }
}

/// Part names are stored without a leading `/` and with forward slashes
fn normalize_part_name(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parts_survive_zip() {
        let mut package = XlsxPackage::new();
        package.set_part("[Content_Types].xml", "<Types/>");
        package.set_part(SHEET_PART, "<worksheet/>");

        let bytes = package.to_bytes().unwrap();
        let reread = XlsxPackage::from_bytes(&bytes).unwrap();

        assert_eq!(reread, package);
        assert_eq!(
            reread.part_names().collect::<Vec<_>>(),
            ["[Content_Types].xml", SHEET_PART]
        );
    }

    #[test]
    fn set_part_replaces_in_place() {
        let mut package = XlsxPackage::new();
        package.set_part("a.xml", "1");
        package.set_part("b.xml", "2");
        package.set_part("a.xml", "3");

        assert_eq!(package.part_names().collect::<Vec<_>>(), ["a.xml", "b.xml"]);
        assert_eq!(package.part_str("a.xml").unwrap(), "3");
    }

    #[test]
    fn missing_part() {
        let err = XlsxPackage::new().part(SHARED_STRINGS_PART).unwrap_err();
        assert!(matches!(err, XlsxError::MissingPart(name) if name == SHARED_STRINGS_PART));
    }

    #[test]
    fn part_str_strips_bom() {
        let mut package = XlsxPackage::new();
        package.set_part("a.xml", "\u{feff}<a/>");
        assert_eq!(package.part_str("a.xml").unwrap(), "<a/>");
    }

    fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn part_names_are_normalized() {
        let bytes = zip_of(&[
            ("/xl/worksheets/sheet1.xml", "<worksheet/>"),
            ("xl\\sharedStrings.xml", "<sst/>"),
        ]);
        let package = XlsxPackage::from_bytes(&bytes).unwrap();

        assert_eq!(package.part_str(SHEET_PART).unwrap(), "<worksheet/>");
        assert_eq!(package.part_str(SHARED_STRINGS_PART).unwrap(), "<sst/>");
    }

    #[test]
    fn duplicate_after_normalization() {
        let bytes = zip_of(&[("/a.xml", "1"), ("a.xml", "2")]);
        let err = XlsxPackage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, XlsxError::MalformedPackage(msg) if msg.contains("a.xml")));
    }

    #[test]
    fn declared_size_is_not_trusted() {
        let mut package = XlsxPackage::new();
        package.set_part(SHEET_PART, "<worksheet/>");
        let mut bytes = package.to_bytes().unwrap();

        // Uncompressed size field of the central directory entry
        let central = bytes
            .windows(4)
            .position(|w| w == b"PK\x01\x02")
            .unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&0xFFFF_FFF0_u32.to_le_bytes());

        // Either the archive is rejected or the real content comes back
        if let Ok(reread) = XlsxPackage::from_bytes(&bytes) {
            assert_eq!(reread.part_str(SHEET_PART).unwrap(), "<worksheet/>");
        }
    }

    #[test]
    fn not_a_zip() {
        let err = XlsxPackage::from_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, XlsxError::Zip(_)));
    }
}
