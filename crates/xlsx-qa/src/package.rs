//! In-memory view of an XLSX (Open Packaging Convention) ZIP archive.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};

use zip::ZipArchive;

use crate::error::StructuralError;

/// Maximum uncompressed size permitted for any single part inflated into memory.
///
/// ZIP metadata is untrusted and can advertise arbitrary sizes, so the limit is enforced on the
/// bytes actually read rather than on `ZipFile::size()`.
pub(crate) const MAX_PART_BYTES: u64 = 256 * 1024 * 1024; // 256MiB

/// Every non-directory entry of an XLSX archive, keyed by canonical part name.
///
/// The archive is read once and dropped before this value is returned, so callers never hold an
/// open handle while writing output.
#[derive(Debug, Clone, Default)]
pub struct XlsxPackage {
    parts: BTreeMap<String, Vec<u8>>,
}

impl XlsxPackage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StructuralError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        Self::read_zip(&mut zip)
    }

    fn read_zip<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Self, StructuralError> {
        let mut parts = BTreeMap::new();
        for i in 0..zip.len() {
            let file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = canonical_part_name(file.name());

            let mut buf = Vec::new();
            file.take(MAX_PART_BYTES + 1).read_to_end(&mut buf)?;
            let size = buf.len() as u64;
            if size > MAX_PART_BYTES {
                return Err(StructuralError::PartTooLarge {
                    part: name,
                    size,
                    max: MAX_PART_BYTES,
                });
            }

            if parts.insert(name.clone(), buf).is_some() {
                log::warn!("duplicate zip entry {name}; keeping the last occurrence");
            }
        }
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .get(name.strip_prefix('/').unwrap_or(name))
            .map(Vec::as_slice)
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    /// Like [`XlsxPackage::part`], but a missing part is a structural error.
    pub fn required_part(&self, name: &str) -> Result<&[u8], StructuralError> {
        self.part(name)
            .ok_or_else(|| StructuralError::MissingPart(name.to_string()))
    }
}

/// ZIP entry names in valid packages should not start with `/` or use `\`, but tolerate
/// producers that do.
fn canonical_part_name(name: &str) -> String {
    name.trim_start_matches(|c| c == '/' || c == '\\').replace('\\', "/")
}
