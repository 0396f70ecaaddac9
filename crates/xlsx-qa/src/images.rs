//! Persists anchored pictures and indexes them by `(sheet, row)`.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::anchor::{AnchoredImage, ImageScan};
use crate::error::{ExtractError, StructuralError};
use crate::package::XlsxPackage;

/// `(sheet name, 1-based worksheet row)`.
pub type RowKey = (String, u32);

/// Saved image paths per anchor row.
///
/// Keys iterate in first-insertion order and paths within a key in append order, which is the
/// anchor scan order. Nothing is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageIndex {
    entries: Vec<(RowKey, Vec<String>)>,
    positions: HashMap<RowKey, usize>,
}

impl ImageIndex {
    pub fn push(&mut self, sheet_name: &str, row: u32, path: String) {
        let key = (sheet_name.to_string(), row);
        match self.positions.get(&key) {
            Some(&idx) => self.entries[idx].1.push(path),
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, vec![path]));
            }
        }
    }

    pub fn get(&self, sheet_name: &str, row: u32) -> Option<&[String]> {
        self.positions
            .get(&(sheet_name.to_string(), row))
            .map(|&idx| self.entries[idx].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RowKey, &[String])> {
        self.entries
            .iter()
            .map(|(key, paths)| (key, paths.as_slice()))
    }

    /// Number of saved images (not rows).
    pub fn image_count(&self) -> usize {
        self.entries.iter().map(|(_, paths)| paths.len()).sum()
    }
}

/// Writes pictures into one output directory.
#[derive(Debug, Clone)]
pub struct ImageRegistry {
    image_dir: PathBuf,
}

impl ImageRegistry {
    /// Creates `image_dir` (and parents) if needed.
    pub fn new(image_dir: impl Into<PathBuf>) -> Result<Self, ExtractError> {
        let image_dir = image_dir.into();
        fs::create_dir_all(&image_dir)
            .map_err(|err| ExtractError::filesystem(&image_dir, err))?;
        Ok(Self { image_dir })
    }

    /// Save one file per scanned anchor and index the saved paths.
    ///
    /// The same media part anchored twice is written twice under two names. Re-running over an
    /// unchanged archive overwrites the same files with the same bytes.
    pub fn persist(
        &self,
        scan: &ImageScan,
        package: &XlsxPackage,
    ) -> Result<ImageIndex, ExtractError> {
        let mut index = ImageIndex::default();
        for image in &scan.images {
            let bytes = package
                .part(&image.media_part)
                .ok_or_else(|| StructuralError::MissingPart(image.media_part.clone()))?;
            self.register(&mut index, image, bytes)?;
        }
        Ok(index)
    }

    /// Write one picture as `{sheet}_{cell}_{file}` and append its path under the anchor row.
    pub fn register(
        &self,
        index: &mut ImageIndex,
        image: &AnchoredImage,
        bytes: &[u8],
    ) -> Result<PathBuf, ExtractError> {
        let save_name = image.save_name();
        let path = self.image_dir.join(&save_name);
        fs::write(&path, bytes).map_err(|err| ExtractError::filesystem(&path, err))?;
        log::info!("saved image {save_name}");
        index.push(&image.sheet_name, image.row, path.display().to_string());
        Ok(path)
    }
}
