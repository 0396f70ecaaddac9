//! JSON record files.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::assemble::QaRecord;
use crate::config::ColumnLabels;
use crate::error::ExtractError;

pub const IMAGE_URLS_KEY: &str = "image_urls";

/// Writes one pretty-printed JSON file per record.
#[derive(Debug, Clone)]
pub struct RecordWriter {
    output_dir: PathBuf,
    source_stem: String,
    labels: ColumnLabels,
    written: HashSet<PathBuf>,
    overwritten: Vec<PathBuf>,
}

impl RecordWriter {
    /// `source_stem` is the input workbook's file name without extension; it prefixes every
    /// output file name.
    pub fn new(
        output_dir: impl Into<PathBuf>,
        source_stem: impl Into<String>,
        labels: ColumnLabels,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            source_stem: source_stem.into(),
            labels,
            written: HashSet::new(),
            overwritten: Vec::new(),
        }
    }

    /// `{source_stem}_{sheet}_QA_{number}.json`
    pub fn file_name(&self, record: &QaRecord) -> String {
        format!(
            "{}_{}_QA_{}.json",
            self.source_stem, record.sheet_name, record.number
        )
    }

    /// Render `record` as the bytes written to disk.
    pub fn render(&self, record: &QaRecord) -> Result<Vec<u8>, ExtractError> {
        Ok(serde_json::to_vec_pretty(&LabeledRecord {
            labels: &self.labels,
            record,
        })?)
    }

    /// Two records sharing a sheet and sequence number map to the same file; the later one
    /// replaces the earlier and the path is reported by [`RecordWriter::overwritten`].
    pub fn write(&mut self, record: &QaRecord) -> Result<PathBuf, ExtractError> {
        let bytes = self.render(record)?;
        let path = self.output_dir.join(self.file_name(record));
        fs::write(&path, bytes).map_err(|err| ExtractError::filesystem(&path, err))?;
        if self.written.insert(path.clone()) {
            log::info!("wrote record {}", path.display());
        } else {
            log::warn!(
                "sheet `{}` has more than one record numbered {}; {} was overwritten",
                record.sheet_name,
                record.number,
                path.display()
            );
            self.overwritten.push(path.clone());
        }
        Ok(path)
    }

    /// Paths written more than once during this writer's lifetime, once per repeat.
    pub fn overwritten(&self) -> &[PathBuf] {
        &self.overwritten
    }
}

/// A record keyed by the configured header labels, in column order.
struct LabeledRecord<'a> {
    labels: &'a ColumnLabels,
    record: &'a QaRecord,
}

impl Serialize for LabeledRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let labels = self.labels;
        let record = self.record;
        let mut map = serializer.serialize_map(Some(7))?;
        map.serialize_entry(&labels.sheet, &record.sheet_name)?;
        map.serialize_entry(&labels.classification, &record.classification)?;
        map.serialize_entry(&labels.item, &record.item)?;
        map.serialize_entry(&labels.number, &record.number)?;
        map.serialize_entry(&labels.question, &record.question)?;
        map.serialize_entry(&labels.answer, &record.answer)?;
        map.serialize_entry(IMAGE_URLS_KEY, &record.images)?;
        map.end()
    }
}
