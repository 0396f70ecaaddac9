//! Question/answer record extraction from FAQ-style XLSX workbooks.
//!
//! Each worksheet holds a table whose records span several vertically merged rows, with
//! pictures floating over some of those rows. The pipeline reads the workbook twice: once at
//! the Open Packaging Convention layer to follow relationship files from sheets to drawings to
//! media parts, and once through `calamine` for the cell values. Rows are then melted into one
//! group per record and each group picks up the pictures anchored on any of its rows.

pub mod anchor;
pub mod assemble;
pub mod cli;
pub mod column;
pub mod config;
pub mod error;
pub mod graph;
pub mod images;
pub mod melt;
pub mod openxml;
pub mod output;
pub mod package;
pub mod table;
pub mod workbook;

use std::fs;
use std::path::{Path, PathBuf};

pub use anchor::{scan_images, AnchoredImage, ImageScan};
pub use assemble::{assemble, Assembly, QaRecord};
pub use config::{ColumnLabels, ExtractOptions};
pub use error::{ExtractError, StructuralError};
pub use graph::{EdgeKind, RelKey, RelationshipGap, RelationshipGraph};
pub use images::{ImageIndex, ImageRegistry, RowKey};
pub use melt::{melt_rows, MergeGroup};
pub use output::RecordWriter;
pub use package::XlsxPackage;
pub use table::{read_rows, Cell, RawRow};

/// Outcome of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub records: usize,
    pub images: usize,
    /// Image rows that no record claimed.
    pub orphans: Vec<RowKey>,
    /// Record files, in write order.
    pub written: Vec<PathBuf>,
    /// Record files replaced by a later record with the same sheet and sequence number.
    pub overwritten: Vec<PathBuf>,
}

/// Extract every record of the workbook at `path` into the configured directories.
///
/// Output file names are prefixed with the workbook's file stem.
pub fn extract(path: &Path, options: &ExtractOptions) -> Result<ExtractSummary, ExtractError> {
    let bytes = fs::read(path).map_err(|err| ExtractError::filesystem(path, err))?;
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    extract_records(&bytes, &stem, options)
}

/// Same as [`extract`] for a workbook already in memory.
pub fn extract_records(
    bytes: &[u8],
    source_stem: &str,
    options: &ExtractOptions,
) -> Result<ExtractSummary, ExtractError> {
    let package = XlsxPackage::from_bytes(bytes)?;
    let graph = RelationshipGraph::build(&package)?;
    let scan = scan_images(&package, &graph);
    log::debug!("found {} anchored image(s)", scan.len());

    let rows = read_rows(bytes, &options.labels)?;

    fs::create_dir_all(&options.output_dir)
        .map_err(|err| ExtractError::filesystem(&options.output_dir, err))?;
    let registry = ImageRegistry::new(&options.image_dir)?;
    let index = registry.persist(&scan, &package)?;

    let groups = melt_rows(&rows)?;
    let Assembly { records, orphans } = assemble(groups, &index);

    let mut writer = RecordWriter::new(&options.output_dir, source_stem, options.labels.clone());
    let written = records
        .iter()
        .map(|record| writer.write(record))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ExtractSummary {
        records: records.len(),
        images: index.image_count(),
        orphans,
        written,
        overwritten: writer.overwritten().to_vec(),
    })
}
