use std::path::PathBuf;

use thiserror::Error;

/// Fatal problems with the package layout or its XML.
///
/// Only parts that the run cannot proceed without (the workbook and its relationship file)
/// surface these; optional parts that fail to parse are treated as absent.
#[derive(Debug, Error)]
pub enum StructuralError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing xlsx part: {0}")]
    MissingPart(String),
    #[error("xml error in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: quick_xml::Error,
    },
    #[error("xml attribute error in {part}: {source}")]
    XmlAttr {
        part: String,
        #[source]
        source: quick_xml::events::attributes::AttrError,
    },
    #[error("{part} is not valid utf-8")]
    NonUtf8 { part: String },
    #[error("missing required attribute `{attr}` in {part}")]
    MissingAttr { part: String, attr: &'static str },
    #[error(
        "xlsx package part is too large to load safely: {part} is {size} bytes (max {max} bytes)"
    )]
    PartTooLarge { part: String, size: u64, max: u64 },
    #[error("sheet `{sheet}` has no `{label}` column in its header row")]
    MissingColumn { sheet: String, label: String },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(
        "sheet `{sheet}` row {row}: first data row has a blank classification cell, \
         so there is no group to continue"
    )]
    GroupBoundary { sheet: String, row: u32 },
    #[error("sheet `{sheet}` row {row}: sequence number {value:?} is not an integer")]
    TypeCoercion {
        sheet: String,
        row: u32,
        value: String,
    },
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read worksheet table: {0}")]
    Table(#[from] calamine::XlsxError),
    #[error("failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
