//! Relationship graph from workbook sheets down to media parts.
//!
//! SpreadsheetML scatters image placement across four independently scoped id tables:
//!
//! - `xl/workbook.xml`: sheet name -> workbook relationship id
//! - `xl/_rels/workbook.xml.rels`: relationship id -> worksheet part
//! - `xl/worksheets/_rels/sheetN.xml.rels`: worksheet part -> drawing part
//! - `xl/drawings/_rels/drawingN.xml.rels`: embed id -> media part
//!
//! Relationship ids such as `rId1` repeat in every one of those files, so every lookup is keyed
//! by [`RelKey`] (owning part + id) and never by a bare id. Each hop returns an explicit
//! [`RelationshipGap`] instead of failing the run; only the workbook part and its relationship
//! part are required.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use thiserror::Error;

use crate::error::StructuralError;
use crate::openxml::{
    parse_relationships, rels_part_name, resolve_target, Relationship, REL_TYPE_DRAWING_SUFFIX,
    REL_TYPE_IMAGE_SUFFIX, REL_TYPE_WORKSHEET_SUFFIX,
};
use crate::package::XlsxPackage;
use crate::workbook::{parse_workbook_sheets, WorkbookSheet, WORKBOOK_PART, WORKBOOK_RELS_PART};

/// A relationship id qualified by the part whose `.rels` file declares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelKey {
    pub owner_part: String,
    pub id: String,
}

impl RelKey {
    pub fn new(owner_part: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            owner_part: owner_part.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for RelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner_part, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Workbook relationship id -> worksheet part.
    SheetOf,
    /// Worksheet part -> drawing part.
    DrawingOf,
    /// Drawing embed id -> media part.
    ImageOf,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::SheetOf => "sheet",
            EdgeKind::DrawingOf => "drawing",
            EdgeKind::ImageOf => "image",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A broken link somewhere in the chain. Gaps mean "no images here", never a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelationshipGap {
    #[error("workbook has no sheet named `{0}`")]
    UnknownSheet(String),
    #[error("{kind} relationship {key} is not declared")]
    MissingEdge { kind: EdgeKind, key: RelKey },
    #[error("{sheet_part} has no drawing relationship")]
    NoDrawing { sheet_part: String },
    #[error("{kind} part {part} is referenced but not present in the package")]
    MissingPart { kind: EdgeKind, part: String },
}

/// A sheet that resolves all the way to a drawing part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetDrawing {
    pub sheet_name: String,
    pub sheet_part: String,
    pub drawing_part: String,
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    /// Sheet name -> workbook-scoped relationship id, in workbook order.
    sheets: Vec<WorkbookSheet>,
    sheet_parts: HashMap<RelKey, String>,
    drawing_parts: HashMap<String, String>,
    media_parts: HashMap<RelKey, String>,
}

impl RelationshipGraph {
    pub fn build(package: &XlsxPackage) -> Result<Self, StructuralError> {
        let sheets = parse_workbook_sheets(package.required_part(WORKBOOK_PART)?)?;
        let workbook_rels = parse_relationships(
            package.required_part(WORKBOOK_RELS_PART)?,
            WORKBOOK_RELS_PART,
        )?;

        let sheet_parts = internal_edges(WORKBOOK_PART, &workbook_rels, REL_TYPE_WORKSHEET_SUFFIX)
            .collect::<HashMap<_, _>>();

        let worksheet_parts: BTreeSet<&String> = sheet_parts.values().collect();
        let mut drawing_parts = HashMap::new();
        for sheet_part in worksheet_parts {
            let Some(rels) = optional_relationships(package, sheet_part) else {
                continue;
            };
            let mut drawings = internal_edges(sheet_part, &rels, REL_TYPE_DRAWING_SUFFIX);
            if let Some((_, drawing_part)) = drawings.next() {
                let ignored = drawings.count();
                if ignored > 0 {
                    log::warn!(
                        "{sheet_part} declares {} drawing relationships; only {drawing_part} is used",
                        ignored + 1
                    );
                }
                drawing_parts.insert(sheet_part.clone(), drawing_part);
            }
        }

        let unique_drawings: BTreeSet<&String> = drawing_parts.values().collect();
        let mut media_parts = HashMap::new();
        for drawing_part in unique_drawings {
            let Some(rels) = optional_relationships(package, drawing_part) else {
                continue;
            };
            media_parts.extend(internal_edges(drawing_part, &rels, REL_TYPE_IMAGE_SUFFIX));
        }

        Ok(Self {
            sheets,
            sheet_parts,
            drawing_parts,
            media_parts,
        })
    }

    pub fn sheets(&self) -> &[WorkbookSheet] {
        &self.sheets
    }

    /// Sheet name -> worksheet part (workbook sheet table chained through the workbook rels).
    pub fn sheet_part(&self, sheet_name: &str) -> Result<&str, RelationshipGap> {
        let sheet = self
            .sheets
            .iter()
            .find(|sheet| sheet.name == sheet_name)
            .ok_or_else(|| RelationshipGap::UnknownSheet(sheet_name.to_string()))?;
        let key = RelKey::new(WORKBOOK_PART, sheet.rel_id.as_str());
        self.sheet_parts
            .get(&key)
            .map(String::as_str)
            .ok_or(RelationshipGap::MissingEdge {
                kind: EdgeKind::SheetOf,
                key,
            })
    }

    pub fn drawing_part(&self, sheet_part: &str) -> Result<&str, RelationshipGap> {
        self.drawing_parts
            .get(sheet_part)
            .map(String::as_str)
            .ok_or_else(|| RelationshipGap::NoDrawing {
                sheet_part: sheet_part.to_string(),
            })
    }

    /// Embed ids are only unique within one drawing part, hence the pair.
    pub fn media_part(&self, drawing_part: &str, embed_id: &str) -> Result<&str, RelationshipGap> {
        let key = RelKey::new(drawing_part, embed_id);
        self.media_parts
            .get(&key)
            .map(String::as_str)
            .ok_or(RelationshipGap::MissingEdge {
                kind: EdgeKind::ImageOf,
                key,
            })
    }

    pub fn drawing_for_sheet(&self, sheet_name: &str) -> Result<SheetDrawing, RelationshipGap> {
        let sheet_part = self.sheet_part(sheet_name)?;
        let drawing_part = self.drawing_part(sheet_part)?;
        Ok(SheetDrawing {
            sheet_name: sheet_name.to_string(),
            sheet_part: sheet_part.to_string(),
            drawing_part: drawing_part.to_string(),
        })
    }

    /// Full chain: sheet name + drawing embed id -> media part.
    pub fn image_part_for(
        &self,
        sheet_name: &str,
        embed_id: &str,
    ) -> Result<&str, RelationshipGap> {
        self.sheet_part(sheet_name)
            .and_then(|sheet_part| self.drawing_part(sheet_part))
            .and_then(|drawing_part| self.media_part(drawing_part, embed_id))
    }

    /// Every sheet that has a drawing, in workbook order. Sheets without one are reported at
    /// `debug` (a plain sheet is not a problem); other gaps are reported at `warn`.
    pub fn sheet_drawings(&self) -> Vec<SheetDrawing> {
        self.sheets
            .iter()
            .filter_map(|sheet| match self.drawing_for_sheet(&sheet.name) {
                Ok(drawing) => Some(drawing),
                Err(gap @ RelationshipGap::NoDrawing { .. }) => {
                    log::debug!("sheet `{}`: {gap}", sheet.name);
                    None
                }
                Err(gap) => {
                    log::warn!("sheet `{}`: {gap}", sheet.name);
                    None
                }
            })
            .collect()
    }
}

/// Relationships declared by `owner_part`, or `None` when it has no (readable) `.rels` part.
fn optional_relationships(package: &XlsxPackage, owner_part: &str) -> Option<Vec<Relationship>> {
    let rels_part = rels_part_name(owner_part);
    let bytes = package.part(&rels_part)?;
    match parse_relationships(bytes, &rels_part) {
        Ok(rels) => Some(rels),
        Err(err) => {
            log::warn!("ignoring unreadable relationship part: {err}");
            None
        }
    }
}

/// Internal relationships of one type, keyed by owner + id and resolved to part names.
fn internal_edges<'a>(
    owner_part: &'a str,
    rels: &'a [Relationship],
    type_suffix: &'a str,
) -> impl Iterator<Item = (RelKey, String)> + 'a {
    rels.iter()
        .filter(move |rel| rel.has_type(type_suffix))
        .filter(move |rel| {
            if rel.is_external() {
                log::debug!("skipping external relationship {} in {owner_part}", rel.id);
                return false;
            }
            true
        })
        .map(move |rel| {
            (
                RelKey::new(owner_part, rel.id.as_str()),
                resolve_target(owner_part, &rel.target),
            )
        })
}
