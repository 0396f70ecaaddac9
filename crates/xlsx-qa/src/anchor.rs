//! Locates pictures pinned to worksheet cells by `xdr:twoCellAnchor` entries.

use roxmltree::{Document, Node};

use crate::column::cell_label;
use crate::graph::{EdgeKind, RelationshipGap, RelationshipGraph, SheetDrawing};
use crate::openxml::file_name;
use crate::package::XlsxPackage;

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Largest 0-based row and column of a worksheet (`XFD1048576`).
const MAX_ROW: u32 = 1_048_575;
const MAX_COL: u32 = 16_383;

/// A picture anchor as stored in the drawing part. `col`/`row` are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingAnchor {
    pub col: u32,
    pub row: u32,
    pub embed_id: String,
}

/// A picture whose media part was found in the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredImage {
    pub sheet_name: String,
    /// 1-based worksheet row of the anchor's top-left cell.
    pub row: u32,
    /// A1 label of the anchor's top-left cell (e.g. `B3`).
    pub cell: String,
    pub media_part: String,
    /// File name of the media part (e.g. `image1.png`).
    pub file_name: String,
}

impl AnchoredImage {
    /// `{sheet}_{cell}_{file}`; distinct cells never collide even when media names repeat.
    pub fn save_name(&self) -> String {
        format!("{}_{}_{}", self.sheet_name, self.cell, self.file_name)
    }
}

/// Pictures found while walking every sheet's drawing, in scan order (workbook sheet order,
/// then anchor document order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageScan {
    pub images: Vec<AnchoredImage>,
}

impl ImageScan {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Walk every sheet drawing reachable through `graph` and collect its pictures.
///
/// Nothing here fails the run: unparseable drawings, anchors without a picture, unknown embed
/// ids and media parts missing from the archive are logged and skipped.
pub fn scan_images(package: &XlsxPackage, graph: &RelationshipGraph) -> ImageScan {
    let mut scan = ImageScan::default();
    for drawing in graph.sheet_drawings() {
        scan_drawing(package, graph, &drawing, &mut scan);
    }
    scan
}

fn scan_drawing(
    package: &XlsxPackage,
    graph: &RelationshipGraph,
    drawing: &SheetDrawing,
    scan: &mut ImageScan,
) {
    let Some(bytes) = package.part(&drawing.drawing_part) else {
        let gap = RelationshipGap::MissingPart {
            kind: EdgeKind::DrawingOf,
            part: drawing.drawing_part.clone(),
        };
        log::warn!("sheet `{}`: {gap}", drawing.sheet_name);
        return;
    };

    let anchors = match parse_drawing_anchors(bytes) {
        Ok(anchors) => anchors,
        Err(err) => {
            log::warn!(
                "sheet `{}`: skipping unreadable drawing {}: {err}",
                drawing.sheet_name,
                drawing.drawing_part
            );
            return;
        }
    };

    for anchor in anchors {
        let resolved = graph
            .media_part(&drawing.drawing_part, &anchor.embed_id)
            .and_then(|media_part| {
                if package.has_part(media_part) {
                    Ok(media_part)
                } else {
                    Err(RelationshipGap::MissingPart {
                        kind: EdgeKind::ImageOf,
                        part: media_part.to_string(),
                    })
                }
            });
        let row = anchor.row + 1;
        let cell = cell_label(anchor.col, row);
        match resolved {
            Ok(media_part) => scan.images.push(AnchoredImage {
                sheet_name: drawing.sheet_name.clone(),
                row,
                cell,
                media_part: media_part.to_string(),
                file_name: file_name(media_part).to_string(),
            }),
            Err(gap) => log::warn!(
                "sheet `{}` cell {cell}: skipping picture: {gap}",
                drawing.sheet_name
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DrawingParseError {
    #[error("drawing xml is not valid utf-8")]
    NonUtf8,
    #[error(transparent)]
    Xml(#[from] roxmltree::Error),
}

/// Picture anchors of a drawing part, in document order.
///
/// Only `twoCellAnchor` entries are considered. Anchors holding a plain shape (no `a:blip`) or a
/// blip without `r:embed` are skipped, as are anchors whose `from` cell is missing, malformed or
/// outside the worksheet grid.
pub fn parse_drawing_anchors(xml: &[u8]) -> Result<Vec<DrawingAnchor>, DrawingParseError> {
    let xml = std::str::from_utf8(xml).map_err(|_| DrawingParseError::NonUtf8)?;
    let doc = Document::parse(xml)?;

    let mut out = Vec::new();
    for anchor in wsdr_anchor_nodes(doc.root_element()) {
        let Some(blip) = anchor
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "blip")
        else {
            continue;
        };
        let Some(embed_id) = blip.attribute((REL_NS, "embed")) else {
            log::debug!("skipping blip without r:embed");
            continue;
        };
        let Some((col, row)) = anchor_from_cell(anchor) else {
            log::warn!("skipping picture {embed_id}: anchor has no usable from cell");
            continue;
        };
        out.push(DrawingAnchor {
            col,
            row,
            embed_id: embed_id.to_string(),
        });
    }
    Ok(out)
}

fn anchor_from_cell(anchor: Node<'_, '_>) -> Option<(u32, u32)> {
    let from = child_element(anchor, "from")?;
    let col = child_element(from, "col")?.text()?.trim().parse().ok()?;
    let row = child_element(from, "row")?.text()?.trim().parse().ok()?;
    (col <= MAX_COL && row <= MAX_ROW).then_some((col, row))
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// `twoCellAnchor` nodes directly under `<xdr:wsDr>`, treating `mc:AlternateContent` as
/// transparent.
///
/// A naive `.descendants()` search would find anchors in both the `mc:Choice` and `mc:Fallback`
/// branches and report the same picture twice, so only the first `mc:Choice` containing anchors
/// is used, falling back to `mc:Fallback`.
fn wsdr_anchor_nodes<'a, 'input>(wsdr: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    fn is_anchor_node(node: Node<'_, '_>) -> bool {
        node.is_element() && node.tag_name().name() == "twoCellAnchor"
    }

    fn first_branch_with_anchors<'a, 'input>(
        wrapper: Node<'a, 'input>,
        branch: &str,
    ) -> Option<Vec<Node<'a, 'input>>> {
        wrapper
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == branch)
            .map(|b| b.descendants().filter(|n| is_anchor_node(*n)).collect::<Vec<_>>())
            .find(|anchors| !anchors.is_empty())
    }

    let mut out = Vec::new();
    for child in wsdr.children().filter(|n| n.is_element()) {
        if is_anchor_node(child) {
            out.push(child);
            continue;
        }
        if child.tag_name().name() != "AlternateContent" {
            continue;
        }
        if let Some(anchors) = first_branch_with_anchors(child, "Choice")
            .or_else(|| first_branch_with_anchors(child, "Fallback"))
        {
            out.extend(anchors);
        }
    }
    out
}
