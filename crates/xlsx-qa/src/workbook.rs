use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::StructuralError;
use crate::openxml::local_name;

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// A `<sheet>` entry from `xl/workbook.xml`.
///
/// `rel_id` is scoped to the workbook's relationship part and means nothing elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookSheet {
    pub name: String,
    pub rel_id: String,
}

/// Sheets in workbook order.
pub fn parse_workbook_sheets(workbook_xml: &[u8]) -> Result<Vec<WorkbookSheet>, StructuralError> {
    let xml_err = |source| StructuralError::Xml {
        part: WORKBOOK_PART.to_string(),
        source,
    };

    let mut reader = Reader::from_reader(workbook_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Eof => break,
            Event::Empty(e) | Event::Start(e) => {
                if e.local_name().as_ref() == b"sheet" {
                    sheets.push(parse_sheet_element(&e)?);
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

fn parse_sheet_element(e: &BytesStart<'_>) -> Result<WorkbookSheet, StructuralError> {
    let mut name: Option<String> = None;
    let mut rel_id: Option<String> = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|source| StructuralError::XmlAttr {
            part: WORKBOOK_PART.to_string(),
            source,
        })?;
        let key = attr.key.as_ref();
        let is_name = key == b"name";
        let is_rel_id = !is_name && local_name(key) == b"id";
        if !is_name && !is_rel_id {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|source| StructuralError::Xml {
                part: WORKBOOK_PART.to_string(),
                source,
            })?
            .into_owned();
        if is_name {
            name = Some(value);
        } else {
            rel_id = Some(value);
        }
    }

    let missing = |attr| StructuralError::MissingAttr {
        part: WORKBOOK_PART.to_string(),
        attr,
    };
    Ok(WorkbookSheet {
        name: name.ok_or_else(|| missing("name"))?,
        rel_id: rel_id.ok_or_else(|| missing("r:id"))?,
    })
}
