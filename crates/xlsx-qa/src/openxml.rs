//! OPC relationship files (`*.rels`) and part-name resolution.

use std::io::Cursor;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::StructuralError;

pub const REL_TYPE_WORKSHEET_SUFFIX: &str = "/worksheet";
pub const REL_TYPE_DRAWING_SUFFIX: &str = "/drawing";
pub const REL_TYPE_IMAGE_SUFFIX: &str = "/image";

/// One `<Relationship>` entry. `id` is only meaningful together with the part that owns the
/// relationship file it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub type_uri: String,
    pub target: String,
    pub target_mode: Option<String>,
}

impl Relationship {
    pub fn is_external(&self) -> bool {
        self.target_mode
            .as_deref()
            .is_some_and(|mode| mode.trim().eq_ignore_ascii_case("External"))
    }

    /// Relationship types are compared by suffix so both the transitional
    /// (`http://schemas.openxmlformats.org/officeDocument/2006/relationships/...`) and strict
    /// (`http://purl.oclc.org/ooxml/officeDocument/relationships/...`) namespaces match.
    pub fn has_type(&self, suffix: &str) -> bool {
        self.type_uri.ends_with(suffix)
    }
}

/// Name of the relationship part for `part_name`.
pub fn rels_part_name(part_name: &str) -> String {
    let part_name = part_name.strip_prefix('/').unwrap_or(part_name);
    match part_name.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_name}.rels"),
    }
}

pub fn resolve_target(base_part: &str, target: &str) -> String {
    // Relationship targets are URIs; some producers include a fragment (e.g. `foo.xml#bar`).
    // OPC part names do not include fragments, so strip them before resolving.
    let target = target
        .split_once('#')
        .map(|(base, _)| base)
        .unwrap_or(target);
    if target.is_empty() {
        // A target of just `#fragment` refers to the source part itself.
        return base_part
            .strip_prefix('/')
            .unwrap_or(base_part)
            .to_string();
    }

    // Absolute targets are rooted at the package root and must not be prefixed with the source
    // part directory.
    let (target, is_absolute) = match target.strip_prefix('/') {
        Some(target) => (target, true),
        None => (target, false),
    };
    let base_dir = if is_absolute {
        ""
    } else {
        base_part
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    };

    let mut components: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            _ => components.push(segment),
        }
    }

    components.join("/")
}

/// Last path segment of a part name (`xl/media/image1.png` -> `image1.png`).
pub fn file_name(part_name: &str) -> &str {
    part_name
        .rsplit_once('/')
        .map(|(_, file)| file)
        .unwrap_or(part_name)
}

pub fn parse_relationships(
    xml: &[u8],
    part_name: &str,
) -> Result<Vec<Relationship>, StructuralError> {
    let mut reader = Reader::from_reader(Cursor::new(xml));
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|source| StructuralError::Xml {
                part: part_name.to_string(),
                source,
            })?;
        match event {
            Event::Start(start) | Event::Empty(start) => {
                if local_name(start.name().as_ref()).eq_ignore_ascii_case(b"Relationship") {
                    if let Some(rel) = parse_relationship_element(&start, part_name)? {
                        relationships.push(rel);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

fn parse_relationship_element(
    start: &BytesStart<'_>,
    part_name: &str,
) -> Result<Option<Relationship>, StructuralError> {
    let mut id = None;
    let mut target = None;
    let mut type_uri = None;
    let mut target_mode = None;
    for attr in start.attributes() {
        let attr = attr.map_err(|source| StructuralError::XmlAttr {
            part: part_name.to_string(),
            source,
        })?;
        let key = local_name(attr.key.as_ref());
        let value = attr
            .unescape_value()
            .map_err(|source| StructuralError::Xml {
                part: part_name.to_string(),
                source,
            })?
            .into_owned();
        if key.eq_ignore_ascii_case(b"Id") {
            id = Some(value);
        } else if key.eq_ignore_ascii_case(b"Target") {
            target = Some(value);
        } else if key.eq_ignore_ascii_case(b"Type") {
            type_uri = Some(value);
        } else if key.eq_ignore_ascii_case(b"TargetMode") {
            target_mode = Some(value);
        }
    }

    Ok(match (id, target, type_uri) {
        (Some(id), Some(target), Some(type_uri)) => Some(Relationship {
            id,
            type_uri,
            target,
            target_mode,
        }),
        _ => None,
    })
}

pub fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}
