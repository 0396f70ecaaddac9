//! Raw worksheet rows, read with calamine.
//!
//! Each sheet's used range is read in workbook order. Its first row is the header; the five
//! question/answer columns are located by header label, everything else is ignored.

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};

use crate::config::ColumnLabels;
use crate::error::{ExtractError, StructuralError};

/// A cell value as far as record building cares.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Display form used when joining text; integral numbers have no fractional part.
    pub fn display(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(format_number(*n)),
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
            Data::Int(v) => Cell::Number(*v as f64),
            Data::Float(v) => Cell::Number(*v),
            Data::Bool(v) => Cell::Text(if *v { "TRUE" } else { "FALSE" }.to_string()),
            Data::DateTime(v) => Cell::Number(v.as_f64()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// One data row of one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub sheet_name: String,
    /// 1-based worksheet row number, as shown by Excel.
    pub row: u32,
    pub classification: Cell,
    pub item: Cell,
    pub number: Cell,
    pub question: Cell,
    pub answer: Cell,
}

impl RawRow {
    /// True when none of the five tracked cells holds a value.
    pub fn is_blank(&self) -> bool {
        [
            &self.classification,
            &self.item,
            &self.number,
            &self.question,
            &self.answer,
        ]
        .iter()
        .all(|cell| cell.is_blank())
    }
}

/// Read every sheet's data rows from the workbook bytes, concatenated in workbook order.
pub fn read_rows(bytes: &[u8], labels: &ColumnLabels) -> Result<Vec<RawRow>, ExtractError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;

    let mut rows = Vec::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet_name)?;
        rows.extend(sheet_rows(&sheet_name, &range, labels)?);
    }
    Ok(rows)
}

/// Rows of a single sheet. `range` is the sheet's used range; its first row is the header.
pub fn sheet_rows(
    sheet_name: &str,
    range: &Range<Data>,
    labels: &ColumnLabels,
) -> Result<Vec<RawRow>, StructuralError> {
    let Some((start_row, _)) = range.start() else {
        log::debug!("sheet `{sheet_name}` is empty");
        return Ok(Vec::new());
    };

    let mut iter = range.rows();
    let Some(header) = iter.next() else {
        return Ok(Vec::new());
    };
    let columns = HeaderColumns::locate(sheet_name, header, labels)?;

    let mut out = Vec::new();
    // NOTE: calamine `Range` rows are relative to `range.start()`; the header is offset 0.
    for (offset, cells) in iter.enumerate() {
        let row = start_row + offset as u32 + 2;
        out.push(RawRow {
            sheet_name: sheet_name.to_string(),
            row,
            classification: columns.cell(cells, columns.classification),
            item: columns.cell(cells, columns.item),
            number: columns.cell(cells, columns.number),
            question: columns.cell(cells, columns.question),
            answer: columns.cell(cells, columns.answer),
        });
    }
    // Formatted but empty rows can extend the used range below the table.
    while out.last().is_some_and(RawRow::is_blank) {
        out.pop();
    }
    Ok(out)
}

struct HeaderColumns {
    classification: usize,
    item: usize,
    number: usize,
    question: usize,
    answer: usize,
}

impl HeaderColumns {
    fn locate(
        sheet_name: &str,
        header: &[Data],
        labels: &ColumnLabels,
    ) -> Result<Self, StructuralError> {
        let find = |label: &str| {
            header
                .iter()
                .position(|cell| {
                    Cell::from(cell)
                        .display()
                        .is_some_and(|text| text.trim() == label)
                })
                .ok_or_else(|| StructuralError::MissingColumn {
                    sheet: sheet_name.to_string(),
                    label: label.to_string(),
                })
        };
        Ok(Self {
            classification: find(&labels.classification)?,
            item: find(&labels.item)?,
            number: find(&labels.number)?,
            question: find(&labels.question)?,
            answer: find(&labels.answer)?,
        })
    }

    fn cell(&self, cells: &[Data], idx: usize) -> Cell {
        cells.get(idx).map(Cell::from).unwrap_or(Cell::Empty)
    }
}
