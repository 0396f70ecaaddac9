//! Collapses vertically merged question/answer rows into one group per record.
//!
//! In the source sheets a record spans several rows with its classification, item and number
//! cells merged; only the first row of a merge carries the value. A row with a non-blank
//! classification therefore starts a new group, and every following row with a blank
//! classification belongs to it. Identifying cells are forward-filled from the nearest
//! non-blank value above within the same sheet.
//!
//! Limitation: a group that should end while the next row's classification cell is still blank
//! (e.g. a classification merge spanning several questions) is folded into the previous group.
//! The sheet layout gives no other boundary signal to split on.

use crate::error::ExtractError;
use crate::table::{Cell, RawRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    pub sheet_name: String,
    pub classification: String,
    /// `None` when no row at or above the group's first row has an item value.
    pub item: Option<String>,
    pub number: i64,
    /// Non-blank question cells of the group, newline-joined in row order.
    pub question: String,
    pub answer: String,
    /// 1-based worksheet rows that make up the group, ascending.
    pub original_rows: Vec<u32>,
}

/// Last non-blank identifying values seen in the current sheet.
#[derive(Debug, Default)]
struct FillState {
    classification: Option<Cell>,
    item: Option<Cell>,
    number: Option<Cell>,
}

impl FillState {
    fn observe(&mut self, row: &RawRow) {
        fn carry(slot: &mut Option<Cell>, cell: &Cell) {
            if !cell.is_blank() {
                *slot = Some(cell.clone());
            }
        }
        carry(&mut self.classification, &row.classification);
        carry(&mut self.item, &row.item);
        carry(&mut self.number, &row.number);
    }
}

#[derive(Debug)]
struct PendingGroup {
    sheet_name: String,
    classification: Option<Cell>,
    item: Option<Cell>,
    number: Option<Cell>,
    questions: Vec<String>,
    answers: Vec<String>,
    rows: Vec<u32>,
}

impl PendingGroup {
    fn start(row: &RawRow, fill: &FillState) -> Self {
        let mut group = Self {
            sheet_name: row.sheet_name.clone(),
            classification: fill.classification.clone(),
            item: fill.item.clone(),
            number: fill.number.clone(),
            questions: Vec::new(),
            answers: Vec::new(),
            rows: Vec::new(),
        };
        group.absorb(row);
        group
    }

    fn absorb(&mut self, row: &RawRow) {
        self.questions.extend(row.question.display());
        self.answers.extend(row.answer.display());
        self.rows.push(row.row);
    }

    fn finish(self) -> Result<MergeGroup, ExtractError> {
        let first_row = self.rows.first().copied().unwrap_or_default();
        let number_cell = self.number.unwrap_or(Cell::Empty);
        let number = coerce_number(&number_cell).ok_or_else(|| ExtractError::TypeCoercion {
            sheet: self.sheet_name.clone(),
            row: first_row,
            value: number_cell.display().unwrap_or_default(),
        })?;

        let mut original_rows = self.rows;
        original_rows.sort_unstable();

        Ok(MergeGroup {
            sheet_name: self.sheet_name,
            classification: self
                .classification
                .and_then(|cell| cell.display())
                .unwrap_or_default(),
            item: self.item.and_then(|cell| cell.display()),
            number,
            question: self.questions.join("\n"),
            answer: self.answers.join("\n"),
            original_rows,
        })
    }
}

/// Coerce a sequence-number cell to an integer.
///
/// Integral numbers and numeric text (`"12"`, `" 12.0 "`) are accepted; fractions, other text
/// and blanks are not.
pub fn coerce_number(cell: &Cell) -> Option<i64> {
    fn integral(n: f64) -> Option<i64> {
        (n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15).then_some(n as i64)
    }

    match cell {
        Cell::Empty => None,
        Cell::Number(n) => integral(*n),
        Cell::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
    }
}

/// Melt the concatenated rows of every sheet into groups, in input order.
///
/// Sheets are independent: fill values and the open group are reset whenever the sheet name
/// changes, so a sheet's first row must start a group.
pub fn melt_rows(rows: &[RawRow]) -> Result<Vec<MergeGroup>, ExtractError> {
    let mut groups = Vec::new();
    let mut fill = FillState::default();
    let mut current: Option<PendingGroup> = None;
    let mut current_sheet: Option<&str> = None;

    for row in rows {
        if current_sheet != Some(row.sheet_name.as_str()) {
            if let Some(group) = current.take() {
                groups.push(group.finish()?);
            }
            fill = FillState::default();
            current_sheet = Some(row.sheet_name.as_str());
        }

        fill.observe(row);

        if !row.classification.is_blank() {
            if let Some(group) = current.take() {
                groups.push(group.finish()?);
            }
            current = Some(PendingGroup::start(row, &fill));
            continue;
        }

        match current.as_mut() {
            Some(group) => group.absorb(row),
            None => {
                return Err(ExtractError::GroupBoundary {
                    sheet: row.sheet_name.clone(),
                    row: row.row,
                })
            }
        }
    }

    if let Some(group) = current.take() {
        groups.push(group.finish()?);
    }
    Ok(groups)
}
