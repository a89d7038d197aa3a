use chrono::{NaiveDate, NaiveDateTime};

use crate::coerce::safe_text;

/// One raw value as handed over by the spreadsheet decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::Date(d.and_time(chrono::NaiveTime::default()))
    }
}

static EMPTY: Cell = Cell::Empty;

/// Decoded sheet contents, indexed from the top-left cell of the sheet.
/// Rows may be ragged; anything outside a row reads as [`Cell::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> &[Cell] {
        self.rows.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.row(row).get(col).unwrap_or(&EMPTY)
    }

    /// Non-empty cell text of one row joined by single spaces.
    pub fn row_text(&self, idx: usize) -> String {
        row_text(self.row(idx))
    }
}

pub fn row_text(row: &[Cell]) -> String {
    row.iter()
        .filter(|c| !c.is_empty())
        .map(safe_text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a grid of text cells; `""` becomes an empty cell.
#[cfg(test)]
pub fn text_grid(rows: &[&[&str]]) -> RawGrid {
    RawGrid::new(
        rows.iter()
            .map(|r| r.iter().map(|s| Cell::from(*s)).collect())
            .collect(),
    )
}
