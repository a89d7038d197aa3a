//! Turns a file on disk into a [`RawGrid`]. Parsing never touches the
//! filesystem; this is the only place that does.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};

use crate::error::{Result, SitebookError};
use crate::grid::{Cell, RawGrid};

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug).
#[cfg_attr(not(feature = "xlsx"), allow(dead_code))]
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    // 2958465 is 9999-12-31.
    if !serial.is_finite() || !(0.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    base.checked_add_signed(chrono::Duration::seconds(seconds))
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"))
}

/// Load the first sheet (or `sheet`, when given) of a workbook, or a CSV file.
pub fn load_grid(path: &Path, sheet: Option<&str>) -> Result<RawGrid> {
    if is_csv(path) {
        load_csv(path)
    } else {
        load_workbook(path, sheet)
    }
}

/// The csv reader skips blank lines, but a blank line is still a row of the
/// sheet. Give each one (outside a quoted field) a single empty field.
fn keep_blank_lines(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_quotes = false;
    let mut field_start = true;
    let mut line_start = true;
    let mut chars = content.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            out.push(ch);
            if ch == '"' {
                // A doubled quote is an escaped quote, not the end of the field.
                if chars.peek() == Some(&'"') {
                    chars.next();
                    out.push('"');
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }
        if line_start && (ch == '\n' || ch == '\r') {
            out.push_str("\"\"");
        }
        // Only a quote that opens a field starts quoting; `מס"ד` is plain text.
        if ch == '"' && field_start {
            in_quotes = true;
        }
        line_start = ch == '\n';
        field_start = matches!(ch, ',' | '\n' | '\r');
        out.push(ch);
    }
    out
}

fn load_csv(path: &Path) -> Result<RawGrid> {
    let content = std::fs::read_to_string(path)?;
    let content = keep_blank_lines(content.trim_start_matches('\u{feff}'));
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Vec<Cell> = record.iter().map(Cell::from).collect();
        rows.push(row);
    }
    Ok(RawGrid::new(rows))
}

#[cfg(feature = "xlsx")]
fn to_cell(data: &calamine::Data) -> Cell {
    use calamine::Data;
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(feature = "xlsx")]
fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<RawGrid> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| SitebookError::Workbook(format!("{}: {e}", path.display())))?;
    let name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(SitebookError::EmptyWorkbook)?,
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| SitebookError::Workbook(format!("sheet '{name}': {e}")))?;

    // The range starts at the first used cell; pad so indices are sheet-absolute.
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row];
    for data_row in range.rows() {
        let mut row = vec![Cell::Empty; start_col];
        row.extend(data_row.iter().map(to_cell));
        rows.push(row);
    }
    Ok(RawGrid::new(rows))
}

#[cfg(not(feature = "xlsx"))]
fn load_workbook(path: &Path, _sheet: Option<&str>) -> Result<RawGrid> {
    Err(SitebookError::Workbook(format!(
        "{}: built without spreadsheet support, only .csv files can be read",
        path.display()
    )))
}
