//! Construction progress schedules.
//!
//! Contractors send their own workbook templates, so nothing about the sheet
//! is fixed: the header row is found by keyword, columns are looked up by
//! header text through alias lists, and floor columns are whatever header
//! cells look like floor labels.

pub mod extract;

use std::collections::{BTreeMap, HashMap};

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::coerce::safe_text;
use crate::error::{Result, SitebookError};
use crate::grid::{Cell, RawGrid};

pub use extract::parse_construction_schedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleField {
    TaskNumber,
    Chapter,
    ChapterWeight,
    WorkItem,
    PercentOfChapter,
    PercentOfTotal,
    BudgetAmount,
    TotalCompletion,
    CompletionRate,
    ActualAmount,
}

impl ScheduleField {
    pub const ALL: &'static [ScheduleField] = &[
        ScheduleField::TaskNumber,
        ScheduleField::Chapter,
        ScheduleField::ChapterWeight,
        ScheduleField::WorkItem,
        ScheduleField::PercentOfChapter,
        ScheduleField::PercentOfTotal,
        ScheduleField::BudgetAmount,
        ScheduleField::TotalCompletion,
        ScheduleField::CompletionRate,
        ScheduleField::ActualAmount,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::TaskNumber => "task_number",
            Self::Chapter => "chapter",
            Self::ChapterWeight => "chapter_weight",
            Self::WorkItem => "work_item",
            Self::PercentOfChapter => "percent_of_chapter",
            Self::PercentOfTotal => "percent_of_total",
            Self::BudgetAmount => "budget_amount",
            Self::TotalCompletion => "total_completion",
            Self::CompletionRate => "completion_rate",
            Self::ActualAmount => "actual_amount",
        }
    }

    fn default_aliases(&self) -> &'static [&'static str] {
        match self {
            Self::TaskNumber => &["מס\"ד", "מספר", "מס'"],
            Self::Chapter => &["פרק", "פרק עבודה"],
            Self::ChapterWeight => &["משקל פרק (%)", "משקל פרק", "משקל"],
            Self::WorkItem => &["סעיף עבודה", "סעיף", "תיאור"],
            Self::PercentOfChapter => &["% מהפרק", "אחוז מהפרק"],
            Self::PercentOfTotal => &["% מסה\"כ", "אחוז מסהכ"],
            Self::BudgetAmount => &["סכום בתקציב", "תקציב"],
            Self::TotalCompletion => &["סה\"כ עד היום", "סהכ עד היום"],
            Self::CompletionRate => &["שיעור ביצוע", "ביצוע %"],
            Self::ActualAmount => &["סכום", "סכום בפועל"],
        }
    }
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Every word list the resolver relies on. Loaded from the settings file so a
/// new template can be supported without touching the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleVocabulary {
    /// Exact cell texts that mark the header row.
    pub header_keywords: Vec<String>,
    pub min_keyword_matches: usize,
    pub header_scan_rows: usize,
    /// Named floors; numeric floors are recognised by `floor_pattern`.
    pub floor_labels: Vec<String>,
    pub floor_pattern: String,
    /// Tried in order, first header text present wins.
    pub aliases: BTreeMap<ScheduleField, Vec<String>>,
}

impl Default for ScheduleVocabulary {
    fn default() -> Self {
        Self {
            header_keywords: strings(&["מס\"ד", "פרק", "סעיף עבודה", "סכום בתקציב", "כללי"]),
            min_keyword_matches: 2,
            header_scan_rows: 20,
            floor_labels: strings(&[
                "כללי", "-2", "-1", "קרקע", "1", "2", "3", "4", "5", "6", "7", "8", "גג",
            ]),
            floor_pattern: r"^-?\d+$".to_string(),
            aliases: ScheduleField::ALL
                .iter()
                .map(|f| (*f, strings(f.default_aliases())))
                .collect(),
        }
    }
}

/// Header text to column index. When a text repeats, the last column wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn from_row(header: &[Cell]) -> Self {
        let mut columns = HashMap::new();
        for (idx, cell) in header.iter().enumerate() {
            let text = safe_text(cell);
            if !text.is_empty() {
                columns.insert(text, idx);
            }
        }
        Self { columns }
    }

    pub fn get(&self, text: &str) -> Option<usize> {
        self.columns.get(text).copied()
    }

    /// First alias present in the header.
    pub fn resolve<S: AsRef<str>>(&self, aliases: &[S]) -> Option<usize> {
        aliases.iter().find_map(|a| self.get(a.as_ref()))
    }
}

/// Semantic field to column index, built once per document. A field missing
/// from the map was not found in the header and reads as its zero value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    fields: BTreeMap<ScheduleField, usize>,
}

impl ColumnMap {
    pub fn build(index: &HeaderIndex, vocab: &ScheduleVocabulary) -> Self {
        let fields = ScheduleField::ALL
            .iter()
            .filter_map(|field| {
                let aliases = vocab.aliases.get(field)?;
                index.resolve(aliases.as_slice()).map(|col| (*field, col))
            })
            .collect();
        Self { fields }
    }

    pub fn get(&self, field: ScheduleField) -> Option<usize> {
        self.fields.get(&field).copied()
    }

    pub fn missing(&self) -> Vec<ScheduleField> {
        ScheduleField::ALL
            .iter()
            .filter(|f| !self.fields.contains_key(f))
            .copied()
            .collect()
    }
}

/// Floor columns, labels distinct and in order of first appearance. A label
/// that repeats reads from its last column, like any other header text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloorSet {
    floors: Vec<(String, usize)>,
}

impl FloorSet {
    pub fn discover(header: &[Cell], vocab: &ScheduleVocabulary) -> Result<Self> {
        let numeric = Regex::new(&vocab.floor_pattern)?;
        let mut floors: Vec<(String, usize)> = Vec::new();
        for (idx, cell) in header.iter().enumerate() {
            let label = safe_text(cell);
            if label.is_empty() {
                continue;
            }
            if let Some(slot) = floors.iter_mut().find(|(l, _)| *l == label) {
                slot.1 = idx;
            } else if vocab.floor_labels.contains(&label) || numeric.is_match(&label) {
                floors.push((label, idx));
            }
        }
        Ok(Self { floors })
    }

    pub fn labels(&self) -> Vec<String> {
        self.floors.iter().map(|(l, _)| l.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.floors.iter().map(|(l, c)| (l.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.floors.len()
    }
}

/// Scan the top of the sheet for the first row holding enough header
/// keywords as exact cell text.
pub fn find_header_row(grid: &RawGrid, vocab: &ScheduleVocabulary) -> Result<usize> {
    let limit = vocab.header_scan_rows.min(grid.row_count());
    for idx in 0..limit {
        let cells: Vec<String> = grid.row(idx).iter().map(safe_text).collect();
        let matches = vocab
            .header_keywords
            .iter()
            .filter(|kw| cells.iter().any(|c| c == *kw))
            .count();
        if matches >= vocab.min_keyword_matches {
            return Ok(idx);
        }
    }
    Err(SitebookError::HeaderNotFound { scanned: limit })
}

/// Everything learned from the header row of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchedule {
    pub header_row: usize,
    pub columns: ColumnMap,
    pub floors: FloorSet,
}

pub fn resolve(grid: &RawGrid, vocab: &ScheduleVocabulary) -> Result<ResolvedSchedule> {
    let header_row = find_header_row(grid, vocab)?;
    let header = grid.row(header_row);
    let columns = ColumnMap::build(&HeaderIndex::from_row(header), vocab);
    let floors = FloorSet::discover(header, vocab)?;
    debug!(
        "header at row {header_row}, {} floors, unresolved fields: {:?}",
        floors.len(),
        columns.missing().iter().map(|f| f.key()).collect::<Vec<_>>()
    );
    Ok(ResolvedSchedule {
        header_row,
        columns,
        floors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::text_grid;

    const HEADER: &[&str] = &[
        "מס\"ד", "פרק", "משקל פרק", "סעיף עבודה", "% מהפרק", "% מסה\"כ", "סכום בתקציב",
        "כללי", "-1", "1", "סה\"כ עד היום", "שיעור ביצוע", "סכום",
    ];

    #[test]
    fn test_header_found_after_title_rows() {
        let title: &[&str] = &["לוח התקדמות ביצוע"];
        let blank: &[&str] = &[];
        let mut rows = vec![title];
        rows.extend(std::iter::repeat(blank).take(14));
        rows.push(HEADER);
        let grid = text_grid(&rows);
        assert_eq!(find_header_row(&grid, &ScheduleVocabulary::default()).unwrap(), 15);
    }

    #[test]
    fn test_header_needs_two_exact_keywords() {
        let vocab = ScheduleVocabulary::default();
        // "פרק" alone, and keywords only as substrings.
        let grid = text_grid(&[&["פרק", "x"], &["פרק א", "סעיף עבודה נוסף"], &["פרק", "כללי"]]);
        assert_eq!(find_header_row(&grid, &vocab).unwrap(), 2);
    }

    #[test]
    fn test_header_not_found_past_scan_limit() {
        let blank: &[&str] = &[];
        let mut rows: Vec<&[&str]> = vec![blank; 20];
        rows.push(HEADER);
        let err = find_header_row(&text_grid(&rows), &ScheduleVocabulary::default()).unwrap_err();
        assert!(matches!(err, SitebookError::HeaderNotFound { scanned: 20 }));
    }

    #[test]
    fn test_header_not_found_reports_rows_scanned() {
        let grid = text_grid(&[&["a"], &["b"]]);
        let err = find_header_row(&grid, &ScheduleVocabulary::default()).unwrap_err();
        assert!(matches!(err, SitebookError::HeaderNotFound { scanned: 2 }));
        assert!(err.to_string().contains("first 2 rows"));
    }

    #[test]
    fn test_repeated_header_text_reads_last_column() {
        let vocab = ScheduleVocabulary::default();
        let header = text_grid(&[&["מס\"ד", "פרק", "סכום", "סכום"]]);
        let index = HeaderIndex::from_row(header.row(0));
        assert_eq!(index.get("סכום"), Some(3));
        let columns = ColumnMap::build(&index, &vocab);
        assert_eq!(columns.get(ScheduleField::ActualAmount), Some(3));
    }

    #[test]
    fn test_column_map_aliases_and_absent_fields() {
        let vocab = ScheduleVocabulary::default();
        let header = text_grid(&[&["מספר", "פרק עבודה", "תיאור", "תקציב", "סכום בפועל"]]);
        let columns = ColumnMap::build(&HeaderIndex::from_row(header.row(0)), &vocab);
        assert_eq!(columns.get(ScheduleField::TaskNumber), Some(0));
        assert_eq!(columns.get(ScheduleField::Chapter), Some(1));
        assert_eq!(columns.get(ScheduleField::WorkItem), Some(2));
        assert_eq!(columns.get(ScheduleField::BudgetAmount), Some(3));
        assert_eq!(columns.get(ScheduleField::ActualAmount), Some(4));
        assert_eq!(columns.get(ScheduleField::ChapterWeight), None);
        assert!(columns.missing().contains(&ScheduleField::CompletionRate));
    }

    #[test]
    fn test_first_alias_wins_over_later_alias() {
        let vocab = ScheduleVocabulary::default();
        let header = text_grid(&[&["סכום בפועל", "סכום"]]);
        let columns = ColumnMap::build(&HeaderIndex::from_row(header.row(0)), &vocab);
        assert_eq!(columns.get(ScheduleField::ActualAmount), Some(1));
    }

    #[test]
    fn test_floor_discovery_keeps_header_order() {
        let header = text_grid(&[&["מס\"ד", "גג", "כללי", "-1", "קרקע", "1", "12", "1", "סכום"]]);
        let floors = FloorSet::discover(header.row(0), &ScheduleVocabulary::default()).unwrap();
        assert_eq!(floors.labels(), vec!["גג", "כללי", "-1", "קרקע", "1", "12"]);
        // Duplicate "1" keeps its first position but reads the last column.
        assert!(floors.iter().any(|(l, c)| l == "1" && c == 7));
        assert_eq!(floors.len(), 6);
    }

    #[test]
    fn test_numeric_header_cells_become_floor_labels() {
        let header = vec![Cell::from("פרק"), Cell::Number(-2.0), Cell::Number(3.0), Cell::Number(0.5)];
        let floors = FloorSet::discover(&header, &ScheduleVocabulary::default()).unwrap();
        assert_eq!(floors.labels(), vec!["-2", "3"]);
    }

    #[test]
    fn test_vocabulary_is_configurable() {
        let mut vocab = ScheduleVocabulary::default();
        vocab.header_keywords = vec!["No.".into(), "Item".into()];
        vocab.floor_labels = vec!["Roof".into()];
        vocab.aliases.insert(ScheduleField::TaskNumber, vec!["No.".into()]);
        let grid = text_grid(&[&["Progress"], &["No.", "Item", "Roof", "2"]]);
        let resolved = resolve(&grid, &vocab).unwrap();
        assert_eq!(resolved.header_row, 1);
        assert_eq!(resolved.columns.get(ScheduleField::TaskNumber), Some(0));
        assert_eq!(resolved.floors.labels(), vec!["Roof", "2"]);
    }

    #[test]
    fn test_partial_vocabulary_json_keeps_defaults() {
        let vocab: ScheduleVocabulary = serde_json::from_str(r#"{"header_scan_rows": 40}"#).unwrap();
        assert_eq!(vocab.header_scan_rows, 40);
        assert_eq!(vocab.min_keyword_matches, 2);
        assert_eq!(
            vocab.aliases.get(&ScheduleField::BudgetAmount).unwrap()[0],
            "סכום בתקציב"
        );
    }
}
