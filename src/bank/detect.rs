//! Bank statement format detection.
//!
//! Detection runs an ordered list of [`DetectionRule`]s against the first few
//! rows of the sheet; the first rule whose predicates all hold picks the
//! parser. Several exports share markers (Discount and Jerusalem both say
//! "עובר ושב"), so the order of the list is part of the behaviour. The list is
//! plain data and can be replaced from the settings file.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::bank::BankFormat;
use crate::error::{Result, SitebookError};
use crate::grid::{row_text, Cell, RawGrid};

pub const DEFAULT_PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// A bank-specific marker matched.
    High,
    /// Picked by a fallback (shared marker, column count, header shape).
    Heuristic,
}

/// The first `rows` rows of a grid, pre-rendered for matching.
pub struct Preview<'a> {
    rows: &'a [Vec<Cell>],
    text: String,
    width: usize,
}

impl<'a> Preview<'a> {
    pub fn new(grid: &'a RawGrid, rows: usize) -> Self {
        let rows = &grid.rows()[..rows.min(grid.row_count())];
        let text = rows
            .iter()
            .map(|r| row_text(r))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        // Trailing blank cells do not count as columns.
        let width = rows
            .iter()
            .map(|r| r.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1))
            .max()
            .unwrap_or(0);
        Self { rows, text, width }
    }

    fn row_text(&self, idx: usize) -> Option<String> {
        self.rows.get(idx).map(|r| row_text(r))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Every token appears somewhere in the preview.
    ContainsAll { tokens: Vec<String> },
    /// At least one token appears somewhere in the preview.
    ContainsAny { tokens: Vec<String> },
    /// Every token appears in one specific row; false if the preview is
    /// shorter than that.
    RowContainsAll { row: usize, tokens: Vec<String> },
    /// The preview spans exactly this many columns.
    Width { columns: usize },
    Either { any: Vec<Predicate> },
}

impl Predicate {
    pub fn matches(&self, preview: &Preview) -> bool {
        match self {
            Self::ContainsAll { tokens } => tokens.iter().all(|t| preview.text.contains(t.as_str())),
            Self::ContainsAny { tokens } => tokens.iter().any(|t| preview.text.contains(t.as_str())),
            Self::RowContainsAll { row, tokens } => match preview.row_text(*row) {
                Some(text) => tokens.iter().all(|t| text.contains(t.as_str())),
                None => false,
            },
            Self::Width { columns } => preview.width == *columns,
            Self::Either { any } => any.iter().any(|p| p.matches(preview)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRule {
    pub label: String,
    /// All must hold. An empty list always matches.
    pub when: Vec<Predicate>,
    pub format: BankFormat,
    pub confidence: Confidence,
}

impl DetectionRule {
    pub fn matches(&self, preview: &Preview) -> bool {
        self.when.iter().all(|p| p.matches(preview))
    }
}

/// Which parser was chosen, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub format: BankFormat,
    pub rule: String,
    pub confidence: Confidence,
}

fn tokens(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn contains(token: &str) -> Predicate {
    Predicate::ContainsAll {
        tokens: tokens(&[token]),
    }
}

fn rule(label: &str, when: Vec<Predicate>, format: BankFormat, confidence: Confidence) -> DetectionRule {
    DetectionRule {
        label: label.to_string(),
        when,
        format,
        confidence,
    }
}

const CHECKING_ACCOUNT: &str = "עובר ושב";
const DATE_CREDIT_DEBIT: &[&str] = &["תאריך", "זכות", "חובה"];

/// The built-in priority list, first match wins.
pub fn default_rules() -> Vec<DetectionRule> {
    use BankFormat::*;
    use Confidence::*;
    vec![
        rule(
            "hapoalim-signature",
            vec![Predicate::ContainsAll {
                tokens: tokens(&["תנועות בחשבון", "קוד פעולה"]),
            }],
            Hapoalim,
            High,
        ),
        rule(
            "international-signature",
            vec![Predicate::ContainsAny {
                tokens: tokens(&["תנועות בסוג חשבון", "הבינלאומי"]),
            }],
            International,
            High,
        ),
        rule(
            "discount-header-row",
            vec![
                contains(CHECKING_ACCOUNT),
                Predicate::RowContainsAll {
                    row: 8,
                    tokens: tokens(&["תיאור התנועה", "יום ערך"]),
                },
            ],
            Discount,
            High,
        ),
        rule(
            "jerusalem-name",
            vec![contains(CHECKING_ACCOUNT), contains("ירושלים")],
            Jerusalem,
            High,
        ),
        rule(
            "discount-fallback",
            vec![
                contains(CHECKING_ACCOUNT),
                Predicate::Either {
                    any: vec![contains("תנועות אחרונות"), Predicate::Width { columns: 5 }],
                },
            ],
            Discount,
            Heuristic,
        ),
        rule(
            "jerusalem-fallback",
            vec![contains(CHECKING_ACCOUNT)],
            Jerusalem,
            Heuristic,
        ),
        rule(
            "structural-jerusalem",
            vec![
                Predicate::RowContainsAll {
                    row: 4,
                    tokens: tokens(DATE_CREDIT_DEBIT),
                },
                Predicate::RowContainsAll {
                    row: 0,
                    tokens: tokens(&["חשבון"]),
                },
            ],
            Jerusalem,
            Heuristic,
        ),
        rule(
            "structural-hapoalim",
            vec![Predicate::RowContainsAll {
                row: 4,
                tokens: tokens(DATE_CREDIT_DEBIT),
            }],
            Hapoalim,
            Heuristic,
        ),
    ]
}

pub fn detect(grid: &RawGrid, rules: &[DetectionRule], preview_rows: usize) -> Result<Detection> {
    let preview = Preview::new(grid, preview_rows);
    let Some(hit) = rules.iter().find(|r| r.matches(&preview)) else {
        return Err(SitebookError::UnsupportedFormat {
            reason: format!(
                "no detection rule matched the first {preview_rows} rows (supported: {})",
                BankFormat::ALL
                    .iter()
                    .map(|f| f.bank_code().name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        });
    };
    debug!("detected {} via rule '{}'", hit.format.key(), hit.label);
    if hit.confidence == Confidence::Heuristic {
        warn!(
            "{} picked by fallback rule '{}'; check the result",
            hit.format.bank_code().name(),
            hit.label
        );
    }
    Ok(Detection {
        format: hit.format,
        rule: hit.label.clone(),
        confidence: hit.confidence,
    })
}
