pub mod detect;

use chrono::NaiveDate;
use log::debug;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::coerce::{safe_date, safe_number, safe_text};
use crate::error::{Result, SitebookError};
use crate::grid::{Cell, RawGrid};
use crate::models::{BankAccountInfo, BankCode, BankStatement, ParsedTransaction, TransactionType};
use crate::settings::BankSettings;

use detect::{detect, Confidence, Detection};

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

/// Where the account number is printed, and how to pull it out.
#[derive(Debug, Clone, Copy)]
pub struct AccountLocator {
    pub row: usize,
    /// `None` searches the whole row.
    pub column: Option<usize>,
    /// First capture group is the account number.
    pub pattern: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountColumns {
    /// Positive credit means CREDIT, otherwise the debit column is the amount.
    Split { debit: usize, credit: usize },
    /// One column, positive for money in.
    Signed { amount: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateSource {
    /// Same as the row's identity date.
    Identity,
    /// This column when it parses, else the identity date.
    Prefer(usize),
    /// This column or nothing.
    Only(usize),
}

impl DateSource {
    fn resolve(&self, row: &[Cell], identity: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Identity => Some(identity),
            Self::Prefer(col) => Some(cell_at(row, *col).and_then(safe_date).unwrap_or(identity)),
            Self::Only(col) => cell_at(row, *col).and_then(safe_date),
        }
    }
}

/// Fixed positions of one bank's export. Data starts on the row after
/// `header_row`; a row is a transaction iff its `identity_date` column parses.
#[derive(Debug, Clone, Copy)]
pub struct BankLayout {
    pub header_row: usize,
    pub account: AccountLocator,
    pub identity_date: usize,
    pub transaction_date: DateSource,
    pub value_date: DateSource,
    /// Non-empty parts are joined with " - ".
    pub description: &'static [usize],
    pub reference: Option<usize>,
    pub amounts: AmountColumns,
    pub balance: Option<usize>,
}

const HAPOALIM: BankLayout = BankLayout {
    header_row: 4,
    account: AccountLocator {
        row: 3,
        column: Some(0),
        pattern: r"מספר חשבון\s+([\d\-]+)",
    },
    identity_date: 0,
    transaction_date: DateSource::Identity,
    value_date: DateSource::Identity,
    description: &[2, 3],
    reference: Some(4),
    amounts: AmountColumns::Split { debit: 6, credit: 7 },
    balance: Some(8),
};

const DISCOUNT: BankLayout = BankLayout {
    header_row: 8,
    account: AccountLocator {
        row: 2,
        column: Some(0),
        pattern: r"חשבון:\s*(\d+)",
    },
    identity_date: 0,
    transaction_date: DateSource::Identity,
    value_date: DateSource::Only(1),
    description: &[2],
    reference: None,
    amounts: AmountColumns::Signed { amount: 3 },
    balance: Some(4),
};

// The export has no running balance column.
const INTERNATIONAL: BankLayout = BankLayout {
    header_row: 5,
    account: AccountLocator {
        row: 2,
        column: None,
        pattern: r"חשבון:\s*(\d+)",
    },
    identity_date: 0,
    transaction_date: DateSource::Prefer(5),
    value_date: DateSource::Identity,
    description: &[3],
    reference: Some(4),
    amounts: AmountColumns::Split { debit: 2, credit: 1 },
    balance: None,
};

const JERUSALEM: BankLayout = BankLayout {
    header_row: 4,
    account: AccountLocator {
        row: 0,
        column: Some(0),
        pattern: r"חשבון\s+([\d\-]+)",
    },
    identity_date: 0,
    transaction_date: DateSource::Identity,
    value_date: DateSource::Prefer(14),
    description: &[1],
    reference: Some(2),
    amounts: AmountColumns::Split { debit: 3, credit: 4 },
    balance: Some(5),
};

// ---------------------------------------------------------------------------
// Formats: enum dispatch over the layouts above
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankFormat {
    Hapoalim,
    International,
    Discount,
    Jerusalem,
}

impl BankFormat {
    pub const ALL: &'static [BankFormat] = &[
        BankFormat::Hapoalim,
        BankFormat::International,
        BankFormat::Discount,
        BankFormat::Jerusalem,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Hapoalim => "hapoalim",
            Self::International => "international",
            Self::Discount => "discount",
            Self::Jerusalem => "jerusalem",
        }
    }

    pub fn bank_code(&self) -> BankCode {
        match self {
            Self::Hapoalim => BankCode::Hapoalim,
            Self::International => BankCode::International,
            Self::Discount => BankCode::Discount,
            Self::Jerusalem => BankCode::Jerusalem,
        }
    }

    pub fn layout(&self) -> &'static BankLayout {
        match self {
            Self::Hapoalim => &HAPOALIM,
            Self::International => &INTERNATIONAL,
            Self::Discount => &DISCOUNT,
            Self::Jerusalem => &JERUSALEM,
        }
    }

    pub fn parse(&self, grid: &RawGrid) -> Result<(BankAccountInfo, Vec<ParsedTransaction>)> {
        let layout = self.layout();
        let account = BankAccountInfo {
            bank_code: self.bank_code(),
            account_number: extract_account_number(grid, &layout.account)?,
        };
        let transactions = parse_rows(grid, layout);
        debug!(
            "{}: {} transactions, account {:?}",
            self.key(),
            transactions.len(),
            account.account_number
        );
        Ok((account, transactions))
    }
}

pub fn get_by_key(key: &str) -> Option<BankFormat> {
    BankFormat::ALL
        .iter()
        .find(|f| f.key().eq_ignore_ascii_case(key.trim()))
        .copied()
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Detect the bank from the sheet's first rows, then parse it.
pub fn parse_bank_statement(grid: &RawGrid, settings: &BankSettings) -> Result<BankStatement> {
    let detection = detect(grid, &settings.detection_rules, settings.preview_rows)?;
    parse_detected(grid, detection)
}

/// Skip detection and parse with a known format.
pub fn parse_with_format(grid: &RawGrid, format: BankFormat) -> Result<BankStatement> {
    parse_detected(
        grid,
        Detection {
            format,
            rule: "explicit".to_string(),
            confidence: Confidence::High,
        },
    )
}

fn parse_detected(grid: &RawGrid, detection: Detection) -> Result<BankStatement> {
    let (account, transactions) = detection.format.parse(grid)?;
    Ok(BankStatement {
        account,
        detection,
        transactions,
    })
}

// ---------------------------------------------------------------------------
// Row walking
// ---------------------------------------------------------------------------

fn cell_at(row: &[Cell], col: usize) -> Option<&Cell> {
    row.get(col)
}

fn number_at(row: &[Cell], col: usize) -> Decimal {
    cell_at(row, col).map(safe_number).unwrap_or(Decimal::ZERO)
}

fn text_at(row: &[Cell], col: usize) -> String {
    cell_at(row, col).map(safe_text).unwrap_or_default()
}

fn extract_account_number(grid: &RawGrid, locator: &AccountLocator) -> Result<Option<String>> {
    let haystack = match locator.column {
        Some(col) => safe_text(grid.cell(locator.row, col)),
        None => grid.row_text(locator.row),
    };
    let re = Regex::new(locator.pattern)?;
    Ok(re
        .captures(&haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string()))
}

fn direction(amounts: AmountColumns, row: &[Cell]) -> (TransactionType, Decimal) {
    match amounts {
        AmountColumns::Split { debit, credit } => {
            let credit = number_at(row, credit);
            if credit > Decimal::ZERO {
                (TransactionType::Credit, credit)
            } else {
                (TransactionType::Debit, number_at(row, debit).abs())
            }
        }
        AmountColumns::Signed { amount } => {
            let value = number_at(row, amount);
            if value > Decimal::ZERO {
                (TransactionType::Credit, value)
            } else {
                (TransactionType::Debit, value.abs())
            }
        }
    }
}

fn parse_row(row: &[Cell], layout: &BankLayout) -> Option<ParsedTransaction> {
    let identity = cell_at(row, layout.identity_date).and_then(safe_date)?;
    let transaction_date = layout
        .transaction_date
        .resolve(row, identity)
        .unwrap_or(identity);
    let description = layout
        .description
        .iter()
        .map(|col| text_at(row, *col))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" - ");
    let reference_number = layout
        .reference
        .map(|col| text_at(row, col))
        .filter(|s| !s.is_empty());
    let (transaction_type, amount) = direction(layout.amounts, row);
    let balance = layout
        .balance
        .and_then(|col| cell_at(row, col))
        .filter(|c| !c.is_empty())
        .map(safe_number);

    Some(ParsedTransaction {
        transaction_date,
        value_date: layout.value_date.resolve(row, identity),
        description,
        reference_number,
        transaction_type,
        amount,
        balance,
    })
}

fn parse_rows(grid: &RawGrid, layout: &BankLayout) -> Vec<ParsedTransaction> {
    let start = layout.header_row + 1;
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for row in grid.rows().iter().skip(start) {
        match parse_row(row, layout) {
            Some(txn) => rows.push(txn),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!("skipped {skipped} rows without a transaction date");
    }
    rows
}

/// Error for a `--format` key that names no parser.
pub fn unknown_format(key: &str) -> SitebookError {
    SitebookError::UnknownFormat(format!(
        "{key} (expected one of: {})",
        BankFormat::ALL
            .iter()
            .map(|f| f.key())
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::text_grid;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hapoalim_grid() -> RawGrid {
        text_grid(&[
            &["תנועות בחשבון"],
            &["שם: חברה בע\"מ"],
            &[],
            &["מספר חשבון  12-63-8386  לתקופה:  01.03.2024 - 31.03.2024"],
            &["תאריך", "קוד פעולה", "הפעולה", "פרטים", "אסמכתא", "צרור", "חובה", "זכות", "יתרה בש''ח"],
            &["01/03/2024", "120", "העברה", "payment", "5521", "", "1,000.00", "", "9,000.00"],
            &["02/03/2024", "175", "הפקדה", "deposit", "", "", "", "5,000.00", "14,000.00"],
            &["", "", "", "", "", "", "", "", ""],
        ])
    }

    #[test]
    fn test_hapoalim_rows_and_account() {
        let (account, txns) = BankFormat::Hapoalim.parse(&hapoalim_grid()).unwrap();
        assert_eq!(account.bank_code, BankCode::Hapoalim);
        assert_eq!(account.account_number.as_deref(), Some("12-63-8386"));
        assert_eq!(txns.len(), 2);

        assert_eq!(txns[0].transaction_date, date(2024, 3, 1));
        assert_eq!(txns[0].value_date, Some(date(2024, 3, 1)));
        assert_eq!(txns[0].transaction_type, TransactionType::Debit);
        assert_eq!(txns[0].amount, dec!(1000));
        assert_eq!(txns[0].balance, Some(dec!(9000)));
        assert_eq!(txns[0].description, "העברה - payment");
        assert_eq!(txns[0].reference_number.as_deref(), Some("5521"));

        assert_eq!(txns[1].transaction_type, TransactionType::Credit);
        assert_eq!(txns[1].amount, dec!(5000));
        assert_eq!(txns[1].balance, Some(dec!(14000)));
        assert_eq!(txns[1].reference_number, None);
    }

    #[test]
    fn test_dateless_rows_are_skipped_not_terminal() {
        let mut rows: Vec<Vec<Cell>> = hapoalim_grid().rows().to_vec();
        rows.insert(6, vec![Cell::from("סה\"כ"), Cell::Empty]);
        rows.push(vec![
            Cell::from("03/03/2024"),
            Cell::Empty,
            Cell::from("fee"),
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
            Cell::Number(12.5),
            Cell::Number(0.0),
            Cell::Number(13987.5),
        ]);
        let (_, txns) = BankFormat::Hapoalim.parse(&RawGrid::new(rows)).unwrap();
        assert_eq!(txns.len(), 3);
        assert_eq!(txns[2].description, "fee");
        assert_eq!(txns[2].amount, dec!(12.5));
        assert_eq!(txns[2].transaction_type, TransactionType::Debit);
    }

    #[test]
    fn test_row_count_matches_dated_rows_in_order() {
        let mut rows = hapoalim_grid().rows()[..5].to_vec();
        for day in 1..=7u32 {
            let d = format!("{day:02}/04/2024");
            rows.push(vec![Cell::from(d.as_str()), Cell::Empty, Cell::from(format!("row {day}"))]);
            rows.push(vec![]);
        }
        let (_, txns) = BankFormat::Hapoalim.parse(&RawGrid::new(rows)).unwrap();
        assert_eq!(txns.len(), 7);
        for (i, t) in txns.iter().enumerate() {
            assert_eq!(t.transaction_date, date(2024, 4, i as u32 + 1));
            // Short rows: amounts default, the row still counts.
            assert_eq!(t.amount, Decimal::ZERO);
            assert_eq!(t.balance, None);
        }
    }

    fn discount_grid(rows: &[&[&str]]) -> RawGrid {
        let preamble: &[&[&str]] = &[
            &["עובר ושב"],
            &[],
            &["חשבון: 0198175673 | חברה בע\"מ"],
            &[],
            &[],
            &[],
            &[],
            &[],
            &["תאריך", "יום ערך", "תיאור התנועה", "₪ זכות/חובה ", "₪ יתרה "],
        ];
        let mut all = preamble.to_vec();
        all.extend_from_slice(rows);
        text_grid(&all)
    }

    #[test]
    fn test_discount_signed_amount() {
        let grid = discount_grid(&[
            &["05.03.2024", "06.03.2024", "עמלה", "-250.00", "1,750.00"],
            &["07.03.2024", "", "זיכוי", "300", "2,050.00"],
        ]);
        let (account, txns) = BankFormat::Discount.parse(&grid).unwrap();
        assert_eq!(account.account_number.as_deref(), Some("0198175673"));
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].transaction_type, TransactionType::Debit);
        assert_eq!(txns[0].amount, dec!(250.00));
        assert_eq!(txns[0].balance, Some(dec!(1750.00)));
        assert_eq!(txns[0].value_date, Some(date(2024, 3, 6)));
        assert_eq!(txns[0].reference_number, None);
        assert_eq!(txns[1].transaction_type, TransactionType::Credit);
        assert_eq!(txns[1].amount, dec!(300));
        assert_eq!(txns[1].value_date, None);
    }

    #[test]
    fn test_direction_follows_sign_and_amount_is_magnitude() {
        for (raw, kind, amount) in [
            ("-0.01", TransactionType::Debit, dec!(0.01)),
            ("0", TransactionType::Debit, dec!(0)),
            ("12", TransactionType::Credit, dec!(12)),
            ("(40)", TransactionType::Debit, dec!(40)),
        ] {
            let grid = discount_grid(&[&["05.03.2024", "", "x", raw, ""]]);
            let (_, txns) = BankFormat::Discount.parse(&grid).unwrap();
            assert_eq!(txns[0].transaction_type, kind, "{raw}");
            assert_eq!(txns[0].amount, amount, "{raw}");
            assert!(txns[0].amount >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_international_uses_execution_date_and_has_no_balance() {
        let grid = text_grid(&[
            &["תנועות בסוג חשבון"],
            &[],
            &["סניף: 126", "חשבון: 409069"],
            &[],
            &[],
            &["תאריך ערך", "זכות", "חובה", "תאור", "אסמכתא", "תאריך ביצוע"],
            &["10/03/2024", "", "700", "שיק", "88", "09/03/2024"],
            &["11/03/2024", "1,200", "", "העברה", "", ""],
            &["", "5", "", "no date", "", "12/03/2024"],
        ]);
        let (account, txns) = BankFormat::International.parse(&grid).unwrap();
        assert_eq!(account.bank_code, BankCode::International);
        assert_eq!(account.account_number.as_deref(), Some("409069"));
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].transaction_date, date(2024, 3, 9));
        assert_eq!(txns[0].value_date, Some(date(2024, 3, 10)));
        assert_eq!(txns[0].transaction_type, TransactionType::Debit);
        assert_eq!(txns[0].amount, dec!(700));
        assert_eq!(txns[1].transaction_date, date(2024, 3, 11));
        assert_eq!(txns[1].transaction_type, TransactionType::Credit);
        assert!(txns.iter().all(|t| t.balance.is_none()));
    }

    #[test]
    fn test_jerusalem_value_date_falls_back() {
        let mut wide = vec![""; 15];
        wide[0] = "03/03/2024";
        wide[1] = "משכורת";
        wide[2] = "77";
        wide[4] = "2,500";
        wide[5] = "10,000";
        wide[14] = "04/03/2024";
        let grid = text_grid(&[
            &["עובר ושב, חשבון 051-510474034, ₪, פרויקט"],
            &[],
            &[],
            &[],
            &["תאריך", "תיאור", "אסמכתא", "חובה", "זכות", "יתרה"],
            &wide,
            &["04/03/2024", "חיוב", "", "100", "", "9,900"],
        ]);
        let (account, txns) = BankFormat::Jerusalem.parse(&grid).unwrap();
        assert_eq!(account.account_number.as_deref(), Some("051-510474034"));
        assert_eq!(txns[0].value_date, Some(date(2024, 3, 4)));
        assert_eq!(txns[0].transaction_type, TransactionType::Credit);
        assert_eq!(txns[0].amount, dec!(2500));
        assert_eq!(txns[1].value_date, Some(date(2024, 3, 4)));
        assert_eq!(txns[1].transaction_type, TransactionType::Debit);
        assert_eq!(txns[1].balance, Some(dec!(9900)));
    }

    #[test]
    fn test_missing_account_marker_is_not_an_error() {
        let grid = text_grid(&[&["תנועות בחשבון"], &[], &[], &["no number here"], &[]]);
        let (account, txns) = BankFormat::Hapoalim.parse(&grid).unwrap();
        assert_eq!(account.account_number, None);
        assert!(txns.is_empty());
    }

    #[test]
    fn test_parse_bank_statement_detects_then_parses() {
        let settings = BankSettings::default();
        let statement = parse_bank_statement(&hapoalim_grid(), &settings).unwrap();
        assert_eq!(statement.detection.format, BankFormat::Hapoalim);
        assert_eq!(statement.account.bank_code, BankCode::Hapoalim);
        assert_eq!(statement.transactions.len(), 2);
        // Same grid, same output.
        assert_eq!(statement, parse_bank_statement(&hapoalim_grid(), &settings).unwrap());
    }

    #[test]
    fn test_parse_with_format_skips_detection() {
        let grid = discount_grid(&[&["05.03.2024", "", "x", "-1", "1"]]);
        let statement = parse_with_format(&grid, BankFormat::Discount).unwrap();
        assert_eq!(statement.detection.rule, "explicit");
        assert_eq!(statement.transactions.len(), 1);
    }

    #[test]
    fn test_get_by_key() {
        assert_eq!(get_by_key("discount"), Some(BankFormat::Discount));
        assert_eq!(get_by_key(" Jerusalem "), Some(BankFormat::Jerusalem));
        assert_eq!(get_by_key("leumi"), None);
        assert!(unknown_format("leumi").to_string().contains("hapoalim"));
    }
}
