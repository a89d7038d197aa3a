use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::bank::detect::Detection;

/// Israeli bank codes. Only some of them have a statement parser.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankCode {
    Leumi,
    Hapoalim,
    Discount,
    Mizrahi,
    International,
    Jerusalem,
    Mercantile,
    Union,
    OtsarHahayal,
    Massad,
    PoaleiAgudat,
    Other,
}

impl BankCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Leumi => "LEUMI",
            Self::Hapoalim => "HAPOALIM",
            Self::Discount => "DISCOUNT",
            Self::Mizrahi => "MIZRAHI",
            Self::International => "INTERNATIONAL",
            Self::Jerusalem => "JERUSALEM",
            Self::Mercantile => "MERCANTILE",
            Self::Union => "UNION",
            Self::OtsarHahayal => "OTSAR_HAHAYAL",
            Self::Massad => "MASSAD",
            Self::PoaleiAgudat => "POALEI_AGUDAT",
            Self::Other => "OTHER",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Leumi => "Bank Leumi",
            Self::Hapoalim => "Bank Hapoalim",
            Self::Discount => "Discount Bank",
            Self::Mizrahi => "Mizrahi-Tefahot Bank",
            Self::International => "First International Bank",
            Self::Jerusalem => "Bank of Jerusalem",
            Self::Mercantile => "Mercantile Discount Bank",
            Self::Union => "Bank Yahav",
            Self::OtsarHahayal => "Bank Otsar Ha-Hayal",
            Self::Massad => "Bank Massad",
            Self::PoaleiAgudat => "Bank Poalei Agudat Israel",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
        }
    }
}

/// One statement line. `amount` is never negative; the direction lives in
/// `transaction_type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTransaction {
    pub transaction_date: NaiveDate,
    pub value_date: Option<NaiveDate>,
    pub description: String,
    pub reference_number: Option<String>,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance: Option<Decimal>,
}

/// Extracted once per statement and shared by all of its transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankAccountInfo {
    pub bank_code: BankCode,
    pub account_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankStatement {
    pub account: BankAccountInfo,
    pub detection: Detection,
    pub transactions: Vec<ParsedTransaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementSummary {
    pub transaction_count: usize,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub net: Decimal,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl BankStatement {
    /// Totals saturate at the decimal range rather than overflowing.
    pub fn summary(&self) -> StatementSummary {
        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;
        for txn in &self.transactions {
            match txn.transaction_type {
                TransactionType::Credit => total_credit = total_credit.saturating_add(txn.amount),
                TransactionType::Debit => total_debit = total_debit.saturating_add(txn.amount),
            }
        }
        let dates = self.transactions.iter().map(|t| t.transaction_date);
        StatementSummary {
            transaction_count: self.transactions.len(),
            total_debit,
            total_credit,
            net: total_credit.saturating_sub(total_debit),
            first_date: dates.clone().min(),
            last_date: dates.max(),
        }
    }
}

/// One line item of a construction progress schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedConstructionTask {
    pub task_number: i64,
    pub chapter: String,
    pub chapter_weight: f64,
    pub work_item: String,
    pub percent_of_chapter: f64,
    pub percent_of_total: f64,
    pub budgeted_amount: Decimal,
    /// Keyed by every discovered floor label, unparsable cells read as 0.
    pub floor_progress: BTreeMap<String, f64>,
    pub total_completion: f64,
    pub completion_rate: f64,
    pub actual_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstructionSchedule {
    pub header_row: usize,
    pub total_contract_amount: Decimal,
    /// Header column order, not sorted.
    pub floors: Vec<String>,
    pub tasks: Vec<ParsedConstructionTask>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::detect::Confidence;
    use crate::bank::BankFormat;
    use rust_decimal_macros::dec;

    fn txn(day: u32, kind: TransactionType, amount: Decimal) -> ParsedTransaction {
        ParsedTransaction {
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            value_date: None,
            description: String::new(),
            reference_number: None,
            transaction_type: kind,
            amount,
            balance: None,
        }
    }

    #[test]
    fn test_statement_summary_totals() {
        let statement = BankStatement {
            account: BankAccountInfo {
                bank_code: BankCode::Hapoalim,
                account_number: None,
            },
            detection: Detection {
                format: BankFormat::Hapoalim,
                rule: "explicit".to_string(),
                confidence: Confidence::High,
            },
            transactions: vec![
                txn(5, TransactionType::Debit, dec!(1000)),
                txn(2, TransactionType::Credit, dec!(5000)),
                txn(9, TransactionType::Debit, dec!(250.50)),
            ],
        };
        let s = statement.summary();
        assert_eq!(s.transaction_count, 3);
        assert_eq!(s.total_debit, dec!(1250.50));
        assert_eq!(s.total_credit, dec!(5000));
        assert_eq!(s.net, dec!(3749.50));
        assert_eq!(s.first_date, NaiveDate::from_ymd_opt(2024, 3, 2));
        assert_eq!(s.last_date, NaiveDate::from_ymd_opt(2024, 3, 9));
    }

    #[test]
    fn test_statement_summary_saturates_huge_amounts() {
        let huge = dec!(50000000000000000000000000000);
        let statement = BankStatement {
            account: BankAccountInfo {
                bank_code: BankCode::Discount,
                account_number: None,
            },
            detection: Detection {
                format: BankFormat::Discount,
                rule: "explicit".to_string(),
                confidence: Confidence::High,
            },
            transactions: vec![
                txn(1, TransactionType::Credit, huge),
                txn(2, TransactionType::Credit, huge),
                txn(3, TransactionType::Debit, huge),
                txn(4, TransactionType::Debit, huge),
            ],
        };
        let s = statement.summary();
        assert_eq!(s.total_credit, Decimal::MAX);
        assert_eq!(s.total_debit, Decimal::MAX);
        assert_eq!(s.net, Decimal::ZERO);
    }

    #[test]
    fn test_codes_serialize_like_the_bank_list() {
        assert_eq!(
            serde_json::to_string(&BankCode::OtsarHahayal).unwrap(),
            "\"OTSAR_HAHAYAL\""
        );
        assert_eq!(BankCode::OtsarHahayal.code(), "OTSAR_HAHAYAL");
        assert_eq!(
            serde_json::to_string(&TransactionType::Credit).unwrap(),
            "\"CREDIT\""
        );
    }
}
