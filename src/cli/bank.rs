use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};
use serde::Serialize;

use crate::bank::detect::Confidence;
use crate::bank::{get_by_key, parse_bank_statement, parse_with_format, unknown_format};
use crate::error::Result;
use crate::fmt::amount;
use crate::loader::{compute_checksum, load_grid};
use crate::models::{BankStatement, StatementSummary, TransactionType};

use super::effective_settings;

#[derive(Serialize)]
struct BankReport<'a> {
    file: String,
    checksum: String,
    #[serde(flatten)]
    statement: &'a BankStatement,
    summary: StatementSummary,
}

pub fn run(
    config: Option<&Path>,
    file: &Path,
    format: Option<&str>,
    sheet: Option<&str>,
    json: bool,
) -> Result<()> {
    let grid = load_grid(file, sheet)?;
    let statement = match format {
        Some(key) => {
            let format = get_by_key(key).ok_or_else(|| unknown_format(key))?;
            parse_with_format(&grid, format)?
        }
        None => {
            let settings = effective_settings(config)?;
            parse_bank_statement(&grid, &settings.bank)?
        }
    };

    if json {
        let report = BankReport {
            file: file.display().to_string(),
            checksum: compute_checksum(file)?,
            statement: &statement,
            summary: statement.summary(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_statement(&statement);
    Ok(())
}

fn print_statement(statement: &BankStatement) {
    let account = &statement.account;
    let detection = &statement.detection;
    println!(
        "Bank:       {} ({})",
        account.bank_code.name(),
        account.bank_code.code()
    );
    println!(
        "Account:    {}",
        account.account_number.as_deref().unwrap_or("(not found)")
    );
    let note = match detection.confidence {
        Confidence::High => String::new(),
        Confidence::Heuristic => format!(" {}", "(heuristic)".yellow()),
    };
    println!("Format:     {} via {}{note}", detection.format.key(), detection.rule);

    let mut table = Table::new();
    table.set_header(vec![
        "Date", "Value Date", "Description", "Reference", "Type", "Amount", "Balance",
    ]);
    for txn in &statement.transactions {
        let kind = match txn.transaction_type {
            TransactionType::Credit => txn.transaction_type.as_str().green().to_string(),
            TransactionType::Debit => txn.transaction_type.as_str().red().to_string(),
        };
        table.add_row(vec![
            Cell::new(txn.transaction_date),
            Cell::new(txn.value_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(&txn.description),
            Cell::new(txn.reference_number.as_deref().unwrap_or("")),
            Cell::new(kind),
            Cell::new(amount(txn.amount)),
            Cell::new(txn.balance.map(amount).unwrap_or_default()),
        ]);
    }
    println!("{table}");

    let summary = statement.summary();
    println!("{} transactions", summary.transaction_count);
    if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
        println!("Period:     {first} to {last}");
    }
    println!("Credits:    {}", amount(summary.total_credit).green());
    println!("Debits:     {}", amount(summary.total_debit).red());
    let net = amount(summary.net);
    if summary.net.is_sign_negative() {
        println!("Net:        {}", net.red().bold());
    } else {
        println!("Net:        {}", net.green().bold());
    }
}
