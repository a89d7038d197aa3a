use comfy_table::{Cell, Table};

use crate::bank::BankFormat;
use crate::error::Result;

pub fn run() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Bank", "Code", "Header Row"]);
    for format in BankFormat::ALL {
        let bank = format.bank_code();
        table.add_row(vec![
            Cell::new(format.key()),
            Cell::new(bank.name()),
            Cell::new(bank.code()),
            Cell::new(format.layout().header_row),
        ]);
    }
    println!("Bank statement formats\n{table}");
    Ok(())
}
