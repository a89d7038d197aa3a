use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};
use serde::Serialize;

use crate::error::Result;
use crate::fmt::{amount, percent};
use crate::loader::{compute_checksum, load_grid};
use crate::models::ConstructionSchedule;
use crate::schedule::parse_construction_schedule;

use super::effective_settings;

#[derive(Serialize)]
struct ScheduleReport<'a> {
    file: String,
    checksum: String,
    #[serde(flatten)]
    schedule: &'a ConstructionSchedule,
}

pub fn run(config: Option<&Path>, file: &Path, sheet: Option<&str>, json: bool) -> Result<()> {
    let settings = effective_settings(config)?;
    let grid = load_grid(file, sheet)?;
    let schedule = parse_construction_schedule(&grid, &settings.schedule)?;

    if json {
        let report = ScheduleReport {
            file: file.display().to_string(),
            checksum: compute_checksum(file)?,
            schedule: &schedule,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Header row: {}", schedule.header_row);
    println!(
        "Floors:     {}",
        if schedule.floors.is_empty() {
            "(none)".to_string()
        } else {
            schedule.floors.join(", ")
        }
    );

    let mut header = vec!["#", "Chapter", "Work Item", "Budget"];
    header.extend(schedule.floors.iter().map(String::as_str));
    header.extend(["Completion", "Actual"]);

    let mut table = Table::new();
    table.set_header(header);
    for task in &schedule.tasks {
        let mut row = vec![
            Cell::new(task.task_number),
            Cell::new(&task.chapter),
            Cell::new(&task.work_item),
            Cell::new(amount(task.budgeted_amount)),
        ];
        for floor in &schedule.floors {
            let progress = task.floor_progress.get(floor).copied().unwrap_or(0.0);
            row.push(Cell::new(percent(progress)));
        }
        row.push(Cell::new(percent(task.total_completion)));
        row.push(Cell::new(amount(task.actual_amount)));
        table.add_row(row);
    }
    println!("{table}");
    println!("{} tasks", schedule.tasks.len());
    println!(
        "Total contract amount: {}",
        amount(schedule.total_contract_amount).bold()
    );
    Ok(())
}
