use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};
use rust_decimal::Decimal;

use crate::coerce::{safe_fraction, safe_int, safe_number, safe_text};
use crate::error::Result;
use crate::grid::{Cell, RawGrid};
use crate::models::{ConstructionSchedule, ParsedConstructionTask};

use super::{resolve, ColumnMap, ResolvedSchedule, ScheduleField, ScheduleVocabulary};

/// Reads one data row through the resolved column map. Unresolved fields
/// come back as their zero value.
struct RowReader<'a> {
    row: &'a [Cell],
    columns: &'a ColumnMap,
}

impl<'a> RowReader<'a> {
    fn cell(&self, field: ScheduleField) -> Option<&'a Cell> {
        self.columns.get(field).and_then(|col| self.row.get(col))
    }

    fn text(&self, field: ScheduleField) -> String {
        self.cell(field).map(safe_text).unwrap_or_default()
    }

    fn fraction(&self, field: ScheduleField) -> f64 {
        self.cell(field).map(safe_fraction).unwrap_or(0.0)
    }

    fn amount(&self, field: ScheduleField) -> Decimal {
        self.cell(field).map(safe_number).unwrap_or(Decimal::ZERO)
    }
}

fn extract_task(row: &[Cell], resolved: &ResolvedSchedule) -> Option<ParsedConstructionTask> {
    let reader = RowReader {
        row,
        columns: &resolved.columns,
    };
    let task_number = reader.cell(ScheduleField::TaskNumber).and_then(safe_int)?;

    let floor_progress: BTreeMap<String, f64> = resolved
        .floors
        .iter()
        .map(|(label, col)| {
            let progress = row.get(col).map(safe_fraction).unwrap_or(0.0);
            (label.to_string(), progress)
        })
        .collect();

    Some(ParsedConstructionTask {
        task_number,
        chapter: reader.text(ScheduleField::Chapter),
        chapter_weight: reader.fraction(ScheduleField::ChapterWeight),
        work_item: reader.text(ScheduleField::WorkItem),
        percent_of_chapter: reader.fraction(ScheduleField::PercentOfChapter),
        percent_of_total: reader.fraction(ScheduleField::PercentOfTotal),
        budgeted_amount: reader.amount(ScheduleField::BudgetAmount),
        floor_progress,
        total_completion: reader.fraction(ScheduleField::TotalCompletion),
        completion_rate: reader.fraction(ScheduleField::CompletionRate),
        actual_amount: reader.amount(ScheduleField::ActualAmount),
    })
}

/// One pass over the rows below the header. Rows whose task number is not an
/// integer (chapter titles, subtotals, blanks) are dropped; a repeated task
/// number keeps its first row.
pub fn extract_tasks(grid: &RawGrid, resolved: &ResolvedSchedule) -> Vec<ParsedConstructionTask> {
    if resolved.columns.get(ScheduleField::TaskNumber).is_none() {
        warn!("no task number column in header row {}", resolved.header_row);
        return Vec::new();
    }
    let mut seen = HashSet::new();
    let mut tasks = Vec::new();
    let mut skipped = 0usize;
    for (offset, row) in grid.rows().iter().skip(resolved.header_row + 1).enumerate() {
        let Some(task) = extract_task(row, resolved) else {
            skipped += 1;
            continue;
        };
        if !seen.insert(task.task_number) {
            warn!(
                "task number {} repeated on row {}, keeping the first",
                task.task_number,
                resolved.header_row + 1 + offset
            );
            continue;
        }
        tasks.push(task);
    }
    debug!("{} tasks, {skipped} non-task rows", tasks.len());
    tasks
}

/// Sum of the budget column over the extracted tasks, whether or not the
/// sheet also carries its own grand total. Saturates instead of overflowing.
pub fn total_contract_amount(tasks: &[ParsedConstructionTask]) -> Decimal {
    tasks
        .iter()
        .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.budgeted_amount))
}

pub fn parse_construction_schedule(
    grid: &RawGrid,
    vocab: &ScheduleVocabulary,
) -> Result<ConstructionSchedule> {
    let resolved = resolve(grid, vocab)?;
    let tasks = extract_tasks(grid, &resolved);
    Ok(ConstructionSchedule {
        header_row: resolved.header_row,
        total_contract_amount: total_contract_amount(&tasks),
        floors: resolved.floors.labels(),
        tasks,
    })
}
