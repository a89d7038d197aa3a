use std::path::Path;

use colored::Colorize;

use crate::bank::detect::{detect, Confidence};
use crate::error::Result;
use crate::loader::load_grid;

use super::effective_settings;

pub fn run(config: Option<&Path>, file: &Path, sheet: Option<&str>) -> Result<()> {
    let settings = effective_settings(config)?;
    let grid = load_grid(file, sheet)?;
    let detection = detect(&grid, &settings.bank.detection_rules, settings.bank.preview_rows)?;

    let confidence = match detection.confidence {
        Confidence::High => "high".green(),
        Confidence::Heuristic => "heuristic".yellow(),
    };
    println!("Format:     {}", detection.format.key());
    println!("Bank:       {}", detection.format.bank_code().name());
    println!("Rule:       {}", detection.rule);
    println!("Confidence: {confidence}");
    Ok(())
}
