pub mod bank;
pub mod config;
pub mod detect;
pub mod formats;
pub mod schedule;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::settings::{load_settings, settings_path, Settings};

#[derive(Parser)]
#[command(
    name = "sitebook",
    about = "Read Israeli bank statements and construction progress schedules from spreadsheets."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/sitebook/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log detection and header resolution details
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect the bank and list the transactions of a statement.
    Bank {
        /// Path to XLSX/XLS/ODS or CSV file
        file: PathBuf,
        /// Parser key, skips detection (see `sitebook formats`)
        #[arg(long)]
        format: Option<String>,
        /// Worksheet name (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
        /// Print the parsed statement as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which parser a statement would be read with.
    Detect {
        /// Path to XLSX/XLS/ODS or CSV file
        file: PathBuf,
        /// Worksheet name (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Extract tasks and floor progress from a construction schedule.
    Schedule {
        /// Path to XLSX/XLS/ODS or CSV file
        file: PathBuf,
        /// Worksheet name (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
        /// Print the parsed schedule as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the supported bank statement formats.
    Formats,
    /// Manage the settings file.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the built-in defaults to the settings file.
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings.
    Show,
}

pub(crate) fn resolve_settings_path(config: Option<&Path>) -> PathBuf {
    config.map(Path::to_path_buf).unwrap_or_else(settings_path)
}

pub(crate) fn effective_settings(config: Option<&Path>) -> Result<Settings> {
    load_settings(&resolve_settings_path(config))
}
