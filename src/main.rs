mod bank;
mod cli;
mod coerce;
mod error;
mod fmt;
mod grid;
mod loader;
mod models;
mod schedule;
mod settings;

use clap::Parser;

use cli::{Cli, Commands, ConfigCommands};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Bank {
            file,
            format,
            sheet,
            json,
        } => cli::bank::run(config, &file, format.as_deref(), sheet.as_deref(), json),
        Commands::Detect { file, sheet } => cli::detect::run(config, &file, sheet.as_deref()),
        Commands::Schedule { file, sheet, json } => {
            cli::schedule::run(config, &file, sheet.as_deref(), json)
        }
        Commands::Formats => cli::formats::run(),
        Commands::Config { command } => match command {
            ConfigCommands::Init { force } => cli::config::init(config, force),
            ConfigCommands::Show => cli::config::show(config),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
