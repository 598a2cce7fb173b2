//! Command-line entry for the portfolio core.
//!
//! # Responsibility
//! - Print ping/version for a quick linkage check.
//! - `init` opens (and migrates) the configured database.
//! - `stats` prints aggregate and child counts of the configured database.

use clap::{Parser, Subcommand};
use portfolio_core::{
    init_from_config, open_db, AppConfig, CategoryService, SqliteStore, WorkService,
};
use std::process::ExitCode;

/// Portfolio backend maintenance commands. Settings come from `PORTFOLIO_*` variables.
#[derive(Parser)]
#[command(name = "portfolio_cli", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Open the configured database and apply pending migrations
    Init,
    /// Print category, skill, work and image counts
    Stats,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    println!("portfolio_core ping={}", portfolio_core::ping());
    println!("portfolio_core version={}", portfolio_core::core_version());

    let result = match cli.command {
        None => Ok(()),
        Some(Command::Init) => run_init(),
        Some(Command::Stats) => run_stats(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<AppConfig, String> {
    let config = AppConfig::from_env().map_err(|err| err.to_string())?;
    init_from_config(&config)?;
    Ok(config)
}

fn run_init() -> Result<(), String> {
    let config = load_config()?;
    open_db(&config.db_path).map_err(|err| err.to_string())?;
    println!("database ready at {}", config.db_path.display());
    Ok(())
}

fn run_stats() -> Result<(), String> {
    let config = load_config()?;

    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let mut store = SqliteStore::try_new(conn).map_err(|err| err.to_string())?;
    let categories = CategoryService::new(&mut store)
        .list()
        .map_err(|err| err.to_string())?;
    let works = WorkService::new(&mut store, config.upload_store())
        .list()
        .map_err(|err| err.to_string())?;

    let skills: usize = categories.iter().map(|category| category.skills.len()).sum();
    let images: usize = works.iter().map(|work| work.images.len()).sum();
    println!("categories={} skills={skills}", categories.len());
    println!("works={} images={images}", works.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommands_parse_and_unknown_ones_are_rejected() {
        let cli = Cli::try_parse_from(["portfolio_cli", "stats"]).unwrap();
        assert_eq!(cli.command, Some(Command::Stats));

        let cli = Cli::try_parse_from(["portfolio_cli"]).unwrap();
        assert_eq!(cli.command, None);

        assert!(Cli::try_parse_from(["portfolio_cli", "migrate-all"]).is_err());
    }
}
