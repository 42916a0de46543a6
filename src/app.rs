//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the config and constructs the store client + session cache
//! - dispatches to the loader, the query printer, or the TUI

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, QueryArgs, QueryShape};
use crate::config::Config;
use crate::domain::DateRange;
use crate::error::AppError;
use crate::queries;
use crate::store::{ClickhouseClient, QueryCache};

/// Entry point for the `pulse` binary.
pub fn run() -> Result<(), AppError> {
    // We want bare `pulse` (and `pulse --config x.yaml`) to behave like
    // `pulse tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while keeping the dashboard one keystroke away.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    let config = Config::load(&cli.config)?;

    match cli.command {
        Command::Load => {
            init_tracing();
            handle_load(&config)
        }
        Command::Query(args) => {
            init_tracing();
            handle_query(&config, &args)
        }
        Command::Bounds => {
            init_tracing();
            handle_bounds(&config)
        }
        // The TUI owns the terminal; it reports through its status line
        // instead of a log subscriber.
        Command::Tui => crate::tui::run(&config),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_load(config: &Config) -> Result<(), AppError> {
    let client = ClickhouseClient::new(&config.clickhouse);
    let summary = crate::load::run_load(config, &client)?;
    println!("Loaded {} rows.", summary.rows_inserted);
    Ok(())
}

fn handle_query(config: &Config, args: &QueryArgs) -> Result<(), AppError> {
    let client = ClickhouseClient::new(&config.clickhouse);
    let mut cache = QueryCache::default();

    let output = match args.shape {
        QueryShape::Timeseries => {
            let range = resolve_range(&client, &mut cache, args)?;
            let points = queries::sales_over_time(&client, &mut cache, range)?;
            crate::report::format_sales_over_time(&points, range)
        }
        QueryShape::Ranking => {
            let ranks = queries::store_ranking(&client, &mut cache)?;
            crate::report::format_store_ranking(&ranks)
        }
        QueryShape::Holiday => {
            let rows = queries::holiday_impact(&client, &mut cache)?;
            crate::report::format_holiday_impact(&rows)
        }
        QueryShape::Factors => {
            let range = resolve_range(&client, &mut cache, args)?;
            let points = queries::external_factors(&client, &mut cache, range)?;
            crate::report::format_external_factors(&points, range)
        }
    };

    print!("{output}");
    Ok(())
}

fn handle_bounds(config: &Config) -> Result<(), AppError> {
    let client = ClickhouseClient::new(&config.clickhouse);
    let mut cache = QueryCache::default();
    let bounds = queries::date_bounds(&client, &mut cache)?;
    print!("{}", crate::report::format_bounds(bounds));
    Ok(())
}

/// Resolve the effective date range for a range-filtered shape.
///
/// A fully user-supplied range is validated before any query is issued; bounds
/// are only fetched when an endpoint needs a default.
fn resolve_range(
    client: &ClickhouseClient,
    cache: &mut QueryCache,
    args: &QueryArgs,
) -> Result<DateRange, AppError> {
    if let (Some(start), Some(end)) = (args.start, args.end) {
        return DateRange::new(start, end);
    }
    let bounds = queries::date_bounds(client, cache)?;
    DateRange::new(
        args.start.unwrap_or(bounds.start()),
        args.end.unwrap_or(bounds.end()),
    )
}

/// Rewrite argv so `pulse` defaults to `pulse tui`.
///
/// Rules:
/// - `pulse`                      -> `pulse tui`
/// - `pulse --config x.yaml`      -> `pulse tui --config x.yaml`
/// - `pulse --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version =
        matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "load" | "query" | "bounds" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_tui() {
        assert_eq!(rewrite_args(args(&["pulse"])), args(&["pulse", "tui"]));
    }

    #[test]
    fn leading_flag_is_treated_as_tui_flag() {
        assert_eq!(
            rewrite_args(args(&["pulse", "--config", "x.yaml"])),
            args(&["pulse", "tui", "--config", "x.yaml"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(args(&["pulse", "load"])), args(&["pulse", "load"]));
        assert_eq!(
            rewrite_args(args(&["pulse", "--help"])),
            args(&["pulse", "--help"])
        );
    }
}
