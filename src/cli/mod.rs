//! Command-line parsing for the weekly sales loader/dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the ETL/query code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "pulse",
    version,
    about = "Weekly retail sales: CSV batch loader + ClickHouse-backed dashboard"
)]
pub struct Cli {
    /// Path to the YAML config file.
    #[arg(long, global = true, default_value = "config.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Batch-load the configured CSV into the store (create schema, insert all rows).
    Load,
    /// Run one aggregation query and print the result table.
    Query(QueryArgs),
    /// Print the observed min/max week dates.
    Bounds,
    /// Launch the interactive dashboard.
    ///
    /// Uses the same query layer as `pulse query`, but renders charts and
    /// tables in a terminal UI.
    Tui,
}

/// Options for `pulse query`.
#[derive(Debug, Parser, Clone)]
pub struct QueryArgs {
    /// Which aggregation to run.
    #[arg(value_enum)]
    pub shape: QueryShape,

    /// Range start (YYYY-MM-DD). Defaults to the observed minimum week date.
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Range end (YYYY-MM-DD). Defaults to the observed maximum week date.
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

/// The four fixed aggregation shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryShape {
    /// Weekly sales totals over a date range.
    Timeseries,
    /// Top stores by average weekly sales.
    Ranking,
    /// Holiday vs regular week averages per store.
    Holiday,
    /// Weekly sales plus averaged external factors over a date range.
    Factors,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_subcommand_parses_shape_and_range() {
        let cli = Cli::parse_from([
            "pulse",
            "query",
            "timeseries",
            "--start",
            "2010-02-05",
            "--end",
            "2010-02-12",
        ]);
        match cli.command {
            Command::Query(args) => {
                assert_eq!(args.shape, QueryShape::Timeseries);
                assert_eq!(
                    args.start,
                    Some(NaiveDate::from_ymd_opt(2010, 2, 5).unwrap())
                );
                assert_eq!(args.end, Some(NaiveDate::from_ymd_opt(2010, 2, 12).unwrap()));
            }
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["pulse", "load", "--config", "alt.yaml"]);
        assert_eq!(cli.config, PathBuf::from("alt.yaml"));
        assert!(matches!(cli.command, Command::Load));
    }

    #[test]
    fn ranking_takes_no_range() {
        let cli = Cli::parse_from(["pulse", "query", "ranking"]);
        match cli.command {
            Command::Query(args) => {
                assert_eq!(args.shape, QueryShape::Ranking);
                assert!(args.start.is_none());
            }
            other => panic!("expected query, got {other:?}"),
        }
    }
}
