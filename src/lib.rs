//! `retail-pulse` library crate.
//!
//! The binary (`pulse`) is a thin wrapper around this library so that:
//!
//! - core logic (ingest, load, queries) is testable without spawning processes
//! - the CLI and the TUI share one pipeline instead of duplicating it
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod load;
pub mod queries;
pub mod report;
pub mod store;
pub mod tui;
