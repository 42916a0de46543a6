//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the normalized weekly sales record produced by ingest
//! - the inclusive date range used by the range-filtered queries

pub mod types;

pub use types::*;
