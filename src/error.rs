//! Application error taxonomy.
//!
//! Every failure mode maps to one variant and one stable process exit code so
//! that scripted callers can branch on the outcome of `pulse load`/`pulse query`.
//! There are no retries anywhere: each error is reported once and the
//! responsible operation aborts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Config file missing or malformed. Fatal at startup.
    #[error("config error: {0}")]
    Config(String),

    /// The ClickHouse endpoint could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// DDL execution failed. The load aborts before any insert.
    #[error("schema error: {0}")]
    Schema(String),

    /// Missing expected column, or a row failed type/date coercion.
    /// The entire batch load is aborted; zero rows are inserted.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// The store rejected a read query or returned an undecodable result.
    #[error("query error: {0}")]
    Query(String),

    /// The date-bounds lookup found no rows. Distinct from a normal empty
    /// result set, which is not an error anywhere else.
    #[error("empty result: {0}")]
    EmptyResult(String),

    /// User-supplied input is invalid (e.g. start date after end date).
    /// Reported before any query is issued.
    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Connection(_) => 3,
            AppError::Schema(_) | AppError::DataFormat(_) => 4,
            AppError::Query(_) | AppError::EmptyResult(_) => 5,
            AppError::Validation(_) => 6,
        }
    }
}
