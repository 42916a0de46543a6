//! ClickHouse access: HTTP client, tabular results, and the session cache.
//!
//! The engine is treated as a black-box SQL executor reached over its HTTP
//! interface. Reads go through [`query_cached`], which memoizes identical
//! `(sql, params)` pairs for the lifetime of the session.

pub mod cache;
pub mod client;

pub use cache::QueryCache;
pub use client::{ClickhouseClient, ColumnMeta, Table};

use tracing::trace;

use crate::error::AppError;

/// Execute a read query through the session cache.
///
/// The cache has no invalidation: the store is append-only within a session,
/// so cached results only go stale if a concurrent process writes while the
/// dashboard is open. That staleness is a documented limitation, not a bug.
pub fn query_cached(
    client: &ClickhouseClient,
    cache: &mut QueryCache,
    sql: &str,
    params: &[(String, String)],
) -> Result<Table, AppError> {
    if let Some(table) = cache.get(sql, params) {
        trace!(sql, "query cache hit");
        return Ok(table);
    }
    let table = client.query(sql, params)?;
    cache.put(sql, params, table.clone());
    Ok(table)
}
