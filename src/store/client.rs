//! Blocking HTTP client for the ClickHouse SQL interface.
//!
//! Reads are issued as `POST <endpoint>?default_format=JSONCompact` with the
//! SQL in the request body and any parameters shipped as `param_<name>` query
//! items. ClickHouse substitutes them into `{name:Type}` placeholders
//! server-side, so values are never spliced into the SQL text by this client.
//!
//! The client is a plain value constructed once at startup and passed by
//! reference to every component; there is no hidden connection singleton.

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::ClickhouseConfig;
use crate::error::AppError;

/// Ask ClickHouse to emit 64-bit integers as JSON numbers instead of strings.
/// Our aggregates (counts, store ids) all fit in f64 mantissa range.
const JSON_INT_SETTING: (&str, &str) = ("output_format_json_quote_64bit_integers", "0");

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A tabular query result: ordered columns and ordered rows, exactly as the
/// store returned them. Cells are JSON values; the query layer is responsible
/// for decoding them into domain types.
#[derive(Debug, Clone, Deserialize)]
pub struct Table {
    #[serde(rename = "meta")]
    pub columns: Vec<ColumnMeta>,
    #[serde(rename = "data")]
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

pub struct ClickhouseClient {
    http: Client,
    endpoint: String,
    database: String,
}

impl ClickhouseClient {
    pub fn new(cfg: &ClickhouseConfig) -> Self {
        let scheme = if cfg.secure { "https" } else { "http" };
        Self {
            http: Client::new(),
            endpoint: format!("{scheme}://{}:{}/", cfg.host, cfg.port),
            database: cfg.database.clone(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Execute a read-only query and decode the JSONCompact result.
    ///
    /// An empty result set is a valid zero-row [`Table`], not an error.
    pub fn query(&self, sql: &str, params: &[(String, String)]) -> Result<Table, AppError> {
        debug!(sql, ?params, "executing query");

        let mut req = self
            .request_in_database()
            .query(&[("default_format", "JSONCompact"), JSON_INT_SETTING]);
        for (name, value) in params {
            req = req.query(&[(format!("param_{name}"), value)]);
        }

        let resp = self.send_checked(req.body(sql.to_string()))?;
        resp.json::<Table>()
            .map_err(|e| AppError::Query(format!("failed to decode query result: {e}")))
    }

    /// Execute a single DDL/utility statement against the configured database.
    pub fn execute(&self, sql: &str) -> Result<(), AppError> {
        debug!(sql, "executing statement");
        self.send_checked(self.request_in_database().body(sql.to_string()))?;
        Ok(())
    }

    /// Create the configured database if it does not exist yet.
    ///
    /// This must run without the `database` query item: pointing the session
    /// at a database that does not exist yet fails every request, including
    /// the one that would create it.
    pub fn ensure_database(&self) -> Result<(), AppError> {
        let sql = format!("CREATE DATABASE IF NOT EXISTS `{}`", self.database);
        debug!(sql, "ensuring database exists");
        self.send_checked(self.http.post(&self.endpoint).body(sql))?;
        Ok(())
    }

    /// Append pre-rendered `TabSeparated` rows in one request.
    ///
    /// `insert_sql` must end in `FORMAT TabSeparated`; `body` carries the rows.
    pub fn insert_tab_separated(&self, insert_sql: &str, body: String) -> Result<(), AppError> {
        debug!(insert_sql, bytes = body.len(), "inserting batch");
        let req = self
            .request_in_database()
            .query(&[("query", insert_sql)])
            .body(body);
        self.send_checked(req)?;
        Ok(())
    }

    fn request_in_database(&self) -> RequestBuilder {
        self.http
            .post(&self.endpoint)
            .query(&[("database", self.database.as_str())])
    }

    /// Send a request, mapping transport failures to `Connection` and
    /// non-success statuses to `Query` (with the server's first error line).
    fn send_checked(&self, req: RequestBuilder) -> Result<Response, AppError> {
        let resp = req
            .send()
            .map_err(|e| AppError::Connection(format!("clickhouse request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<unreadable response body>".to_string());
            let detail = body.lines().next().unwrap_or("").trim().to_string();
            return Err(AppError::Query(format!(
                "clickhouse returned {status}: {detail}"
            )));
        }

        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsoncompact_payload_decodes_into_table() {
        let payload = r#"{
            "meta": [
                {"name": "week_date", "type": "Date"},
                {"name": "weekly_sales_total", "type": "Float64"}
            ],
            "data": [
                ["2010-02-05", 24924.5],
                ["2010-02-12", 46039.49]
            ],
            "rows": 2
        }"#;
        let table: Table = serde_json::from_str(payload).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[0].name, "week_date");
        assert_eq!(table.columns[1].type_name, "Float64");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column_index("weekly_sales_total"), Some(1));
        assert_eq!(table.column_index("missing"), None);
    }

    #[test]
    fn zero_row_payload_is_a_valid_empty_table() {
        let payload = r#"{"meta":[{"name":"store","type":"UInt32"}],"data":[],"rows":0}"#;
        let table: Table = serde_json::from_str(payload).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), 1);
    }

    #[test]
    fn endpoint_respects_secure_flag() {
        let cfg = ClickhouseConfig {
            host: "ch.internal".to_string(),
            port: 8443,
            database: "retail".to_string(),
            secure: true,
        };
        let client = ClickhouseClient::new(&cfg);
        assert_eq!(client.endpoint, "https://ch.internal:8443/");
        assert_eq!(client.database(), "retail");
    }
}
