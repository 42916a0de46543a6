//! YAML configuration loading.
//!
//! The config file has two sections: the ClickHouse endpoint and the source
//! data location. Everything except `data.path` has a sensible default, so a
//! minimal config only needs to point at the CSV.
//!
//! ```yaml
//! clickhouse:
//!   host: localhost
//!   port: 8123
//!   database: retail
//!   secure: false
//! data:
//!   path: data/weekly_sales.csv
//!   date_format: "%d-%m-%Y"
//!   schema_path: sql/create_tables.sql
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub clickhouse: ClickhouseConfig,
    pub data: DataConfig,
}

/// ClickHouse HTTP endpoint settings.
///
/// The port is the HTTP interface (8123 by default), not the native protocol
/// port. `secure: true` switches the scheme to https.
#[derive(Debug, Clone, Deserialize)]
pub struct ClickhouseConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Source CSV with the weekly sales export.
    pub path: PathBuf,
    /// Date format of the `date` column. Day-first by default.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// DDL script executed (statement by statement) on every load.
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,
}

impl Default for ClickhouseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            secure: false,
        }
    }
}

impl Config {
    /// Read and parse the config file. Any I/O or parse failure is fatal.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("failed to read config '{}': {e}", path.display()))
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            AppError::Config(format!("failed to parse config '{}': {e}", path.display()))
        })
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8123
}

fn default_database() -> String {
    "default".to_string()
}

fn default_date_format() -> String {
    "%d-%m-%Y".to_string()
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("sql/create_tables.sql")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg: Config = serde_yaml::from_str("data:\n  path: data/sales.csv\n").unwrap();
        assert_eq!(cfg.clickhouse.host, "localhost");
        assert_eq!(cfg.clickhouse.port, 8123);
        assert_eq!(cfg.clickhouse.database, "default");
        assert!(!cfg.clickhouse.secure);
        assert_eq!(cfg.data.path, PathBuf::from("data/sales.csv"));
        assert_eq!(cfg.data.date_format, "%d-%m-%Y");
        assert_eq!(cfg.data.schema_path, PathBuf::from("sql/create_tables.sql"));
    }

    #[test]
    fn full_config_round_trips() {
        let text = "\
clickhouse:
  host: ch.internal
  port: 8443
  database: retail
  secure: true
data:
  path: /srv/sales.csv
  date_format: \"%Y-%m-%d\"
  schema_path: ddl/tables.sql
";
        let cfg: Config = serde_yaml::from_str(text).unwrap();
        assert_eq!(cfg.clickhouse.host, "ch.internal");
        assert_eq!(cfg.clickhouse.port, 8443);
        assert_eq!(cfg.clickhouse.database, "retail");
        assert!(cfg.clickhouse.secure);
        assert_eq!(cfg.data.date_format, "%Y-%m-%d");
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/pulse.yaml")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn malformed_yaml_is_config_error() {
        let dir = std::env::temp_dir().join("pulse-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.yaml");
        std::fs::write(&path, "data: [not, a, mapping").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
