//! CSV ingest and normalization.
//!
//! This module turns a weekly sales export into an ordered sequence of
//! `WeeklySalesRecord`s that are safe to hand to the bulk loader.
//!
//! Design goals:
//! - **Strict schema**: all eight domain columns must be present (by
//!   normalized name) or the operation fails with a clear error
//! - **Batch-fail coercion**: a single unparseable date or number aborts the
//!   whole ingest; there is no row-level skipping, so the output row count
//!   always equals the input row count
//! - **Order-preserving**: no deduplication, no sorting

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::WeeklySalesRecord;
use crate::error::AppError;

/// Domain columns required after header normalization. The source `date`
/// column becomes `week_date` in the store.
const REQUIRED_COLUMNS: [&str; 8] = [
    "store",
    "date",
    "weekly_sales",
    "holiday_flag",
    "temperature",
    "fuel_price",
    "cpi",
    "unemployment",
];

/// Load and normalize the CSV at `path`, parsing dates with `date_format`.
pub fn read_records(path: &Path, date_format: &str) -> Result<Vec<WeeklySalesRecord>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::DataFormat(format!("failed to open CSV '{}': {e}", path.display()))
    })?;
    read_records_from(file, date_format)
}

/// Normalize CSV content from any reader. Split out from [`read_records`] so
/// tests can feed in-memory fixtures.
pub fn read_records_from<R: Read>(
    reader: R,
    date_format: &str,
) -> Result<Vec<WeeklySalesRecord>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::DataFormat(format!("failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns(&header_map)?;

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;

        let record = result
            .map_err(|e| AppError::DataFormat(format!("line {line}: CSV parse error: {e}")))?;

        let parsed = parse_row(&record, &header_map, date_format)
            .map_err(|msg| AppError::DataFormat(format!("line {line}: {msg}")))?;
        records.push(parsed);
    }

    Ok(records)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header (e.g. "﻿Store"). If we don't strip it, schema validation
    // will incorrectly report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for name in REQUIRED_COLUMNS {
        if !header_map.contains_key(name) {
            return Err(AppError::DataFormat(format!(
                "missing required column: `{name}`"
            )));
        }
    }
    Ok(())
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    date_format: &str,
) -> Result<WeeklySalesRecord, String> {
    let store = parse_u32(get_field(record, header_map, "store")?, "store")?;
    let week_date = parse_date(get_field(record, header_map, "date")?, date_format)?;
    let weekly_sales = parse_f64(get_field(record, header_map, "weekly_sales")?, "weekly_sales")?;
    // Deliberately no {0,1} range check: the source format promises a binary
    // flag, and out-of-range values pass through unchanged.
    let holiday_flag = parse_u8(get_field(record, header_map, "holiday_flag")?, "holiday_flag")?;
    let temperature = parse_f64(get_field(record, header_map, "temperature")?, "temperature")?;
    let fuel_price = parse_f64(get_field(record, header_map, "fuel_price")?, "fuel_price")?;
    let cpi = parse_f64(get_field(record, header_map, "cpi")?, "cpi")?;
    let unemployment = parse_f64(get_field(record, header_map, "unemployment")?, "unemployment")?;

    Ok(WeeklySalesRecord {
        store,
        week_date,
        weekly_sales,
        holiday_flag,
        temperature,
        fuel_price,
        cpi,
        unemployment,
    })
}

fn get_field<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing value for `{name}`"))
}

fn parse_date(s: &str, format: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, format)
        .map_err(|_| format!("invalid date '{s}' (expected format '{format}')"))
}

fn parse_u32(s: &str, name: &str) -> Result<u32, String> {
    s.parse::<u32>()
        .map_err(|_| format!("invalid integer '{s}' for `{name}`"))
}

fn parse_u8(s: &str, name: &str) -> Result<u8, String> {
    s.parse::<u8>()
        .map_err(|_| format!("invalid integer '{s}' for `{name}`"))
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("invalid number '{s}' for `{name}`"))?;
    if !v.is_finite() {
        return Err(format!("non-finite number '{s}' for `{name}`"));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Store,Date,Weekly_Sales,Holiday_Flag,Temperature,Fuel_Price,CPI,Unemployment";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ingest(csv: &str) -> Result<Vec<WeeklySalesRecord>, AppError> {
        read_records_from(csv.as_bytes(), "%d-%m-%Y")
    }

    #[test]
    fn output_count_equals_input_count_and_order_is_preserved() {
        let csv = format!(
            "{HEADER}\n\
             1,05-02-2010,24924.5,0,42.31,2.572,211.0,8.1\n\
             1,12-02-2010,46039.49,1,38.51,2.548,211.24,8.1\n\
             2,05-02-2010,2136.99,0,40.19,2.572,210.75,8.3\n"
        );
        let records = ingest(&csv).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].store, 1);
        assert_eq!(records[0].week_date, d(2010, 2, 5));
        assert_eq!(records[1].week_date, d(2010, 2, 12));
        assert_eq!(records[2].store, 2);
        assert!((records[1].weekly_sales - 46039.49).abs() < 1e-9);
        assert_eq!(records[1].holiday_flag, 1);
    }

    #[test]
    fn headers_are_case_and_whitespace_insensitive() {
        let csv = " store , DATE ,Weekly_Sales,holiday_flag,Temperature,Fuel_Price,cpi,Unemployment\n\
                    1,05-02-2010,100.0,0,42.0,2.5,211.0,8.1\n";
        let records = ingest(csv).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn bom_on_first_header_is_stripped() {
        let csv = format!("\u{feff}{HEADER}\n1,05-02-2010,100.0,0,42.0,2.5,211.0,8.1\n");
        assert_eq!(ingest(&csv).unwrap().len(), 1);
    }

    #[test]
    fn missing_column_fails_before_reading_rows() {
        let csv = "Store,Date,Weekly_Sales,Holiday_Flag,Temperature,Fuel_Price,CPI\n\
                   1,05-02-2010,100.0,0,42.0,2.5,211.0\n";
        let err = ingest(csv).unwrap_err();
        match err {
            AppError::DataFormat(msg) => assert!(msg.contains("unemployment"), "{msg}"),
            other => panic!("expected DataFormat, got {other:?}"),
        }
    }

    #[test]
    fn one_bad_date_fails_the_whole_batch() {
        let csv = format!(
            "{HEADER}\n\
             1,05-02-2010,100.0,0,42.0,2.5,211.0,8.1\n\
             1,2010/02/12,200.0,0,42.0,2.5,211.0,8.1\n\
             1,19-02-2010,300.0,0,42.0,2.5,211.0,8.1\n"
        );
        let err = ingest(&csv).unwrap_err();
        match err {
            AppError::DataFormat(msg) => {
                assert!(msg.contains("line 3"), "{msg}");
                assert!(msg.contains("2010/02/12"), "{msg}");
            }
            other => panic!("expected DataFormat, got {other:?}"),
        }
    }

    #[test]
    fn one_bad_number_fails_the_whole_batch() {
        let csv = format!(
            "{HEADER}\n\
             1,05-02-2010,100.0,0,42.0,2.5,211.0,8.1\n\
             1,12-02-2010,n/a,0,42.0,2.5,211.0,8.1\n"
        );
        let err = ingest(&csv).unwrap_err();
        match err {
            AppError::DataFormat(msg) => assert!(msg.contains("weekly_sales"), "{msg}"),
            other => panic!("expected DataFormat, got {other:?}"),
        }
    }

    #[test]
    fn holiday_flag_outside_binary_range_is_accepted() {
        // The source format promises {0,1}; we intentionally do not enforce it.
        let csv = format!("{HEADER}\n1,05-02-2010,100.0,7,42.0,2.5,211.0,8.1\n");
        let records = ingest(&csv).unwrap();
        assert_eq!(records[0].holiday_flag, 7);
    }

    #[test]
    fn custom_date_format_is_honored() {
        let csv = format!("{HEADER}\n1,2010-02-05,100.0,0,42.0,2.5,211.0,8.1\n");
        let records = read_records_from(csv.as_bytes(), "%Y-%m-%d").unwrap();
        assert_eq!(records[0].week_date, d(2010, 2, 5));
    }

    #[test]
    fn missing_file_is_data_format_error() {
        let err = read_records(Path::new("/nonexistent/sales.csv"), "%d-%m-%Y").unwrap_err();
        assert!(matches!(err, AppError::DataFormat(_)));
    }
}
