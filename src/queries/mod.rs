//! The four fixed aggregation query shapes feeding the dashboard, plus the
//! date-bounds lookup.
//!
//! Each shape is a pure function of a date range (or of nothing): build the
//! parameterized SQL, run it through the session cache, decode the tabular
//! result into typed rows. Parameters always travel as named `{name:Date}`
//! placeholders, never interpolated into the SQL text.
//!
//! All shapes tolerate an empty table by returning zero rows. The one
//! exception is [`date_bounds`], which fails with `EmptyResult`: the
//! range-driven dashboard pages cannot function without observed min/max
//! dates to clamp against.

use chrono::NaiveDate;
use serde_json::Value;

use crate::domain::DateRange;
use crate::error::AppError;
use crate::store::{self, ClickhouseClient, QueryCache, Table};

pub const SALES_OVER_TIME_SQL: &str = "\
SELECT
    week_date,
    sum(weekly_sales) AS weekly_sales_total
FROM weekly_sales
WHERE week_date BETWEEN {start:Date} AND {end:Date}
GROUP BY week_date
ORDER BY week_date";

pub const STORE_RANKING_SQL: &str = "\
SELECT
    store,
    avg(weekly_sales) AS avg_weekly_sales,
    sum(weekly_sales) AS total_sales
FROM weekly_sales
GROUP BY store
ORDER BY avg_weekly_sales DESC
LIMIT 50";

pub const HOLIDAY_IMPACT_SQL: &str = "\
SELECT
    store,
    holiday_flag,
    avg(weekly_sales) AS avg_weekly_sales
FROM weekly_sales
GROUP BY store, holiday_flag
ORDER BY store, holiday_flag";

pub const EXTERNAL_FACTORS_SQL: &str = "\
SELECT
    week_date,
    sum(weekly_sales) AS weekly_sales_total,
    avg(temperature) AS avg_temperature,
    avg(fuel_price) AS avg_fuel_price,
    avg(cpi) AS avg_cpi,
    avg(unemployment) AS avg_unemployment
FROM weekly_sales
WHERE week_date BETWEEN {start:Date} AND {end:Date}
GROUP BY week_date
ORDER BY week_date";

/// min/max over an empty Date column yields epoch defaults rather than an
/// empty result set, so the row count travels along to make emptiness
/// detectable.
pub const DATE_BOUNDS_SQL: &str = "\
SELECT
    min(week_date) AS min_date,
    max(week_date) AS max_date,
    count() AS n
FROM weekly_sales";

/// One point of the network-wide sales time series.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesPoint {
    pub week_date: NaiveDate,
    pub weekly_sales_total: f64,
}

/// One row of the store ranking (descending by average weekly sales).
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRank {
    pub store: u32,
    pub avg_weekly_sales: f64,
    pub total_sales: f64,
}

/// One store's holiday-vs-regular average sales, zero-filled where the store
/// has no weeks of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct HolidayImpactRow {
    pub store: u32,
    pub regular_avg: f64,
    pub holiday_avg: f64,
}

/// One point of the external-factors time series.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorsPoint {
    pub week_date: NaiveDate,
    pub weekly_sales_total: f64,
    pub avg_temperature: f64,
    pub avg_fuel_price: f64,
    pub avg_cpi: f64,
    pub avg_unemployment: f64,
}

/// Weekly sales totals within `range`, ascending by week. No gap-filling for
/// missing weeks.
pub fn sales_over_time(
    client: &ClickhouseClient,
    cache: &mut QueryCache,
    range: DateRange,
) -> Result<Vec<SalesPoint>, AppError> {
    let table = store::query_cached(client, cache, SALES_OVER_TIME_SQL, &range_params(range))?;
    decode_sales_over_time(&table)
}

/// Top-50 stores by mean weekly sales across all history.
pub fn store_ranking(
    client: &ClickhouseClient,
    cache: &mut QueryCache,
) -> Result<Vec<StoreRank>, AppError> {
    let table = store::query_cached(client, cache, STORE_RANKING_SQL, &[])?;
    decode_store_ranking(&table)
}

/// Average weekly sales per store, split into regular vs holiday weeks.
pub fn holiday_impact(
    client: &ClickhouseClient,
    cache: &mut QueryCache,
) -> Result<Vec<HolidayImpactRow>, AppError> {
    let table = store::query_cached(client, cache, HOLIDAY_IMPACT_SQL, &[])?;
    let groups = decode_holiday_groups(&table)?;
    Ok(pivot_holiday(&groups))
}

/// Weekly sales totals plus mean external factors within `range`.
pub fn external_factors(
    client: &ClickhouseClient,
    cache: &mut QueryCache,
    range: DateRange,
) -> Result<Vec<FactorsPoint>, AppError> {
    let table = store::query_cached(client, cache, EXTERNAL_FACTORS_SQL, &range_params(range))?;
    decode_external_factors(&table)
}

/// Observed min/max week dates in the store.
///
/// Fails with `EmptyResult` when the table has no rows: the range-driven
/// pages need real bounds to clamp their date inputs against.
pub fn date_bounds(
    client: &ClickhouseClient,
    cache: &mut QueryCache,
) -> Result<DateRange, AppError> {
    let table = store::query_cached(client, cache, DATE_BOUNDS_SQL, &[])?;
    decode_date_bounds(&table)
}

fn range_params(range: DateRange) -> Vec<(String, String)> {
    vec![
        ("start".to_string(), range.start().to_string()),
        ("end".to_string(), range.end().to_string()),
    ]
}

pub fn decode_sales_over_time(table: &Table) -> Result<Vec<SalesPoint>, AppError> {
    let cols = Columns::resolve(table, &["week_date", "weekly_sales_total"])?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            Ok(SalesPoint {
                week_date: cols.date(row, 0, i)?,
                weekly_sales_total: cols.f64(row, 1, i)?,
            })
        })
        .collect()
}

pub fn decode_store_ranking(table: &Table) -> Result<Vec<StoreRank>, AppError> {
    let cols = Columns::resolve(table, &["store", "avg_weekly_sales", "total_sales"])?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            Ok(StoreRank {
                store: cols.u32(row, 0, i)?,
                avg_weekly_sales: cols.f64(row, 1, i)?,
                total_sales: cols.f64(row, 2, i)?,
            })
        })
        .collect()
}

/// Raw `(store, holiday_flag, avg_weekly_sales)` groups before pivoting.
pub fn decode_holiday_groups(table: &Table) -> Result<Vec<(u32, u8, f64)>, AppError> {
    let cols = Columns::resolve(table, &["store", "holiday_flag", "avg_weekly_sales"])?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let store = cols.u32(row, 0, i)?;
            let flag = cols.u32(row, 1, i)?;
            let avg = cols.f64(row, 2, i)?;
            Ok((store, flag.min(u8::MAX as u32) as u8, avg))
        })
        .collect()
}

pub fn decode_external_factors(table: &Table) -> Result<Vec<FactorsPoint>, AppError> {
    let cols = Columns::resolve(
        table,
        &[
            "week_date",
            "weekly_sales_total",
            "avg_temperature",
            "avg_fuel_price",
            "avg_cpi",
            "avg_unemployment",
        ],
    )?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            Ok(FactorsPoint {
                week_date: cols.date(row, 0, i)?,
                weekly_sales_total: cols.f64(row, 1, i)?,
                avg_temperature: cols.f64(row, 2, i)?,
                avg_fuel_price: cols.f64(row, 3, i)?,
                avg_cpi: cols.f64(row, 4, i)?,
                avg_unemployment: cols.f64(row, 5, i)?,
            })
        })
        .collect()
}

pub fn decode_date_bounds(table: &Table) -> Result<DateRange, AppError> {
    let cols = Columns::resolve(table, &["min_date", "max_date", "n"])?;
    let Some(row) = table.rows.first() else {
        return Err(AppError::EmptyResult(
            "date-bounds query returned no rows".to_string(),
        ));
    };
    let n = cols.f64(row, 2, 0)?;
    if n == 0.0 {
        return Err(AppError::EmptyResult(
            "the weekly_sales table has no data".to_string(),
        ));
    }
    DateRange::new(cols.date(row, 0, 0)?, cols.date(row, 1, 0)?)
}

/// Reshape `(store, flag, avg)` groups into one row per store, with missing
/// flag combinations filled with 0.0. Output is ascending by store id.
pub fn pivot_holiday(groups: &[(u32, u8, f64)]) -> Vec<HolidayImpactRow> {
    let mut by_store: std::collections::BTreeMap<u32, HolidayImpactRow> =
        std::collections::BTreeMap::new();
    for &(store, flag, avg) in groups {
        let row = by_store.entry(store).or_insert(HolidayImpactRow {
            store,
            regular_avg: 0.0,
            holiday_avg: 0.0,
        });
        // Any non-zero flag counts as a holiday week; the ingest side is
        // equally permissive about values outside {0, 1}.
        if flag == 0 {
            row.regular_avg = avg;
        } else {
            row.holiday_avg = avg;
        }
    }
    by_store.into_values().collect()
}

/// Typed access to resolved column positions.
struct Columns {
    indices: Vec<usize>,
}

impl Columns {
    fn resolve(table: &Table, names: &[&str]) -> Result<Self, AppError> {
        let indices = names
            .iter()
            .map(|name| {
                table.column_index(name).ok_or_else(|| {
                    AppError::Query(format!("result is missing expected column `{name}`"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { indices })
    }

    fn cell<'a>(&self, row: &'a [Value], slot: usize, row_idx: usize) -> Result<&'a Value, AppError> {
        row.get(self.indices[slot]).ok_or_else(|| {
            AppError::Query(format!("row {row_idx} is shorter than the column list"))
        })
    }

    fn f64(&self, row: &[Value], slot: usize, row_idx: usize) -> Result<f64, AppError> {
        let cell = self.cell(row, slot, row_idx)?;
        // ClickHouse emits 64-bit integers as strings unless told otherwise;
        // we ask for plain numbers but accept both.
        if let Some(v) = cell.as_f64() {
            return Ok(v);
        }
        if let Some(s) = cell.as_str() {
            if let Ok(v) = s.parse::<f64>() {
                return Ok(v);
            }
        }
        Err(AppError::Query(format!(
            "row {row_idx}: expected a number, got {cell}"
        )))
    }

    fn u32(&self, row: &[Value], slot: usize, row_idx: usize) -> Result<u32, AppError> {
        let v = self.f64(row, slot, row_idx)?;
        if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
            return Err(AppError::Query(format!(
                "row {row_idx}: expected an unsigned integer, got {v}"
            )));
        }
        Ok(v as u32)
    }

    fn date(&self, row: &[Value], slot: usize, row_idx: usize) -> Result<NaiveDate, AppError> {
        let cell = self.cell(row, slot, row_idx)?;
        let Some(s) = cell.as_str() else {
            return Err(AppError::Query(format!(
                "row {row_idx}: expected a date string, got {cell}"
            )));
        };
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| AppError::Query(format!("row {row_idx}: invalid date '{s}'")))
    }
}
