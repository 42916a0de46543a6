//! Plain-text table formatting for the scriptable `pulse query` output.
//!
//! Formatting lives in one place so the query layer stays clean and output
//! changes are localized.

use crate::domain::DateRange;
use crate::queries::{FactorsPoint, HolidayImpactRow, SalesPoint, StoreRank};

pub fn format_sales_over_time(points: &[SalesPoint], range: DateRange) -> String {
    let mut out = String::new();
    out.push_str(&format!("Weekly sales totals, {range}\n"));
    out.push_str(&format!("{:<12} {:>16}\n", "week_date", "sales_total"));
    out.push_str(&format!("{:-<12} {:-<16}\n", "", ""));
    for p in points {
        out.push_str(&format!(
            "{:<12} {:>16.2}\n",
            p.week_date.to_string(),
            p.weekly_sales_total
        ));
    }
    if points.is_empty() {
        out.push_str("(no data in range)\n");
    }
    out
}

pub fn format_store_ranking(ranks: &[StoreRank]) -> String {
    let mut out = String::new();
    out.push_str("Store ranking by average weekly sales (top 50)\n");
    out.push_str(&format!(
        "{:>5} {:>8} {:>16} {:>16}\n",
        "rank", "store", "avg_weekly", "total"
    ));
    out.push_str(&format!("{:-<5} {:-<8} {:-<16} {:-<16}\n", "", "", "", ""));
    for (i, r) in ranks.iter().enumerate() {
        out.push_str(&format!(
            "{:>5} {:>8} {:>16.2} {:>16.2}\n",
            i + 1,
            r.store,
            r.avg_weekly_sales,
            r.total_sales
        ));
    }
    if ranks.is_empty() {
        out.push_str("(no data)\n");
    }
    out
}

pub fn format_holiday_impact(rows: &[HolidayImpactRow]) -> String {
    let mut out = String::new();
    out.push_str("Average weekly sales: regular vs holiday weeks\n");
    out.push_str(&format!(
        "{:>8} {:>16} {:>16}\n",
        "store", "regular_avg", "holiday_avg"
    ));
    out.push_str(&format!("{:-<8} {:-<16} {:-<16}\n", "", "", ""));
    for r in rows {
        out.push_str(&format!(
            "{:>8} {:>16.2} {:>16.2}\n",
            r.store, r.regular_avg, r.holiday_avg
        ));
    }
    if rows.is_empty() {
        out.push_str("(no data)\n");
    }
    out
}

pub fn format_external_factors(points: &[FactorsPoint], range: DateRange) -> String {
    let mut out = String::new();
    out.push_str(&format!("Sales and external factors, {range}\n"));
    out.push_str(&format!(
        "{:<12} {:>14} {:>8} {:>8} {:>8} {:>8}\n",
        "week_date", "sales_total", "temp", "fuel", "cpi", "unemp"
    ));
    out.push_str(&format!(
        "{:-<12} {:-<14} {:-<8} {:-<8} {:-<8} {:-<8}\n",
        "", "", "", "", "", ""
    ));
    for p in points {
        out.push_str(&format!(
            "{:<12} {:>14.2} {:>8.2} {:>8.3} {:>8.2} {:>8.2}\n",
            p.week_date.to_string(),
            p.weekly_sales_total,
            p.avg_temperature,
            p.avg_fuel_price,
            p.avg_cpi,
            p.avg_unemployment
        ));
    }
    if points.is_empty() {
        out.push_str("(no data in range)\n");
    }
    out
}

pub fn format_bounds(bounds: DateRange) -> String {
    format!(
        "Observed week dates: {} to {}\n",
        bounds.start(),
        bounds.end()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn full_range() -> DateRange {
        DateRange::new(d(2010, 2, 5), d(2010, 2, 12)).unwrap()
    }

    #[test]
    fn sales_table_has_one_line_per_point() {
        let points = vec![
            SalesPoint {
                week_date: d(2010, 2, 5),
                weekly_sales_total: 24924.5,
            },
            SalesPoint {
                week_date: d(2010, 2, 12),
                weekly_sales_total: 46039.49,
            },
        ];
        let text = format_sales_over_time(&points, full_range());
        assert!(text.contains("2010-02-05"));
        assert!(text.contains("24924.50"));
        assert!(text.contains("46039.49"));
        // header + separator + 2 data rows
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn empty_results_render_a_placeholder_not_nothing() {
        let text = format_sales_over_time(&[], full_range());
        assert!(text.contains("(no data in range)"));
        let text = format_store_ranking(&[]);
        assert!(text.contains("(no data)"));
    }

    #[test]
    fn ranking_rows_are_numbered_from_one() {
        let ranks = vec![
            StoreRank {
                store: 20,
                avg_weekly_sales: 29508.3,
                total_sales: 4221573.9,
            },
            StoreRank {
                store: 4,
                avg_weekly_sales: 29161.2,
                total_sales: 4171059.6,
            },
        ];
        let text = format_store_ranking(&ranks);
        let rows: Vec<&str> = text.lines().skip(3).collect();
        assert!(rows[0].trim_start().starts_with('1'));
        assert!(rows[1].trim_start().starts_with('2'));
    }

    #[test]
    fn holiday_table_shows_zero_filled_columns() {
        let rows = vec![HolidayImpactRow {
            store: 3,
            regular_avg: 0.0,
            holiday_avg: 900.0,
        }];
        let text = format_holiday_impact(&rows);
        assert!(text.contains("0.00"));
        assert!(text.contains("900.00"));
    }
}
