//! Shared domain types.

use chrono::NaiveDate;

use crate::error::AppError;

/// One normalized row of the weekly sales export: a `(store, week)` observation
/// with its sales figure and the external factors recorded for that week.
///
/// Records are immutable once written to the store; there is no update or
/// delete path. `(store, week_date)` is *not* unique: reloading the same CSV
/// appends duplicates rather than merging them.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySalesRecord {
    pub store: u32,
    /// Calendar date identifying the reporting week (start-of-week convention
    /// assumed from the source data, not enforced).
    pub week_date: NaiveDate,
    pub weekly_sales: f64,
    /// Binary holiday indicator. The source promises {0, 1} but we coerce to
    /// `u8` without range-checking, matching the permissiveness of the
    /// original exports.
    pub holiday_flag: u8,
    pub temperature: f64,
    pub fuel_price: f64,
    pub cpi: f64,
    pub unemployment: f64,
}

/// An inclusive `[start, end]` date range.
///
/// Construction validates the ordering, so a `DateRange` value is always
/// well-formed and can be handed to the query layer without re-checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::Validation(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Clamp both endpoints into `bounds`. Used by the dashboard to keep the
    /// user-entered range inside the store's observed min/max dates.
    pub fn clamp_to(&self, bounds: DateRange) -> DateRange {
        DateRange {
            start: self.start.clamp(bounds.start, bounds.end),
            end: self.end.clamp(bounds.start, bounds.end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}
