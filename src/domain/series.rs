//! Input series records: daily prices, oscillator flags, returns and benchmarks.

use chrono::NaiveDate;

/// One trading day of OHLCV data for a ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Externally computed oscillator state for one date.
///
/// `value` is the raw oscillator reading when the trade log carries one; the
/// signal engine only looks at `active`.
#[derive(Debug, Clone, PartialEq)]
pub struct OscillatorPoint {
    pub date: NaiveDate,
    pub active: bool,
    pub value: Option<f64>,
}

/// Pre-aggregated strategy return for one day, as a fraction (0.01 = 1%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyReturn {
    pub date: NaiveDate,
    pub value: f64,
}

/// Daily close of a benchmark index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkPoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// First and last date of a date-ordered series, `None` when empty.
pub fn date_range<T>(series: &[T], date_of: impl Fn(&T) -> NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = series.first().map(&date_of)?;
    let last = series.last().map(&date_of)?;
    Some((first, last))
}
