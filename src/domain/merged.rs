//! Date-aligned join of a price series with an oscillator trade log.

use crate::domain::series::{OscillatorPoint, PricePoint};
use crate::domain::slope::calculate_slope;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub date: NaiveDate,
    /// `None` when the price series has no bar for this date.
    pub close: Option<f64>,
    pub active: bool,
    /// `None` during the slope warmup and for any window with a missing close.
    pub slope: Option<f64>,
}

/// Left-join `prices` onto the `oscillator` log by date and attach the slope
/// of the joined closes over `slope_window`.
///
/// Every trade-log date is kept; a date without a price bar carries no close
/// and blanks the slope of each window it falls in. The result is in strictly
/// increasing date order regardless of input order.
pub fn merge_series(
    prices: &[PricePoint],
    oscillator: &[OscillatorPoint],
    slope_window: usize,
) -> Vec<MergedRow> {
    let by_date: HashMap<NaiveDate, f64> = prices.iter().map(|p| (p.date, p.close)).collect();

    let mut rows: Vec<MergedRow> = oscillator
        .iter()
        .map(|osc| MergedRow {
            date: osc.date,
            close: by_date.get(&osc.date).copied(),
            active: osc.active,
            slope: None,
        })
        .collect();
    rows.sort_by_key(|r| r.date);
    rows.dedup_by_key(|r| r.date);

    let closes: Vec<f64> = rows.iter().map(|r| r.close.unwrap_or(f64::NAN)).collect();
    for (row, slope) in rows.iter_mut().zip(calculate_slope(&closes, slope_window)) {
        row.slope = slope;
    }
    rows
}
