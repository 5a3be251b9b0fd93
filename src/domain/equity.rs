//! Equity curve built from a pre-aggregated daily return stream.

use super::series::{BenchmarkPoint, DailyReturn};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_INITIAL_EQUITY: f64 = 50_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityCurveConfig {
    pub initial_equity: f64,
    /// Points on or after this date are flagged live. When a live source is
    /// supplied without a cutover, the first live date is used.
    pub cutover_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for EquityCurveConfig {
    fn default() -> Self {
        EquityCurveConfig {
            initial_equity: DEFAULT_INITIAL_EQUITY,
            cutover_date: None,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    /// Fractional return for the day.
    pub daily_return: f64,
    /// Positive percentage below the running peak.
    pub drawdown_pct: f64,
    pub is_live: bool,
    pub benchmark_equity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityYearlyStats {
    pub year: i32,
    pub profit_pct: f64,
    pub max_drawdown_pct: f64,
    pub start_equity: f64,
    pub end_equity: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
    pub yearly: Vec<EquityYearlyStats>,
}

impl EquityCurve {
    pub fn final_equity(&self) -> Option<f64> {
        self.points.last().map(|p| p.equity)
    }

    pub fn max_drawdown_pct(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.drawdown_pct)
            .fold(0.0, f64::max)
    }
}

/// Build the equity curve for `primary`, optionally continued by `live` from
/// the cutover date and compared against `benchmark`.
///
/// Inputs must be sorted by date. The date filter in `config` is applied
/// before compounding, so equity restarts from `initial_equity` at the first
/// retained date.
pub fn build_equity_curve(
    primary: &[DailyReturn],
    config: &EquityCurveConfig,
    live: Option<&[DailyReturn]>,
    benchmark: Option<&[BenchmarkPoint]>,
) -> EquityCurve {
    let in_range = |d: &NaiveDate| {
        config.start_date.is_none_or(|s| *d >= s) && config.end_date.is_none_or(|e| *d <= e)
    };

    let cutover = config
        .cutover_date
        .or_else(|| live.and_then(|l| l.first().map(|r| r.date)));

    let mut points: Vec<EquityPoint> = Vec::new();
    let mut equity = config.initial_equity;

    let primary_segment = primary.iter().filter(|r| {
        in_range(&r.date) && !(live.is_some() && cutover.is_some_and(|c| r.date >= c))
    });
    for r in primary_segment {
        equity *= 1.0 + r.value;
        points.push(new_point(r, equity, cutover));
    }

    if let (Some(live), Some(c)) = (live, cutover) {
        let last_primary = points.last().map(|p| p.equity);
        let mut raw = config.initial_equity;
        let mut scale: Option<f64> = None;
        for r in live.iter().filter(|r| r.date >= c && in_range(&r.date)) {
            raw *= 1.0 + r.value;
            let factor = *scale.get_or_insert_with(|| match last_primary {
                Some(last) if raw != 0.0 => last / raw,
                _ => 1.0,
            });
            points.push(new_point(r, raw * factor, cutover));
        }
    }

    apply_drawdown(&mut points);
    if let Some(bench) = benchmark {
        apply_benchmark(&mut points, bench);
    }
    let yearly = yearly_equity_stats(&points);

    EquityCurve { points, yearly }
}

fn new_point(r: &DailyReturn, equity: f64, cutover: Option<NaiveDate>) -> EquityPoint {
    EquityPoint {
        date: r.date,
        equity,
        daily_return: r.value,
        drawdown_pct: 0.0,
        is_live: cutover.is_some_and(|c| r.date >= c),
        benchmark_equity: None,
    }
}

fn apply_drawdown(points: &mut [EquityPoint]) {
    let mut peak = f64::NEG_INFINITY;
    for p in points.iter_mut() {
        peak = peak.max(p.equity);
        p.drawdown_pct = if peak != 0.0 {
            (peak - p.equity) / peak * 100.0
        } else {
            0.0
        };
    }
}

/// Rescale the benchmark so it equals the strategy equity on the first date
/// both series share. Dates absent from the benchmark stay `None`.
fn apply_benchmark(points: &mut [EquityPoint], benchmark: &[BenchmarkPoint]) {
    let closes: HashMap<NaiveDate, f64> = benchmark.iter().map(|b| (b.date, b.close)).collect();

    let anchor = points
        .iter()
        .find_map(|p| closes.get(&p.date).map(|&close| (close, p.equity)));
    let Some((anchor_close, anchor_equity)) = anchor else {
        return;
    };
    if anchor_close == 0.0 {
        return;
    }

    for p in points.iter_mut() {
        p.benchmark_equity = closes
            .get(&p.date)
            .map(|close| close / anchor_close * anchor_equity);
    }
}

/// Per-calendar-year profit and worst drawdown. Years with fewer than two
/// points are skipped.
pub fn yearly_equity_stats(points: &[EquityPoint]) -> Vec<EquityYearlyStats> {
    let mut by_year: BTreeMap<i32, Vec<&EquityPoint>> = BTreeMap::new();
    for p in points {
        by_year.entry(p.date.year()).or_default().push(p);
    }

    by_year
        .into_iter()
        .filter(|(_, group)| group.len() >= 2)
        .filter_map(|(year, group)| {
            let start_equity = group.first()?.equity;
            let end_equity = group.last()?.equity;
            let profit_pct = if start_equity > 0.0 {
                (end_equity / start_equity - 1.0) * 100.0
            } else {
                0.0
            };
            let max_drawdown_pct = group.iter().map(|p| p.drawdown_pct).fold(0.0, f64::max);
            Some(EquityYearlyStats {
                year,
                profit_pct,
                max_drawdown_pct,
                start_equity,
                end_equity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn returns(start: NaiveDate, values: &[f64]) -> Vec<DailyReturn> {
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| DailyReturn {
                date: start + chrono::Duration::days(i as i64),
                value,
            })
            .collect()
    }

    fn config(initial: f64) -> EquityCurveConfig {
        EquityCurveConfig {
            initial_equity: initial,
            ..Default::default()
        }
    }

    #[test]
    fn equity_compounds_from_initial() {
        let r = returns(date(2024, 1, 1), &[0.10, -0.20, 0.05]);
        let curve = build_equity_curve(&r, &config(1000.0), None, None);

        let eq: Vec<f64> = curve.points.iter().map(|p| p.equity).collect();
        assert_abs_diff_eq!(eq[0], 1100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eq[1], 880.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eq[2], 924.0, epsilon = 1e-9);
        assert_eq!(curve.final_equity(), Some(eq[2]));
    }

    #[test]
    fn drawdown_is_positive_from_running_peak() {
        let r = returns(date(2024, 1, 1), &[0.10, -0.20, 0.05]);
        let curve = build_equity_curve(&r, &config(1000.0), None, None);

        assert_abs_diff_eq!(curve.points[0].drawdown_pct, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.points[1].drawdown_pct, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.points[2].drawdown_pct, 16.0, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.max_drawdown_pct(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_input_gives_empty_curve() {
        let curve = build_equity_curve(&[], &EquityCurveConfig::default(), None, None);
        assert!(curve.points.is_empty());
        assert!(curve.yearly.is_empty());
        assert_eq!(curve.final_equity(), None);
    }

    #[test]
    fn date_filter_restarts_compounding() {
        let r = returns(date(2024, 1, 1), &[0.5, 0.1, 0.1, 0.5]);
        let cfg = EquityCurveConfig {
            initial_equity: 100.0,
            start_date: Some(date(2024, 1, 2)),
            end_date: Some(date(2024, 1, 3)),
            ..Default::default()
        };
        let curve = build_equity_curve(&r, &cfg, None, None);

        assert_eq!(curve.points.len(), 2);
        assert_abs_diff_eq!(curve.points[0].equity, 110.0, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.points[1].equity, 121.0, epsilon = 1e-9);
    }

    #[test]
    fn date_filter_excluding_everything() {
        let r = returns(date(2024, 1, 1), &[0.01, 0.02]);
        let cfg = EquityCurveConfig {
            start_date: Some(date(2025, 1, 1)),
            ..Default::default()
        };
        let curve = build_equity_curve(&r, &cfg, None, None);
        assert!(curve.points.is_empty());
    }

    #[test]
    fn cutover_without_live_source_marks_points() {
        let r = returns(date(2024, 1, 1), &[0.01, 0.01, 0.01, 0.01]);
        let cfg = EquityCurveConfig {
            cutover_date: Some(date(2024, 1, 3)),
            ..config(100.0)
        };
        let curve = build_equity_curve(&r, &cfg, None, None);

        let live: Vec<bool> = curve.points.iter().map(|p| p.is_live).collect();
        assert_eq!(live, vec![false, false, true, true]);
        assert_abs_diff_eq!(curve.points[3].equity, 100.0 * 1.01_f64.powi(4), epsilon = 1e-9);
    }

    #[test]
    fn live_segment_continues_from_last_primary_equity() {
        let primary = returns(date(2024, 1, 1), &[0.10, 0.10, 0.50, 0.50]);
        let live = returns(date(2024, 1, 3), &[0.02, 0.05]);
        let cfg = EquityCurveConfig {
            cutover_date: Some(date(2024, 1, 3)),
            ..config(100.0)
        };
        let curve = build_equity_curve(&primary, &cfg, Some(&live), None);

        assert_eq!(curve.points.len(), 4);
        let last_primary = 121.0;
        assert_abs_diff_eq!(curve.points[1].equity, last_primary, epsilon = 1e-9);
        assert!(!curve.points[1].is_live);

        // first live value is pinned to the last primary value
        assert_abs_diff_eq!(curve.points[2].equity, last_primary, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.points[3].equity, last_primary * 1.05, epsilon = 1e-9);
        assert!(curve.points[2].is_live && curve.points[3].is_live);
        assert_abs_diff_eq!(curve.points[2].daily_return, 0.02, epsilon = 1e-12);
    }

    #[test]
    fn live_without_cutover_starts_at_first_live_date() {
        let primary = returns(date(2024, 1, 1), &[0.10, 0.10, 0.10]);
        let live = returns(date(2024, 1, 3), &[0.0, 0.10]);
        let curve = build_equity_curve(&primary, &config(100.0), Some(&live), None);

        assert_eq!(curve.points.len(), 4);
        assert!(!curve.points[1].is_live);
        assert!(curve.points[2].is_live);
        assert_abs_diff_eq!(curve.points[2].equity, 121.0, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.points[3].equity, 133.1, epsilon = 1e-9);
    }

    #[test]
    fn live_without_primary_segment_is_not_rescaled() {
        let primary = returns(date(2024, 1, 5), &[0.10]);
        let live = returns(date(2024, 1, 1), &[0.10, 0.10]);
        let cfg = EquityCurveConfig {
            cutover_date: Some(date(2024, 1, 1)),
            ..config(100.0)
        };
        let curve = build_equity_curve(&primary, &cfg, Some(&live), None);

        assert_eq!(curve.points.len(), 2);
        assert_abs_diff_eq!(curve.points[0].equity, 110.0, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.points[1].equity, 121.0, epsilon = 1e-9);
    }

    #[test]
    fn benchmark_anchors_at_first_common_date() {
        let r = returns(date(2024, 1, 1), &[0.10, 0.10, 0.10]);
        let bench = vec![
            BenchmarkPoint { date: date(2024, 1, 2), close: 400.0 },
            BenchmarkPoint { date: date(2024, 1, 3), close: 440.0 },
        ];
        let curve = build_equity_curve(&r, &config(100.0), None, Some(&bench));

        assert_eq!(curve.points[0].benchmark_equity, None);
        assert_abs_diff_eq!(curve.points[1].benchmark_equity.unwrap(), 121.0, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.points[2].benchmark_equity.unwrap(), 133.1, epsilon = 1e-9);
    }

    #[test]
    fn benchmark_gap_is_none() {
        let r = returns(date(2024, 1, 1), &[0.0, 0.0, 0.0]);
        let bench = vec![
            BenchmarkPoint { date: date(2024, 1, 1), close: 10.0 },
            BenchmarkPoint { date: date(2024, 1, 3), close: 12.0 },
        ];
        let curve = build_equity_curve(&r, &config(50.0), None, Some(&bench));

        assert_abs_diff_eq!(curve.points[0].benchmark_equity.unwrap(), 50.0, epsilon = 1e-9);
        assert_eq!(curve.points[1].benchmark_equity, None);
        assert_abs_diff_eq!(curve.points[2].benchmark_equity.unwrap(), 60.0, epsilon = 1e-9);
    }

    #[test]
    fn benchmark_without_overlap_leaves_none() {
        let r = returns(date(2024, 1, 1), &[0.01]);
        let bench = vec![BenchmarkPoint { date: date(2023, 1, 1), close: 10.0 }];
        let curve = build_equity_curve(&r, &config(50.0), None, Some(&bench));
        assert!(curve.points.iter().all(|p| p.benchmark_equity.is_none()));
    }

    #[test]
    fn yearly_stats_skip_single_point_years() {
        let mut r = returns(date(2023, 12, 29), &[0.10, 0.10]);
        r.push(DailyReturn { date: date(2024, 1, 2), value: -0.10 });
        r.push(DailyReturn { date: date(2024, 1, 3), value: 0.20 });
        r.push(DailyReturn { date: date(2025, 1, 2), value: 0.01 });
        let curve = build_equity_curve(&r, &config(100.0), None, None);

        let years: Vec<i32> = curve.yearly.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2023, 2024]);

        let y2023 = &curve.yearly[0];
        assert_abs_diff_eq!(y2023.start_equity, 110.0, epsilon = 1e-9);
        assert_abs_diff_eq!(y2023.end_equity, 121.0, epsilon = 1e-9);
        assert_abs_diff_eq!(y2023.profit_pct, 10.0, epsilon = 1e-9);

        let y2024 = &curve.yearly[1];
        // 121 -> 108.9 -> 130.68
        assert_abs_diff_eq!(y2024.profit_pct, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(y2024.max_drawdown_pct, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn yearly_profit_zero_for_non_positive_start() {
        let points = vec![
            EquityPoint {
                date: date(2024, 1, 1),
                equity: 0.0,
                daily_return: -1.0,
                drawdown_pct: 100.0,
                is_live: false,
                benchmark_equity: None,
            },
            EquityPoint {
                date: date(2024, 1, 2),
                equity: 0.0,
                daily_return: 0.0,
                drawdown_pct: 100.0,
                is_live: false,
                benchmark_equity: None,
            },
        ];
        let stats = yearly_equity_stats(&points);
        assert_eq!(stats[0].profit_pct, 0.0);
        assert_eq!(stats[0].max_drawdown_pct, 100.0);
    }
}
