//! Trade-level performance metrics and statistics.
//!
//! Values are kept at full precision here; rounding for display happens in
//! [`PerformanceMetrics::rounded`] and [`YearlyStats::rounded`] at the
//! output boundary.

use super::trade::TradeSignal;
use chrono::Datelike;
use std::collections::BTreeMap;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;
pub const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    /// Arithmetic sum of trade returns in percent, not compounded.
    pub total_return: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub num_trades: usize,
    pub time_in_market: f64,
    pub avg_days_held: f64,
    pub avg_return: f64,
    pub sharpe_ratio: f64,
    pub volatility: f64,
}

impl PerformanceMetrics {
    /// Metrics over `trades` with the default 2% risk-free rate.
    /// `None` when there are no trades.
    pub fn compute(trades: &[TradeSignal]) -> Option<Self> {
        Self::compute_with_risk_free(trades, DEFAULT_RISK_FREE_RATE)
    }

    pub fn compute_with_risk_free(trades: &[TradeSignal], risk_free_rate: f64) -> Option<Self> {
        if trades.is_empty() {
            return None;
        }

        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
        let num_trades = trades.len();
        let n = num_trades as f64;

        let total_return: f64 = returns.iter().sum();
        let wins = returns.iter().filter(|&&r| r > 0.0).count();
        let win_rate = wins as f64 / n * 100.0;
        let avg_return = total_return / n;

        let total_days_held: i64 = trades.iter().map(|t| t.days_held).sum();
        let avg_days_held = total_days_held as f64 / n;

        let (first_entry, last_exit) = trade_span(trades)?;
        let span_days = (last_exit - first_entry).num_days();
        let time_in_market = if span_days > 0 {
            total_days_held as f64 / span_days as f64 * 100.0
        } else {
            0.0
        };

        Some(PerformanceMetrics {
            total_return,
            win_rate,
            max_drawdown: max_drawdown(&returns),
            num_trades,
            time_in_market,
            avg_days_held,
            avg_return,
            sharpe_ratio: sharpe_ratio(&returns, risk_free_rate),
            volatility: population_stddev(&returns),
        })
    }

    pub fn rounded(&self) -> Self {
        PerformanceMetrics {
            total_return: round_to(self.total_return, 2),
            win_rate: round_to(self.win_rate, 2),
            max_drawdown: round_to(self.max_drawdown, 2),
            num_trades: self.num_trades,
            time_in_market: round_to(self.time_in_market, 2),
            avg_days_held: round_to(self.avg_days_held, 2),
            avg_return: round_to(self.avg_return, 2),
            sharpe_ratio: round_to(self.sharpe_ratio, 2),
            volatility: round_to(self.volatility, 2),
        }
    }
}

/// Statistics over the trades that exited in `year`.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyStats {
    pub year: i32,
    pub return_pct: f64,
    pub max_drawdown: f64,
    pub trades: usize,
    pub avg_hold: f64,
}

impl YearlyStats {
    pub fn rounded(&self) -> Self {
        YearlyStats {
            year: self.year,
            return_pct: round_to(self.return_pct, 2),
            max_drawdown: round_to(self.max_drawdown, 2),
            trades: self.trades,
            avg_hold: round_to(self.avg_hold, 1),
        }
    }
}

/// Group trades by exit year, ascending. Each year's drawdown restarts from a
/// fresh equity of 1.0.
pub fn compute_yearly_stats(trades: &[TradeSignal]) -> Vec<YearlyStats> {
    let mut by_year: BTreeMap<i32, Vec<&TradeSignal>> = BTreeMap::new();
    for trade in trades {
        by_year.entry(trade.exit_date.year()).or_default().push(trade);
    }

    by_year
        .into_iter()
        .map(|(year, year_trades)| {
            let returns: Vec<f64> = year_trades.iter().map(|t| t.return_pct).collect();
            let total_hold: i64 = year_trades.iter().map(|t| t.days_held).sum();
            YearlyStats {
                year,
                return_pct: returns.iter().sum(),
                max_drawdown: max_drawdown(&returns),
                trades: year_trades.len(),
                avg_hold: total_hold as f64 / year_trades.len() as f64,
            }
        })
        .collect()
}

/// Most negative drawdown, in percent, of the equity path obtained by
/// compounding `returns` (percent). 0 for no returns.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0_f64;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for r in returns {
        equity *= 1.0 + r / 100.0;
        peak = peak.max(equity);
        let dd = (equity / peak - 1.0) * 100.0;
        if dd < worst {
            worst = dd;
        }
    }
    worst
}

/// Annualised Sharpe ratio treating each return (percent) as one daily
/// observation.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let std = population_stddev(returns);
    if std == 0.0 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let excess = mean / 100.0 - daily_rf;
    (excess * TRADING_DAYS_PER_YEAR.sqrt()) / (std / 100.0)
}

/// Compound annual growth rate in percent from a total return in percent.
pub fn compute_cagr(total_return_pct: f64, years: f64) -> f64 {
    if years <= 0.0 {
        return 0.0;
    }
    let multiplier = 1.0 + total_return_pct / 100.0;
    if multiplier <= 0.0 {
        return -100.0;
    }
    (multiplier.powf(1.0 / years) - 1.0) * 100.0
}

/// Earliest entry and latest exit across `trades`.
pub fn trade_span(
    trades: &[TradeSignal],
) -> Option<(chrono::NaiveDate, chrono::NaiveDate)> {
    let first_entry = trades.iter().map(|t| t.entry_date).min()?;
    let last_exit = trades.iter().map(|t| t.exit_date).max()?;
    Some((first_entry, last_exit))
}

/// Elapsed years between the first entry and last exit, using 365.25-day years.
pub fn trade_span_years(trades: &[TradeSignal]) -> f64 {
    trade_span(trades)
        .map(|(first, last)| (last - first).num_days() as f64 / DAYS_PER_YEAR)
        .unwrap_or(0.0)
}

fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}
