//! JSON report adapter implementing ReportPort.
//!
//! The DTOs below are the only place numbers are rounded: two decimals for
//! prices, percentages and ratios, one for average hold, and daily returns
//! as a percentage with four decimals.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::domain::analysis::{BranchAnalysis, BranchOverview};
use crate::domain::equity::{EquityCurve, EquityPoint, EquityYearlyStats};
use crate::domain::error::SlopeFilterError;
use crate::domain::metrics::{PerformanceMetrics, YearlyStats, round_to};
use crate::domain::signal::SignalParams;
use crate::domain::trade::TradeSignal;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Serialize, PartialEq)]
pub struct ParamsReport {
    pub slope_window: usize,
    pub pos_threshold: f64,
    pub neg_threshold: f64,
    pub mode: String,
}

impl From<&SignalParams> for ParamsReport {
    fn from(p: &SignalParams) -> Self {
        ParamsReport {
            slope_window: p.slope_window,
            pos_threshold: p.pos_threshold,
            neg_threshold: p.neg_threshold,
            mode: p.mode.to_string(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MetricsReport {
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

impl From<&PerformanceMetrics> for MetricsReport {
    fn from(m: &PerformanceMetrics) -> Self {
        let m = m.rounded();
        MetricsReport {
            total_return: m.total_return,
            win_rate: m.win_rate,
            max_drawdown: m.max_drawdown,
            num_trades: m.num_trades,
            time_in_market: m.time_in_market,
            avg_days_held: m.avg_days_held,
            avg_return: m.avg_return,
            sharpe_ratio: m.sharpe_ratio,
            volatility: m.volatility,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TradeReport {
    pub entry_date: String,
    pub exit_date: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub return_pct: f64,
    pub days_held: i64,
    pub entry_type: String,
}

impl From<&TradeSignal> for TradeReport {
    fn from(t: &TradeSignal) -> Self {
        TradeReport {
            entry_date: t.entry_date.to_string(),
            exit_date: t.exit_date.to_string(),
            entry_price: round_to(t.entry_price, 2),
            exit_price: round_to(t.exit_price, 2),
            return_pct: round_to(t.return_pct, 2),
            days_held: t.days_held,
            entry_type: t.entry_type.to_string(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct YearlyReport {
    pub year: i32,
    pub return_pct: f64,
    pub max_drawdown: f64,
    pub trades: usize,
    pub avg_hold: f64,
}

impl From<&YearlyStats> for YearlyReport {
    fn from(y: &YearlyStats) -> Self {
        let y = y.rounded();
        YearlyReport {
            year: y.year,
            return_pct: y.return_pct,
            max_drawdown: y.max_drawdown,
            trades: y.trades,
            avg_hold: y.avg_hold,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AnalysisReport {
    pub branch: String,
    pub ticker: String,
    pub params: ParamsReport,
    pub metrics: Option<MetricsReport>,
    pub trades: Vec<TradeReport>,
    pub yearly_stats: Vec<YearlyReport>,
    pub open_position_at_end: bool,
}

impl From<&BranchAnalysis> for AnalysisReport {
    fn from(a: &BranchAnalysis) -> Self {
        AnalysisReport {
            branch: a.branch.clone(),
            ticker: a.ticker.clone(),
            params: ParamsReport::from(&a.params),
            metrics: a.metrics.as_ref().map(MetricsReport::from),
            trades: a.signals.trades.iter().map(TradeReport::from).collect(),
            yearly_stats: a.yearly.iter().map(YearlyReport::from).collect(),
            open_position_at_end: a.signals.open_position_at_end(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct OverviewReport {
    pub ticker: String,
    pub branch: String,
    pub period: String,
    pub return_pct: f64,
    pub cagr: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub trades: usize,
    pub sharpe: f64,
    pub time_in_market: f64,
}

impl From<&BranchOverview> for OverviewReport {
    fn from(o: &BranchOverview) -> Self {
        OverviewReport {
            ticker: o.ticker.clone(),
            branch: o.branch.clone(),
            period: o.period.clone(),
            return_pct: round_to(o.return_pct, 2),
            cagr: round_to(o.cagr, 2),
            win_rate: round_to(o.win_rate, 2),
            max_drawdown: round_to(o.max_drawdown, 2),
            trades: o.trades,
            sharpe: round_to(o.sharpe, 2),
            time_in_market: round_to(o.time_in_market, 2),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct EquityPointReport {
    pub date: String,
    pub equity: f64,
    /// Percent.
    pub daily_return: f64,
    pub drawdown_pct: f64,
    pub is_live: bool,
    pub benchmark_equity: Option<f64>,
}

impl From<&EquityPoint> for EquityPointReport {
    fn from(p: &EquityPoint) -> Self {
        EquityPointReport {
            date: p.date.to_string(),
            equity: round_to(p.equity, 2),
            daily_return: round_to(p.daily_return * 100.0, 4),
            drawdown_pct: round_to(p.drawdown_pct, 2),
            is_live: p.is_live,
            benchmark_equity: p.benchmark_equity.map(|b| round_to(b, 2)),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct EquityYearlyReport {
    pub year: i32,
    pub profit_pct: f64,
    pub max_drawdown_pct: f64,
    pub start_equity: f64,
    pub end_equity: f64,
}

impl From<&EquityYearlyStats> for EquityYearlyReport {
    fn from(y: &EquityYearlyStats) -> Self {
        EquityYearlyReport {
            year: y.year,
            profit_pct: round_to(y.profit_pct, 2),
            max_drawdown_pct: round_to(y.max_drawdown_pct, 2),
            start_equity: round_to(y.start_equity, 2),
            end_equity: round_to(y.end_equity, 2),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct EquityReport {
    pub data: Vec<EquityPointReport>,
    pub yearly_stats: Vec<EquityYearlyReport>,
}

impl From<&EquityCurve> for EquityReport {
    fn from(c: &EquityCurve) -> Self {
        EquityReport {
            data: c.points.iter().map(EquityPointReport::from).collect(),
            yearly_stats: c.yearly.iter().map(EquityYearlyReport::from).collect(),
        }
    }
}

/// Writes reports as pretty-printed JSON.
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    fn write_json<T: Serialize>(value: &T, output_path: &Path) -> Result<(), SlopeFilterError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| SlopeFilterError::Report {
            reason: e.to_string(),
        })?;
        fs::write(output_path, json)?;
        info!(path = %output_path.display(), "report written");
        Ok(())
    }
}

impl ReportPort for JsonReportAdapter {
    fn write_analysis(&self, analysis: &BranchAnalysis, output_path: &Path) -> Result<(), SlopeFilterError> {
        Self::write_json(&AnalysisReport::from(analysis), output_path)
    }

    fn write_overview(&self, rows: &[BranchOverview], output_path: &Path) -> Result<(), SlopeFilterError> {
        let report: Vec<OverviewReport> = rows.iter().map(OverviewReport::from).collect();
        Self::write_json(&report, output_path)
    }

    fn write_equity(&self, curve: &EquityCurve, output_path: &Path) -> Result<(), SlopeFilterError> {
        Self::write_json(&EquityReport::from(curve), output_path)
    }
}
