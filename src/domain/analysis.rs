//! Per-branch analysis pipeline and the parallel overview across branches.
//!
//! Loading goes through a [`DataPort`]; everything after loading is the pure
//! signal/metrics core. Results are memoised in a [`ResultCache`] keyed by
//! the content of the loaded series.

use super::branch::extract_ticker;
use super::cache::{CacheKey, ResultCache};
use super::error::SlopeFilterError;
use super::metrics::{
    PerformanceMetrics, YearlyStats, compute_cagr, compute_yearly_stats, trade_span,
    trade_span_years,
};
use super::series::{OscillatorPoint, PricePoint};
use super::signal::{SignalParams, SignalResult, run_signal_engine};
use crate::ports::data_port::DataPort;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_WORKERS: usize = 8;

/// Signal output and statistics for one set of inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub signals: SignalResult,
    pub metrics: Option<PerformanceMetrics>,
    pub yearly: Vec<YearlyStats>,
}

impl Evaluation {
    pub fn compute(
        prices: &[PricePoint],
        oscillator: &[OscillatorPoint],
        params: &SignalParams,
        risk_free_rate: f64,
    ) -> Self {
        let signals = run_signal_engine(prices, oscillator, params);
        let metrics = PerformanceMetrics::compute_with_risk_free(&signals.trades, risk_free_rate);
        let yearly = compute_yearly_stats(&signals.trades);
        Evaluation {
            signals,
            metrics,
            yearly,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchAnalysis {
    pub branch: String,
    pub ticker: String,
    pub params: SignalParams,
    pub signals: SignalResult,
    /// `None` when the branch produced no completed trades.
    pub metrics: Option<PerformanceMetrics>,
    pub yearly: Vec<YearlyStats>,
}

/// One row of the cross-branch overview table.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchOverview {
    pub ticker: String,
    pub branch: String,
    /// `"first_entry to last_exit"`.
    pub period: String,
    pub return_pct: f64,
    pub cagr: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub trades: usize,
    pub sharpe: f64,
    pub time_in_market: f64,
}

impl BranchOverview {
    /// `None` when the analysis has no trades.
    pub fn from_analysis(analysis: &BranchAnalysis) -> Option<Self> {
        let metrics = analysis.metrics.as_ref()?;
        let trades = &analysis.signals.trades;
        let (first_entry, last_exit) = trade_span(trades)?;

        Some(BranchOverview {
            ticker: analysis.ticker.clone(),
            branch: analysis.branch.clone(),
            period: format!("{first_entry} to {last_exit}"),
            return_pct: metrics.total_return,
            cagr: compute_cagr(metrics.total_return, trade_span_years(trades)),
            win_rate: metrics.win_rate,
            max_drawdown: metrics.max_drawdown,
            trades: metrics.num_trades,
            sharpe: metrics.sharpe_ratio,
            time_in_market: metrics.time_in_market,
        })
    }
}

/// Load and analyse `branch` without caching.
pub fn analyze_branch(
    data: &dyn DataPort,
    branch: &str,
    params: &SignalParams,
    risk_free_rate: f64,
) -> Result<BranchAnalysis, SlopeFilterError> {
    let (ticker, prices, oscillator) = load_branch(data, branch)?;
    let eval = Evaluation::compute(&prices, &oscillator, params, risk_free_rate);
    Ok(into_analysis(branch, ticker, params, &eval))
}

fn load_branch(
    data: &dyn DataPort,
    branch: &str,
) -> Result<(String, Vec<PricePoint>, Vec<OscillatorPoint>), SlopeFilterError> {
    let oscillator = data.fetch_oscillator(branch)?;
    let ticker = extract_ticker(branch)
        .ok_or_else(|| SlopeFilterError::InvalidBranch {
            branch: branch.to_string(),
            reason: "cannot extract ticker from branch name".into(),
        })?
        .to_string();
    let prices = data.fetch_prices(&ticker)?;
    debug!(
        branch,
        ticker = %ticker,
        prices = prices.len(),
        oscillator = oscillator.len(),
        "branch data loaded"
    );
    Ok((ticker, prices, oscillator))
}

fn into_analysis(
    branch: &str,
    ticker: String,
    params: &SignalParams,
    eval: &Evaluation,
) -> BranchAnalysis {
    BranchAnalysis {
        branch: branch.to_string(),
        ticker,
        params: *params,
        signals: eval.signals.clone(),
        metrics: eval.metrics.clone(),
        yearly: eval.yearly.clone(),
    }
}

/// Analysis front end holding the data source and result cache.
pub struct Analyzer<'a> {
    data: &'a dyn DataPort,
    cache: ResultCache<Arc<Evaluation>>,
    risk_free_rate: f64,
}

impl<'a> Analyzer<'a> {
    pub fn new(data: &'a dyn DataPort, cache_size: usize, risk_free_rate: f64) -> Self {
        Analyzer {
            data,
            cache: ResultCache::new(cache_size),
            risk_free_rate,
        }
    }

    pub fn cache(&self) -> &ResultCache<Arc<Evaluation>> {
        &self.cache
    }

    pub fn analyze(
        &self,
        branch: &str,
        params: &SignalParams,
    ) -> Result<BranchAnalysis, SlopeFilterError> {
        let (ticker, prices, oscillator) = load_branch(self.data, branch)?;
        let key = CacheKey::new(&prices, &oscillator, params);

        let eval = match self.cache.get(&key) {
            Some(eval) => eval,
            None => {
                let eval = Arc::new(Evaluation::compute(
                    &prices,
                    &oscillator,
                    params,
                    self.risk_free_rate,
                ));
                self.cache.insert(key, Arc::clone(&eval));
                eval
            }
        };

        Ok(into_analysis(branch, ticker, params, &eval))
    }

    /// Analyse every branch on a pool of `workers` threads and return one row
    /// per branch with trades, best total return first.
    ///
    /// Branches that fail to load or produce no trades are skipped with a
    /// warning; they never abort the run.
    pub fn overview(
        &self,
        branches: &[String],
        params: &SignalParams,
        workers: usize,
    ) -> Result<Vec<BranchOverview>, SlopeFilterError> {
        let progress = ProgressBar::new(branches.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("overview {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}] {msg}")
        {
            progress.set_style(style.progress_chars("█░ "));
        }
        let rows = self.overview_with_progress(branches, params, workers, &progress);
        progress.finish_and_clear();
        rows
    }

    /// [`Analyzer::overview`] advancing a caller-supplied bar once per branch.
    pub fn overview_with_progress(
        &self,
        branches: &[String],
        params: &SignalParams,
        workers: usize,
        progress: &ProgressBar,
    ) -> Result<Vec<BranchOverview>, SlopeFilterError> {
        use rayon::prelude::*;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("slopefilter-overview-{i}"))
            .build()
            .map_err(|e| SlopeFilterError::Io(std::io::Error::other(e)))?;

        let total = branches.len();
        info!(branches = total, workers, "starting overview");

        let mut rows: Vec<BranchOverview> = pool.install(|| {
            branches
                .par_iter()
                .filter_map(|branch| {
                    let row = match self.analyze(branch, params) {
                        Ok(analysis) => {
                            let row = BranchOverview::from_analysis(&analysis);
                            if row.is_none() {
                                warn!(branch = %branch, "skipping branch: no completed trades");
                            }
                            row
                        }
                        Err(e) => {
                            warn!(branch = %branch, error = %e, "skipping branch");
                            None
                        }
                    };
                    debug!(branch = %branch, "overview branch done");
                    progress.inc(1);
                    row
                })
                .collect()
        });

        sort_by_return_desc(&mut rows);
        info!(rows = rows.len(), skipped = total - rows.len(), "overview complete");
        Ok(rows)
    }
}

/// Convenience wrapper running an overview with a fresh cache.
pub fn run_overview(
    data: &dyn DataPort,
    branches: &[String],
    params: &SignalParams,
    risk_free_rate: f64,
    workers: usize,
) -> Result<Vec<BranchOverview>, SlopeFilterError> {
    Analyzer::new(data, 0, risk_free_rate).overview(branches, params, workers)
}

fn sort_by_return_desc(rows: &mut [BranchOverview]) {
    rows.sort_by(|a, b| {
        b.return_pct
            .total_cmp(&a.return_pct)
            .then_with(|| a.branch.cmp(&b.branch))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DatasetKind;
    use crate::domain::series::{BenchmarkPoint, DailyReturn};
    use crate::domain::signal::SignalMode;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct MemoryData {
        prices: HashMap<String, Vec<PricePoint>>,
        logs: HashMap<String, Vec<OscillatorPoint>>,
    }

    impl DataPort for MemoryData {
        fn fetch_prices(&self, ticker: &str) -> Result<Vec<PricePoint>, SlopeFilterError> {
            self.prices.get(ticker).cloned().ok_or(SlopeFilterError::NotFound {
                kind: DatasetKind::Ticker,
                name: ticker.to_string(),
            })
        }

        fn fetch_oscillator(&self, branch: &str) -> Result<Vec<OscillatorPoint>, SlopeFilterError> {
            self.logs.get(branch).cloned().ok_or(SlopeFilterError::NotFound {
                kind: DatasetKind::TradeLog,
                name: branch.to_string(),
            })
        }

        fn fetch_daily_returns(&self, dataset: &str) -> Result<Vec<DailyReturn>, SlopeFilterError> {
            Err(SlopeFilterError::NotFound {
                kind: DatasetKind::Returns,
                name: dataset.to_string(),
            })
        }

        fn fetch_benchmark(&self, dataset: &str) -> Result<Vec<BenchmarkPoint>, SlopeFilterError> {
            Err(SlopeFilterError::NotFound {
                kind: DatasetKind::Benchmark,
                name: dataset.to_string(),
            })
        }

        fn list_tickers(&self) -> Result<Vec<String>, SlopeFilterError> {
            Ok(self.prices.keys().cloned().collect())
        }

        fn list_branches(&self) -> Result<Vec<String>, SlopeFilterError> {
            Ok(self.logs.keys().cloned().collect())
        }
    }

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
    }

    const PEAK: [f64; 14] = [
        100.0, 102.0, 104.0, 106.0, 108.0, 110.0, 112.0, 114.0, 110.0, 108.0, 106.0, 104.0, 102.0,
        100.0,
    ];

    fn price_series(closes: &[f64]) -> Vec<PricePoint> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: day(i),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    fn log_active_at(n: usize, at: usize) -> Vec<OscillatorPoint> {
        (0..n)
            .map(|i| OscillatorPoint {
                date: day(i),
                active: i == at,
                value: None,
            })
            .collect()
    }

    fn params() -> SignalParams {
        SignalParams {
            slope_window: 5,
            pos_threshold: 0.0,
            neg_threshold: 0.0,
            mode: SignalMode::Both,
        }
    }

    fn fixture() -> MemoryData {
        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), price_series(&PEAK));
        let falling: Vec<f64> = (0..14).map(|i| 130.0 - 2.0 * i as f64).collect();
        prices.insert("MSFT".to_string(), price_series(&falling));

        let mut logs = HashMap::new();
        logs.insert("14D_RSI_AAPL_LT30_daily_trade_log".to_string(), log_active_at(14, 5));
        logs.insert("14D_RSI_MSFT_LT30_daily_trade_log".to_string(), log_active_at(14, 5));
        logs.insert("14D_RSI_TSLA_LT30_daily_trade_log".to_string(), log_active_at(14, 5));
        logs.insert("bogus_log".to_string(), log_active_at(14, 5));
        MemoryData { prices, logs }
    }

    #[test]
    fn analyze_branch_produces_trade_and_metrics() {
        let data = fixture();
        let analysis =
            analyze_branch(&data, "14D_RSI_AAPL_LT30_daily_trade_log", &params(), 0.02).unwrap();

        assert_eq!(analysis.ticker, "AAPL");
        assert_eq!(analysis.signals.trades.len(), 1);
        let metrics = analysis.metrics.unwrap();
        assert_eq!(metrics.num_trades, 1);
        // entry at close 110, exit at close 108
        assert!((metrics.total_return - (-2.0 / 110.0 * 100.0)).abs() < 1e-9);
        assert_eq!(analysis.yearly.len(), 1);
        assert_eq!(analysis.yearly[0].year, 2024);
    }

    #[test]
    fn analyze_branch_rejects_unconventional_name() {
        let data = fixture();
        let err = analyze_branch(&data, "bogus_log", &params(), 0.02).unwrap_err();
        assert!(matches!(err, SlopeFilterError::InvalidBranch { .. }));
    }

    #[test]
    fn analyze_branch_missing_prices_is_not_found() {
        let data = fixture();
        let err =
            analyze_branch(&data, "14D_RSI_TSLA_LT30_daily_trade_log", &params(), 0.02).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn analyzer_reuses_cached_evaluation() {
        let data = fixture();
        let analyzer = Analyzer::new(&data, 4, 0.02);
        let branch = "14D_RSI_AAPL_LT30_daily_trade_log";

        let first = analyzer.analyze(branch, &params()).unwrap();
        let second = analyzer.analyze(branch, &params()).unwrap();

        assert_eq!(first, second);
        let stats = analyzer.cache().stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn analyzer_cache_separates_params() {
        let data = fixture();
        let analyzer = Analyzer::new(&data, 4, 0.02);
        let branch = "14D_RSI_AAPL_LT30_daily_trade_log";

        analyzer.analyze(branch, &params()).unwrap();
        let slope_only = SignalParams {
            mode: SignalMode::SlopeOnly,
            ..params()
        };
        analyzer.analyze(branch, &slope_only).unwrap();
        assert_eq!(analyzer.cache().len(), 2);
    }

    #[test]
    fn overview_skips_failures_and_empty_branches() {
        let data = fixture();
        let mut branches = data.list_branches().unwrap();
        branches.sort();

        let rows = run_overview(&data, &branches, &params(), 0.02, 2).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticker, "AAPL");
        assert_eq!(rows[0].trades, 1);
        assert_eq!(rows[0].period, "2024-01-06 to 2024-01-10");
    }

    #[test]
    fn overview_advances_progress_for_every_branch() {
        let data = fixture();
        let mut branches = data.list_branches().unwrap();
        branches.sort();
        let progress = ProgressBar::hidden();

        let rows = Analyzer::new(&data, 0, 0.02)
            .overview_with_progress(&branches, &params(), 2, &progress)
            .unwrap();

        // Skipped branches still count as done.
        assert_eq!(progress.position(), branches.len() as u64);
        assert!(rows.len() < branches.len());
    }

    #[test]
    fn overview_cagr_uses_trade_span() {
        let data = fixture();
        let branches = vec!["14D_RSI_AAPL_LT30_daily_trade_log".to_string()];
        let rows = run_overview(&data, &branches, &params(), 0.02, 1).unwrap();

        let row = &rows[0];
        let expected = compute_cagr(row.return_pct, 4.0 / 365.25);
        assert!((row.cagr - expected).abs() < 1e-9);
    }

    #[test]
    fn overview_sorted_by_return_desc() {
        let mut rows = vec![
            BranchOverview {
                ticker: "A".into(),
                branch: "a".into(),
                period: String::new(),
                return_pct: 1.0,
                cagr: 0.0,
                win_rate: 0.0,
                max_drawdown: 0.0,
                trades: 1,
                sharpe: 0.0,
                time_in_market: 0.0,
            },
            BranchOverview {
                ticker: "B".into(),
                branch: "b".into(),
                period: String::new(),
                return_pct: 5.0,
                cagr: 0.0,
                win_rate: 0.0,
                max_drawdown: 0.0,
                trades: 1,
                sharpe: 0.0,
                time_in_market: 0.0,
            },
        ];
        sort_by_return_desc(&mut rows);
        assert_eq!(rows[0].branch, "b");
        assert_eq!(rows[1].branch, "a");
    }
}
