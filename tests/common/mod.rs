#![allow(dead_code)]

use chrono::NaiveDate;
use slopefilter::domain::error::{DatasetKind, SlopeFilterError};
pub use slopefilter::domain::series::{BenchmarkPoint, DailyReturn, OscillatorPoint, PricePoint};
use slopefilter::domain::signal::{SignalMode, SignalParams};
use slopefilter::ports::data_port::DataPort;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const AAPL_BRANCH: &str = "14D_RSI_AAPL_LT30_daily_trade_log";
pub const MSFT_BRANCH: &str = "14D_RSI_MSFT_LT30_daily_trade_log";

/// Rises for eight days, then falls back: one Both-mode trade when the
/// oscillator fires on day 5 of a 5-day slope window.
pub const PEAK: [f64; 14] = [
    100.0, 102.0, 104.0, 106.0, 108.0, 110.0, 112.0, 114.0, 110.0, 108.0, 106.0, 104.0, 102.0,
    100.0,
];

pub struct MockDataPort {
    pub prices: HashMap<String, Vec<PricePoint>>,
    pub logs: HashMap<String, Vec<OscillatorPoint>>,
    pub returns: HashMap<String, Vec<DailyReturn>>,
    pub benchmarks: HashMap<String, Vec<BenchmarkPoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            logs: HashMap::new(),
            returns: HashMap::new(),
            benchmarks: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, ticker: &str, prices: Vec<PricePoint>) -> Self {
        self.prices.insert(ticker.to_string(), prices);
        self
    }

    pub fn with_log(mut self, branch: &str, log: Vec<OscillatorPoint>) -> Self {
        self.logs.insert(branch.to_string(), log);
        self
    }

    pub fn with_returns(mut self, dataset: &str, returns: Vec<DailyReturn>) -> Self {
        self.returns.insert(dataset.to_string(), returns);
        self
    }

    pub fn with_benchmark(mut self, dataset: &str, points: Vec<BenchmarkPoint>) -> Self {
        self.benchmarks.insert(dataset.to_string(), points);
        self
    }

    /// Any fetch of `name` fails with a parse error.
    pub fn with_error(mut self, name: &str, reason: &str) -> Self {
        self.errors.insert(name.to_string(), reason.to_string());
        self
    }

    fn check(&self, name: &str) -> Result<(), SlopeFilterError> {
        match self.errors.get(name) {
            Some(reason) => Err(SlopeFilterError::DataParse {
                source_name: name.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn lookup<T: Clone>(
    map: &HashMap<String, Vec<T>>,
    kind: DatasetKind,
    name: &str,
) -> Result<Vec<T>, SlopeFilterError> {
    map.get(name).cloned().ok_or_else(|| SlopeFilterError::NotFound {
        kind,
        name: name.to_string(),
    })
}

fn sorted_keys<T>(map: &HashMap<String, T>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, ticker: &str) -> Result<Vec<PricePoint>, SlopeFilterError> {
        self.check(ticker)?;
        lookup(&self.prices, DatasetKind::Ticker, ticker)
    }

    fn fetch_oscillator(&self, branch: &str) -> Result<Vec<OscillatorPoint>, SlopeFilterError> {
        self.check(branch)?;
        lookup(&self.logs, DatasetKind::TradeLog, branch)
    }

    fn fetch_daily_returns(&self, dataset: &str) -> Result<Vec<DailyReturn>, SlopeFilterError> {
        self.check(dataset)?;
        lookup(&self.returns, DatasetKind::Returns, dataset)
    }

    fn fetch_benchmark(&self, dataset: &str) -> Result<Vec<BenchmarkPoint>, SlopeFilterError> {
        self.check(dataset)?;
        lookup(&self.benchmarks, DatasetKind::Benchmark, dataset)
    }

    fn list_tickers(&self) -> Result<Vec<String>, SlopeFilterError> {
        Ok(sorted_keys(&self.prices))
    }

    fn list_branches(&self) -> Result<Vec<String>, SlopeFilterError> {
        Ok(sorted_keys(&self.logs))
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Calendar day `i` counted from 2024-01-01.
pub fn day(i: usize) -> NaiveDate {
    date("2024-01-01") + chrono::Duration::days(i as i64)
}

pub fn price_series(closes: &[f64]) -> Vec<PricePoint> {
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

pub fn oscillator_log(flags: &[bool]) -> Vec<OscillatorPoint> {
    flags
        .iter()
        .enumerate()
        .map(|(i, &active)| OscillatorPoint {
            date: day(i),
            active,
            value: None,
        })
        .collect()
}

pub fn log_active_at(n: usize, at: &[usize]) -> Vec<OscillatorPoint> {
    let flags: Vec<bool> = (0..n).map(|i| at.contains(&i)).collect();
    oscillator_log(&flags)
}

pub fn daily_returns(start: &str, values: &[f64]) -> Vec<DailyReturn> {
    let first = date(start);
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| DailyReturn {
            date: first + chrono::Duration::days(i as i64),
            value,
        })
        .collect()
}

pub fn benchmark_series(start: &str, closes: &[f64]) -> Vec<BenchmarkPoint> {
    let first = date(start);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| BenchmarkPoint {
            date: first + chrono::Duration::days(i as i64),
            close,
        })
        .collect()
}

pub fn test_params() -> SignalParams {
    SignalParams {
        slope_window: 5,
        pos_threshold: 0.0,
        neg_threshold: 0.0,
        mode: SignalMode::Both,
    }
}

/// AAPL peaks and trades once; MSFT falls throughout and never trades.
pub fn two_branch_mock() -> MockDataPort {
    let falling: Vec<f64> = (0..14).map(|i| 130.0 - 2.0 * i as f64).collect();
    MockDataPort::new()
        .with_prices("AAPL", price_series(&PEAK))
        .with_prices("MSFT", price_series(&falling))
        .with_log(AAPL_BRANCH, log_active_at(14, &[5]))
        .with_log(MSFT_BRANCH, log_active_at(14, &[5]))
}

// ---------------------------------------------------------------------------
// On-disk CSV tree
// ---------------------------------------------------------------------------

pub fn write_csv(base: &Path, dir: &str, name: &str, content: &str) {
    let d = base.join(dir);
    fs::create_dir_all(&d).unwrap();
    fs::write(d.join(format!("{name}.csv")), content).unwrap();
}

pub fn prices_csv(closes: &[f64]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for p in price_series(closes) {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            p.date, p.open, p.high, p.low, p.close, p.volume
        ));
    }
    out
}

pub fn log_csv(n: usize, active_at: &[usize]) -> String {
    let mut out = String::from("date,active\n");
    for p in log_active_at(n, active_at) {
        out.push_str(&format!("{},{}\n", p.date, u8::from(p.active)));
    }
    out
}

pub fn returns_csv(start: &str, values: &[f64]) -> String {
    let mut out = String::from("date,portfolio_return\n");
    for r in daily_returns(start, values) {
        out.push_str(&format!("{},{}\n", r.date, r.value));
    }
    out
}

pub fn benchmark_csv(start: &str, closes: &[f64]) -> String {
    let mut out = String::from("date,close\n");
    for b in benchmark_series(start, closes) {
        out.push_str(&format!("{},{}\n", b.date, b.close));
    }
    out
}

/// Data tree mirroring [`two_branch_mock`] plus a returns set and benchmark.
pub fn write_data_tree(base: &Path) {
    let falling: Vec<f64> = (0..14).map(|i| 130.0 - 2.0 * i as f64).collect();
    write_csv(base, "tickers", "AAPL", &prices_csv(&PEAK));
    write_csv(base, "tickers", "MSFT", &prices_csv(&falling));
    write_csv(base, "trade_logs", AAPL_BRANCH, &log_csv(14, &[5]));
    write_csv(base, "trade_logs", MSFT_BRANCH, &log_csv(14, &[5]));
    write_csv(
        base,
        "returns",
        "portfolio",
        &returns_csv("2024-01-01", &[0.01, -0.02, 0.03, 0.0]),
    );
    write_csv(
        base,
        "benchmarks",
        "spy",
        &benchmark_csv("2024-01-01", &[100.0, 101.0, 99.0, 102.0]),
    );
}
