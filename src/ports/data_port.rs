//! Data access port trait.
//!
//! Implementations are shared across overview worker threads, hence `Sync`.

use crate::domain::error::SlopeFilterError;
use crate::domain::series::{BenchmarkPoint, DailyReturn, OscillatorPoint, PricePoint};

pub trait DataPort: Sync {
    /// Daily price bars for `ticker`, sorted by date.
    fn fetch_prices(&self, ticker: &str) -> Result<Vec<PricePoint>, SlopeFilterError>;

    /// Oscillator-active log for `branch`, sorted by date.
    fn fetch_oscillator(&self, branch: &str) -> Result<Vec<OscillatorPoint>, SlopeFilterError>;

    fn fetch_daily_returns(&self, dataset: &str) -> Result<Vec<DailyReturn>, SlopeFilterError>;

    fn fetch_benchmark(&self, dataset: &str) -> Result<Vec<BenchmarkPoint>, SlopeFilterError>;

    fn list_tickers(&self) -> Result<Vec<String>, SlopeFilterError>;

    fn list_branches(&self) -> Result<Vec<String>, SlopeFilterError>;
}
