//! Branch names encode the oscillator condition that produced a trade log:
//! `{WINDOW}D_RSI_{TICKER}_{LT|GT}{THRESHOLD}_..._daily_trade_log`.

use super::error::SlopeFilterError;
use std::fmt;

pub const DEFAULT_OSCILLATOR_THRESHOLD: f64 = 30.0;

const TICKER_MARKER: &str = "_RSI_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Active while the oscillator is below the threshold.
    Below,
    /// Active while the oscillator is above the threshold.
    Above,
}

impl Direction {
    fn marker(self) -> &'static str {
        match self {
            Direction::Below => "LT",
            Direction::Above => "GT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Parsed form of a branch name.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchName {
    pub oscillator_window: Option<u32>,
    pub ticker: String,
    pub direction: Direction,
    pub threshold: f64,
}

impl BranchName {
    pub fn parse(branch: &str) -> Result<Self, SlopeFilterError> {
        let invalid = |reason: &str| SlopeFilterError::InvalidBranch {
            branch: branch.to_string(),
            reason: reason.to_string(),
        };

        let (ticker, direction) =
            split_ticker(branch).ok_or_else(|| invalid("no {TICKER}_{LT|GT} segment after _RSI_"))?;

        let oscillator_window = branch
            .split_once('D')
            .and_then(|(window, _)| window.parse::<u32>().ok());

        Ok(BranchName {
            oscillator_window,
            ticker: ticker.to_string(),
            direction,
            threshold: extract_oscillator_threshold(branch),
        })
    }

    /// Oscillator condition as written in the name, e.g. `LT30`.
    pub fn condition(&self) -> String {
        format!("{}{}", self.direction, self.threshold)
    }
}

/// Ticker encoded in `branch`, or `None` when the name does not follow the
/// branch convention.
pub fn extract_ticker(branch: &str) -> Option<&str> {
    split_ticker(branch).map(|(ticker, _)| ticker)
}

/// Oscillator threshold encoded after `LT`/`GT`, defaulting to 30.
pub fn extract_oscillator_threshold(branch: &str) -> f64 {
    // `_LT<digits>_` anywhere in the name, not only right after the ticker.
    ["_LT", "_GT"]
        .iter()
        .flat_map(|marker| branch.match_indices(marker).map(|(i, m)| i + m.len()))
        .filter_map(|start| {
            let rest = &branch[start..];
            let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            (digits > 0 && rest[digits..].starts_with('_')).then(|| (start, &rest[..digits]))
        })
        .min_by_key(|(start, _)| *start)
        .and_then(|(_, digits)| digits.parse::<f64>().ok())
        .unwrap_or(DEFAULT_OSCILLATOR_THRESHOLD)
}

pub fn branches_for_ticker<'a>(branches: &'a [String], ticker: &str) -> Vec<&'a String> {
    branches
        .iter()
        .filter(|b| extract_ticker(b) == Some(ticker))
        .collect()
}

/// Split `..._RSI_{ticker}_{LT|GT}...` into its ticker and direction. The
/// ticker is the shortest non-empty run that is followed by `_LT` or `_GT`.
fn split_ticker(branch: &str) -> Option<(&str, Direction)> {
    let start = branch.find(TICKER_MARKER)? + TICKER_MARKER.len();
    let tail = &branch[start..];

    [Direction::Below, Direction::Above]
        .into_iter()
        .filter_map(|dir| {
            let needle = format!("_{}", dir.marker());
            // skip the first char so the ticker is never empty
            let first = tail.char_indices().nth(1).map(|(i, _)| i)?;
            tail[first..].find(&needle).map(|pos| (first + pos, dir))
        })
        .min_by_key(|(pos, _)| *pos)
        .map(|(pos, dir)| (&tail[..pos], dir))
}
