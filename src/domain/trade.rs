//! Completed trades emitted by the signal engine.

use chrono::NaiveDate;
use std::fmt;

/// Which condition opened a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    Oscillator,
    Slope,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Oscillator => f.write_str("oscillator"),
            EntryType::Slope => f.write_str("slope"),
        }
    }
}

/// A position held between an entry and an exit row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub entry_type: EntryType,
}

impl OpenPosition {
    /// Close the position at `exit_price` on `exit_date`.
    ///
    /// Returns `None` for a zero entry price: such a trade has no defined
    /// return and is discarded.
    pub fn close(&self, exit_date: NaiveDate, exit_price: f64) -> Option<TradeSignal> {
        if self.entry_price == 0.0 {
            return None;
        }
        Some(TradeSignal {
            entry_date: self.entry_date,
            exit_date,
            entry_price: self.entry_price,
            exit_price,
            return_pct: (exit_price - self.entry_price) / self.entry_price * 100.0,
            days_held: (exit_date - self.entry_date).num_days(),
            entry_type: self.entry_type,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeSignal {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub return_pct: f64,
    /// Calendar days, not trading days.
    pub days_held: i64,
    pub entry_type: EntryType,
}
