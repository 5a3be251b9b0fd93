//! Oscillator + slope signal engine.
//!
//! A single forward pass over merged rows. Each row goes through [`step`],
//! a pure transition from one [`PositionState`] to the next that may emit a
//! completed [`TradeSignal`]. Entry and exit predicates live on
//! [`SignalMode`] so each mode's policy can be exercised on its own.
//!
//! Modes:
//! - `Both`: an oscillator activation arms a latch (`flag`). Entry fires when
//!   the oscillator activates while the slope is already above threshold, or
//!   when the slope crosses above threshold while armed. Exit fires on the
//!   slope crossing back down, which also disarms the latch.
//! - `OscillatorOnly`: hold while the oscillator is active.
//! - `SlopeOnly`: hold while the slope is above threshold.

use crate::domain::error::SlopeFilterError;
use crate::domain::merged::{MergedRow, merge_series};
use crate::domain::series::{OscillatorPoint, PricePoint};
use crate::domain::trade::{EntryType, OpenPosition, TradeSignal};
use std::fmt;
use std::str::FromStr;

pub const MIN_SLOPE_WINDOW: usize = 2;
pub const MAX_SLOPE_WINDOW: usize = 250;
pub const POS_THRESHOLD_RANGE: (f64, f64) = (0.0, 20.0);
pub const NEG_THRESHOLD_RANGE: (f64, f64) = (-10.0, 10.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalMode {
    Both,
    OscillatorOnly,
    SlopeOnly,
}

impl FromStr for SignalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "both" => Ok(SignalMode::Both),
            "rsi" | "oscillator" | "oscillator_only" => Ok(SignalMode::OscillatorOnly),
            "slope" | "slope_only" => Ok(SignalMode::SlopeOnly),
            other => Err(format!(
                "unknown mode '{other}' (expected both, oscillator or slope)"
            )),
        }
    }
}

impl fmt::Display for SignalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalMode::Both => f.write_str("both"),
            SignalMode::OscillatorOnly => f.write_str("oscillator"),
            SignalMode::SlopeOnly => f.write_str("slope"),
        }
    }
}

/// Everything the entry/exit predicates may look at for one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowContext {
    pub active: bool,
    pub slope: f64,
    pub pos_threshold: f64,
    pub slope_active: bool,
    pub slope_just_activated: bool,
    pub slope_just_deactivated: bool,
    pub oscillator_just_activated: bool,
    /// Latch state after this row's oscillator check.
    pub flag: bool,
}

impl SignalMode {
    /// Entry decision for a row evaluated while flat.
    pub fn entry(self, ctx: &RowContext) -> Option<EntryType> {
        match self {
            SignalMode::Both => {
                if ctx.oscillator_just_activated && ctx.slope_active {
                    Some(EntryType::Oscillator)
                } else if ctx.flag && ctx.slope_just_activated {
                    Some(EntryType::Slope)
                } else {
                    None
                }
            }
            SignalMode::OscillatorOnly => ctx.active.then_some(EntryType::Oscillator),
            SignalMode::SlopeOnly => (ctx.slope > ctx.pos_threshold).then_some(EntryType::Slope),
        }
    }

    /// Exit decision for a row evaluated while in a position.
    ///
    /// `Both` exits on the downward transition; `SlopeOnly` exits on the
    /// level. The two differ when a position is opened on a row whose slope
    /// was already above threshold on the previous row.
    pub fn exit(self, ctx: &RowContext) -> bool {
        match self {
            SignalMode::Both => ctx.slope_just_deactivated,
            SignalMode::OscillatorOnly => !ctx.active,
            SignalMode::SlopeOnly => ctx.slope <= ctx.pos_threshold,
        }
    }

    fn clears_flag_on_exit(self) -> bool {
        matches!(self, SignalMode::Both)
    }
}

/// Parameters of one signal-engine run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalParams {
    pub slope_window: usize,
    pub pos_threshold: f64,
    /// Accepted and range-checked, but no mode reads it yet.
    pub neg_threshold: f64,
    pub mode: SignalMode,
}

impl Default for SignalParams {
    fn default() -> Self {
        SignalParams {
            slope_window: 15,
            pos_threshold: 5.0,
            neg_threshold: 0.0,
            mode: SignalMode::Both,
        }
    }
}

impl SignalParams {
    pub fn validate(&self) -> Result<(), SlopeFilterError> {
        if !(MIN_SLOPE_WINDOW..=MAX_SLOPE_WINDOW).contains(&self.slope_window) {
            return Err(SlopeFilterError::invalid(
                "analysis",
                "slope_window",
                format!(
                    "slope_window must be between {MIN_SLOPE_WINDOW} and {MAX_SLOPE_WINDOW}"
                ),
            ));
        }
        let (lo, hi) = POS_THRESHOLD_RANGE;
        if !(lo..=hi).contains(&self.pos_threshold) {
            return Err(SlopeFilterError::invalid(
                "analysis",
                "pos_threshold",
                format!("pos_threshold must be between {lo} and {hi}"),
            ));
        }
        let (lo, hi) = NEG_THRESHOLD_RANGE;
        if !(lo..=hi).contains(&self.neg_threshold) {
            return Err(SlopeFilterError::invalid(
                "analysis",
                "neg_threshold",
                format!("neg_threshold must be between {lo} and {hi}"),
            ));
        }
        Ok(())
    }
}

/// Mutable bookkeeping threaded through the forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionState {
    pub flag: bool,
    pub position: Option<OpenPosition>,
    pub prev_slope_active: bool,
}

impl PositionState {
    pub fn in_position(&self) -> bool {
        self.position.is_some()
    }
}

/// Per-row indicator columns of the annotated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowMarks {
    pub flag: bool,
    pub entry_signal: bool,
    pub exit_signal: bool,
    pub in_trade: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: PositionState,
    pub marks: RowMarks,
    pub trade: Option<TradeSignal>,
}

/// Advance the state machine by one row. Rows without a slope or a close
/// only carry the flag forward.
pub fn step(state: PositionState, row: &MergedRow, mode: SignalMode, pos_threshold: f64) -> Step {
    let (Some(slope), Some(close)) = (row.slope, row.close) else {
        return Step {
            state,
            marks: RowMarks {
                flag: state.flag,
                ..RowMarks::default()
            },
            trade: None,
        };
    };

    let mut next = state;
    let slope_active = slope > pos_threshold;

    let oscillator_just_activated = row.active && !next.flag;
    if oscillator_just_activated {
        next.flag = true;
    }

    let ctx = RowContext {
        active: row.active,
        slope,
        pos_threshold,
        slope_active,
        slope_just_activated: slope_active && !state.prev_slope_active,
        slope_just_deactivated: state.prev_slope_active && !slope_active,
        oscillator_just_activated,
        flag: next.flag,
    };

    let mut marks = RowMarks::default();
    let mut trade = None;

    match next.position {
        None => {
            if let Some(entry_type) = mode.entry(&ctx) {
                next.position = Some(OpenPosition {
                    entry_date: row.date,
                    entry_price: close,
                    entry_type,
                });
                marks.entry_signal = true;
                marks.in_trade = true;
            }
        }
        Some(open) => {
            if mode.exit(&ctx) {
                next.position = None;
                if mode.clears_flag_on_exit() {
                    next.flag = false;
                }
                marks.exit_signal = true;
                trade = open.close(row.date, close);
            } else {
                marks.in_trade = true;
            }
        }
    }

    marks.flag = next.flag;
    next.prev_slope_active = slope_active;

    Step {
        state: next,
        marks,
        trade,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRow {
    pub row: MergedRow,
    pub marks: RowMarks,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalResult {
    pub rows: Vec<AnnotatedRow>,
    pub trades: Vec<TradeSignal>,
}

impl SignalResult {
    pub fn open_position_at_end(&self) -> bool {
        self.rows.last().is_some_and(|r| r.marks.in_trade)
    }
}

/// Run the engine over an already merged, slope-annotated series.
///
/// A position still open after the last row is left open and produces no
/// trade.
pub fn apply_filter(rows: &[MergedRow], params: &SignalParams) -> SignalResult {
    let mut state = PositionState::default();
    let mut result = SignalResult {
        rows: Vec::with_capacity(rows.len()),
        trades: Vec::new(),
    };

    for row in rows {
        let outcome = step(state, row, params.mode, params.pos_threshold);
        state = outcome.state;
        result.trades.extend(outcome.trade);
        result.rows.push(AnnotatedRow {
            row: row.clone(),
            marks: outcome.marks,
        });
    }

    tracing::debug!(
        mode = %params.mode,
        rows = rows.len(),
        trades = result.trades.len(),
        open_at_end = state.in_position(),
        "signal pass complete"
    );

    result
}

/// Merge prices with the oscillator log, compute slopes and run the engine.
pub fn run_signal_engine(
    prices: &[PricePoint],
    oscillator: &[OscillatorPoint],
    params: &SignalParams,
) -> SignalResult {
    let merged = merge_series(prices, oscillator, params.slope_window);
    apply_filter(&merged, params)
}
