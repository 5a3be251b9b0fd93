//! Configuration loading and validation.
//!
//! Every setting is checked here before any engine runs. Command-line
//! overrides are folded in first so they go through the same rules.

use crate::domain::analysis::DEFAULT_WORKERS;
use crate::domain::cache::DEFAULT_CACHE_SIZE;
use crate::domain::equity::{DEFAULT_INITIAL_EQUITY, EquityCurveConfig};
use crate::domain::error::SlopeFilterError;
use crate::domain::metrics::DEFAULT_RISK_FREE_RATE;
use crate::domain::signal::{SignalMode, SignalParams};
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

pub const DEFAULT_BASE_PATH: &str = "data";

/// Values given on the command line that take precedence over `[analysis]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamOverrides {
    pub slope_window: Option<usize>,
    pub pos_threshold: Option<f64>,
    pub neg_threshold: Option<f64>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisSettings {
    pub params: SignalParams,
    pub risk_free_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverviewSettings {
    pub workers: usize,
    pub cache_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquitySettings {
    pub returns: String,
    pub live_returns: Option<String>,
    pub benchmark: Option<String>,
    pub curve: EquityCurveConfig,
}

pub fn data_base_path(config: &dyn ConfigPort) -> PathBuf {
    config
        .get_string("data", "base_path")
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(s.trim()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_PATH))
}

pub fn build_analysis_settings(
    config: &dyn ConfigPort,
    overrides: &ParamOverrides,
) -> Result<AnalysisSettings, SlopeFilterError> {
    let slope_window = match overrides.slope_window {
        Some(w) => w,
        None => {
            let w = parse_int(config, "analysis", "slope_window", 15)?;
            usize::try_from(w).map_err(|_| {
                SlopeFilterError::invalid("analysis", "slope_window", "slope_window must be positive")
            })?
        }
    };
    let pos_threshold = match overrides.pos_threshold {
        Some(v) => v,
        None => parse_double(config, "analysis", "pos_threshold", 5.0)?,
    };
    let neg_threshold = match overrides.neg_threshold {
        Some(v) => v,
        None => parse_double(config, "analysis", "neg_threshold", 0.0)?,
    };
    let mode_str = overrides
        .mode
        .clone()
        .or_else(|| config.get_string("analysis", "mode"))
        .unwrap_or_else(|| SignalMode::Both.to_string());
    let mode: SignalMode = mode_str
        .parse()
        .map_err(|reason: String| SlopeFilterError::invalid("analysis", "mode", reason))?;

    let params = SignalParams {
        slope_window,
        pos_threshold,
        neg_threshold,
        mode,
    };
    params.validate()?;

    let risk_free_rate = parse_double(config, "analysis", "risk_free_rate", DEFAULT_RISK_FREE_RATE)?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(SlopeFilterError::invalid(
            "analysis",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    Ok(AnalysisSettings {
        params,
        risk_free_rate,
    })
}

pub fn build_overview_settings(config: &dyn ConfigPort) -> Result<OverviewSettings, SlopeFilterError> {
    let workers = parse_int(config, "overview", "workers", DEFAULT_WORKERS as i64)?;
    if workers < 1 {
        return Err(SlopeFilterError::invalid(
            "overview",
            "workers",
            "workers must be at least 1",
        ));
    }
    let cache_size = parse_int(config, "overview", "cache_size", DEFAULT_CACHE_SIZE as i64)?;
    if cache_size < 0 {
        return Err(SlopeFilterError::invalid(
            "overview",
            "cache_size",
            "cache_size must be non-negative",
        ));
    }
    Ok(OverviewSettings {
        workers: workers as usize,
        cache_size: cache_size as usize,
    })
}

pub fn build_equity_settings(config: &dyn ConfigPort) -> Result<EquitySettings, SlopeFilterError> {
    let returns = non_empty(config, "equity", "returns")
        .ok_or_else(|| SlopeFilterError::missing("equity", "returns"))?;

    let initial_equity = parse_double(config, "equity", "initial_equity", DEFAULT_INITIAL_EQUITY)?;
    if initial_equity <= 0.0 {
        return Err(SlopeFilterError::invalid(
            "equity",
            "initial_equity",
            "initial_equity must be positive",
        ));
    }

    let start_date = config.get_date("equity", "start_date")?;
    let end_date = config.get_date("equity", "end_date")?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(SlopeFilterError::invalid(
                "equity",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }

    Ok(EquitySettings {
        returns,
        live_returns: non_empty(config, "equity", "live_returns"),
        benchmark: non_empty(config, "equity", "benchmark"),
        curve: EquityCurveConfig {
            initial_equity,
            cutover_date: config.get_date("equity", "cutover_date")?,
            start_date,
            end_date,
        },
    })
}

/// Validate every section. `[equity]` is only checked when it names a
/// return series.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), SlopeFilterError> {
    build_analysis_settings(config, &ParamOverrides::default())?;
    build_overview_settings(config)?;
    if config.get_string("equity", "returns").is_some() {
        build_equity_settings(config)?;
    }
    Ok(())
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, SlopeFilterError> {
    match non_empty(config, section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| SlopeFilterError::invalid(section, key, format!("{key} must be an integer"))),
    }
}

fn parse_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, SlopeFilterError> {
    match non_empty(config, section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| SlopeFilterError::invalid(section, key, format!("{key} must be a number"))),
    }
}
