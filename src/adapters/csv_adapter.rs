//! CSV file data adapter.
//!
//! Layout under `base_path`:
//! - `tickers/{TICKER}.csv`: `date,open,high,low,close,volume`
//! - `trade_logs/{BRANCH}.csv`: `date,active[,rsi]`
//! - `returns/{NAME}.csv`: `date,portfolio_return`
//! - `benchmarks/{NAME}.csv`: `date,close`
//!
//! Columns are matched by header name, case-insensitively.

use crate::domain::error::{DatasetKind, SlopeFilterError};
use crate::domain::series::{BenchmarkPoint, DailyReturn, OscillatorPoint, PricePoint};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const TICKERS_DIR: &str = "tickers";
const TRADE_LOGS_DIR: &str = "trade_logs";
const RETURNS_DIR: &str = "returns";
const BENCHMARKS_DIR: &str = "benchmarks";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn csv_path(&self, dir: &str, name: &str) -> PathBuf {
        self.base_path.join(dir).join(format!("{name}.csv"))
    }

    /// Open a dataset, mapping a missing file to `NotFound`.
    fn open(&self, dir: &str, kind: DatasetKind, name: &str) -> Result<Table, SlopeFilterError> {
        // Names come from the command line; keep them inside base_path.
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(SlopeFilterError::NotFound {
                kind,
                name: name.to_string(),
            });
        }
        let path = self.csv_path(dir, name);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SlopeFilterError::NotFound {
                kind,
                name: name.to_string(),
            },
            _ => SlopeFilterError::Io(e),
        })?;
        let table = Table::parse(&content, &path.display().to_string())?;
        debug!(path = %path.display(), rows = table.rows.len(), "dataset loaded");
        Ok(table)
    }

    fn list_stems(&self, dir: &str) -> Result<Vec<String>, SlopeFilterError> {
        let path = self.base_path.join(dir);
        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SlopeFilterError::Io(e)),
        };

        let mut stems = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_path = entry.path();
            if file_path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = file_path.file_stem() {
                    stems.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        stems.sort();
        Ok(stems)
    }
}

/// A parsed CSV file with its header row lower-cased.
struct Table {
    source: String,
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

impl Table {
    fn parse(content: &str, source: &str) -> Result<Self, SlopeFilterError> {
        let parse_err = |reason: String| SlopeFilterError::DataParse {
            source_name: source.to_string(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| parse_err(format!("CSV header error: {e}")))?
            .iter()
            .map(|h| h.to_lowercase())
            .collect();
        let rows = rdr
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| parse_err(format!("CSV parse error: {e}")))?;

        Ok(Table {
            source: source.to_string(),
            headers,
            rows,
        })
    }

    fn error(&self, line: usize, reason: impl std::fmt::Display) -> SlopeFilterError {
        SlopeFilterError::DataParse {
            source_name: self.source.clone(),
            reason: format!("row {line}: {reason}"),
        }
    }

    fn column(&self, name: &str) -> Result<usize, SlopeFilterError> {
        self.optional_column(name)
            .ok_or_else(|| SlopeFilterError::DataParse {
                source_name: self.source.clone(),
                reason: format!("missing {name} column"),
            })
    }

    fn optional_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn field<'r>(&self, record: &'r csv::StringRecord, line: usize, idx: usize) -> Result<&'r str, SlopeFilterError> {
        record
            .get(idx)
            .ok_or_else(|| self.error(line, format!("missing {} value", self.headers[idx])))
    }

    fn date(&self, record: &csv::StringRecord, line: usize, idx: usize) -> Result<NaiveDate, SlopeFilterError> {
        let raw = self.field(record, line, idx)?;
        // Accept a trailing time component, e.g. "2024-01-02 00:00:00".
        let day = raw.split([' ', 'T']).next().unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|e| self.error(line, format!("invalid date '{raw}': {e}")))
    }

    fn number(&self, record: &csv::StringRecord, line: usize, idx: usize) -> Result<f64, SlopeFilterError> {
        let raw = self.field(record, line, idx)?;
        let value: f64 = raw
            .parse()
            .map_err(|e| self.error(line, format!("invalid {} value '{raw}': {e}", self.headers[idx])))?;
        if !value.is_finite() {
            return Err(self.error(line, format!("non-finite {} value '{raw}'", self.headers[idx])));
        }
        Ok(value)
    }
}

fn parse_active(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}

// line numbers are 1-based and count the header row
fn line_of(i: usize) -> usize {
    i + 2
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, ticker: &str) -> Result<Vec<PricePoint>, SlopeFilterError> {
        let table = self.open(TICKERS_DIR, DatasetKind::Ticker, ticker)?;
        let (date, open, high, low, close) = (
            table.column("date")?,
            table.column("open")?,
            table.column("high")?,
            table.column("low")?,
            table.column("close")?,
        );
        let volume = table.column("volume")?;

        let mut points = Vec::with_capacity(table.rows.len());
        for (i, record) in table.rows.iter().enumerate() {
            let line = line_of(i);
            let raw_volume = table.field(record, line, volume)?;
            // Some vendors write volume as a float.
            let volume = raw_volume
                .parse::<i64>()
                .or_else(|_| raw_volume.parse::<f64>().map(|v| v as i64))
                .map_err(|e| table.error(line, format!("invalid volume value '{raw_volume}': {e}")))?;
            points.push(PricePoint {
                date: table.date(record, line, date)?,
                open: table.number(record, line, open)?,
                high: table.number(record, line, high)?,
                low: table.number(record, line, low)?,
                close: table.number(record, line, close)?,
                volume,
            });
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    fn fetch_oscillator(&self, branch: &str) -> Result<Vec<OscillatorPoint>, SlopeFilterError> {
        let table = self.open(TRADE_LOGS_DIR, DatasetKind::TradeLog, branch)?;
        let date = table.column("date")?;
        let active = table.column("active")?;
        let rsi = table.optional_column("rsi");

        let mut points = Vec::with_capacity(table.rows.len());
        for (i, record) in table.rows.iter().enumerate() {
            let line = line_of(i);
            let raw = table.field(record, line, active)?;
            let is_active =
                parse_active(raw).ok_or_else(|| table.error(line, format!("invalid active value '{raw}'")))?;
            let value = match rsi {
                Some(idx) if !table.field(record, line, idx)?.is_empty() => {
                    Some(table.number(record, line, idx)?)
                }
                _ => None,
            };
            points.push(OscillatorPoint {
                date: table.date(record, line, date)?,
                active: is_active,
                value,
            });
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    fn fetch_daily_returns(&self, dataset: &str) -> Result<Vec<DailyReturn>, SlopeFilterError> {
        let table = self.open(RETURNS_DIR, DatasetKind::Returns, dataset)?;
        let date = table.column("date")?;
        let value = table.column("portfolio_return")?;

        let mut points = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let line = line_of(i);
                Ok(DailyReturn {
                    date: table.date(record, line, date)?,
                    value: table.number(record, line, value)?,
                })
            })
            .collect::<Result<Vec<_>, SlopeFilterError>>()?;

        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    fn fetch_benchmark(&self, dataset: &str) -> Result<Vec<BenchmarkPoint>, SlopeFilterError> {
        let table = self.open(BENCHMARKS_DIR, DatasetKind::Benchmark, dataset)?;
        let date = table.column("date")?;
        let close = table.column("close")?;

        let mut points = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let line = line_of(i);
                Ok(BenchmarkPoint {
                    date: table.date(record, line, date)?,
                    close: table.number(record, line, close)?,
                })
            })
            .collect::<Result<Vec<_>, SlopeFilterError>>()?;

        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    fn list_tickers(&self) -> Result<Vec<String>, SlopeFilterError> {
        self.list_stems(TICKERS_DIR)
    }

    fn list_branches(&self) -> Result<Vec<String>, SlopeFilterError> {
        self.list_stems(TRADE_LOGS_DIR)
    }
}
