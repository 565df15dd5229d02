//! Daily price history from CSV files with a
//! `date,open,high,low,close,volume` header. Only `date` and `close` are
//! required; missing open/high/low fall back to the close.

use crate::domain::errors::ForecastError;
use crate::domain::market::PriceBar;
use crate::domain::ports::PriceHistoryProvider;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize)]
struct BarRecord {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(default, alias = "Open")]
    open: Option<Decimal>,
    #[serde(default, alias = "High")]
    high: Option<Decimal>,
    #[serde(default, alias = "Low")]
    low: Option<Decimal>,
    #[serde(alias = "Close")]
    close: Decimal,
    #[serde(default, alias = "Volume")]
    volume: Option<Decimal>,
}

impl From<BarRecord> for PriceBar {
    fn from(r: BarRecord) -> Self {
        PriceBar {
            date: r.date,
            open: r.open.unwrap_or(r.close),
            high: r.high.unwrap_or(r.close),
            low: r.low.unwrap_or(r.close),
            close: r.close,
            volume: r.volume.unwrap_or(Decimal::ZERO),
        }
    }
}

enum Source {
    /// One file serving whatever symbol is asked for.
    File(PathBuf),
    /// `<dir>/<SYMBOL>.csv`
    Directory(PathBuf),
}

pub struct CsvHistoryProvider {
    source: Source,
}

impl CsvHistoryProvider {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    pub fn from_directory(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Directory(dir.into()),
        }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        match &self.source {
            Source::File(path) => path.clone(),
            Source::Directory(dir) => dir.join(format!("{}.csv", symbol)),
        }
    }
}

/// Parses bars from any CSV reader, in file order.
pub fn read_bars<R: Read>(symbol: &str, reader: R) -> Result<Vec<PriceBar>, ForecastError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();

    for (line, result) in rdr.deserialize::<BarRecord>().enumerate() {
        let record = result.map_err(|e| ForecastError::UpstreamDataUnavailable {
            symbol: symbol.to_string(),
            reason: format!("row {}: {}", line + 1, e),
        })?;
        bars.push(PriceBar::from(record));
    }

    Ok(bars)
}

fn open(symbol: &str, path: &Path) -> Result<BufReader<File>, ForecastError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ForecastError::UpstreamDataUnavailable {
            symbol: symbol.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })
}

impl PriceHistoryProvider for CsvHistoryProvider {
    fn fetch_history(&self, symbol: &str) -> Result<Vec<PriceBar>, ForecastError> {
        let path = self.path_for(symbol);
        let bars = read_bars(symbol, open(symbol, &path)?)?;
        info!(symbol, bars = bars.len(), "Loaded price history from {:?}", path);
        Ok(bars)
    }
}
