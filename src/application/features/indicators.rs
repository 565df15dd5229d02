use crate::domain::errors::ForecastError;
use crate::domain::ml::FeatureRow;
use ta::Next;
use ta::indicators::{BollingerBands, MovingAverageConvergenceDivergence, SimpleMovingAverage};

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST_PERIOD: usize = 12;
pub const MACD_SLOW_PERIOD: usize = 26;
pub const MACD_SIGNAL_PERIOD: usize = 9;
pub const FAST_SMA_PERIOD: usize = 20;
pub const SLOW_SMA_PERIOD: usize = 50;
pub const TREND_SMA_PERIOD: usize = 200;
pub const BB_PERIOD: usize = 20;
pub const BB_STD_DEV: f64 = 2.0;

/// Bars consumed before every indicator in a [`FeatureRow`] is defined.
pub const WARMUP_BARS: usize = TREND_SMA_PERIOD;

/// RSI using Wilder's smoothing.
///
/// The first average is the plain mean of the first `period` gains and losses;
/// afterwards `avg = (avg * (n - 1) + value) / n`.
pub struct WilderRsi {
    period: usize,
    prev_close: Option<f64>,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: f64,
    avg_loss: f64,
    count: usize,
}

impl WilderRsi {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            prev_close: None,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            count: 0,
        }
    }

    /// Feeds one close; `None` until `period` price changes have been seen.
    pub fn next(&mut self, close: f64) -> Option<f64> {
        let prev = self.prev_close.replace(close)?;

        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let n = self.period as f64;

        self.count += 1;
        if self.count <= self.period {
            self.gain_sum += gain;
            self.loss_sum += loss;
            if self.count < self.period {
                return None;
            }
            self.avg_gain = self.gain_sum / n;
            self.avg_loss = self.loss_sum / n;
        } else {
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        }

        Some(rsi_from_averages(self.avg_gain, self.avg_loss))
    }
}

/// RSI = 100 − 100 / (1 + RS). A window without losses reads 100; a window
/// without any movement reads 50.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        return if avg_gain > 0.0 { 100.0 } else { 50.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Streaming computation of every model indicator over daily closes.
pub struct IndicatorEngine {
    rsi: WilderRsi,
    macd: MovingAverageConvergenceDivergence,
    sma_20: SimpleMovingAverage,
    sma_50: SimpleMovingAverage,
    sma_200: SimpleMovingAverage,
    bb: BollingerBands,
    bars_seen: usize,
}

impl IndicatorEngine {
    pub fn new() -> Result<Self, ForecastError> {
        let indicator_err = |e: ta::errors::TaError| ForecastError::model("indicators", format!("{:?}", e));

        Ok(Self {
            rsi: WilderRsi::new(RSI_PERIOD),
            macd: MovingAverageConvergenceDivergence::new(
                MACD_FAST_PERIOD,
                MACD_SLOW_PERIOD,
                MACD_SIGNAL_PERIOD,
            )
            .map_err(indicator_err)?,
            sma_20: SimpleMovingAverage::new(FAST_SMA_PERIOD).map_err(indicator_err)?,
            sma_50: SimpleMovingAverage::new(SLOW_SMA_PERIOD).map_err(indicator_err)?,
            sma_200: SimpleMovingAverage::new(TREND_SMA_PERIOD).map_err(indicator_err)?,
            bb: BollingerBands::new(BB_PERIOD, BB_STD_DEV).map_err(indicator_err)?,
            bars_seen: 0,
        })
    }

    /// Bars before the MACD signal line has a full window behind it.
    pub fn macd_warmup() -> usize {
        MACD_SLOW_PERIOD + MACD_SIGNAL_PERIOD - 1
    }

    /// Feeds one close. Returns a row only once every lookback window is full.
    pub fn update(&mut self, close: f64) -> Option<FeatureRow> {
        self.bars_seen += 1;

        // every indicator must see every bar, defined or not
        let rsi = self.rsi.next(close);
        let macd = self.macd.next(close);
        let sma_20 = self.sma_20.next(close);
        let sma_50 = self.sma_50.next(close);
        let sma_200 = self.sma_200.next(close);
        let bb = self.bb.next(close);

        if self.bars_seen < WARMUP_BARS.max(Self::macd_warmup()) {
            return None;
        }

        Some(FeatureRow {
            close,
            rsi: rsi?,
            macd: macd.macd,
            macd_signal: macd.signal,
            sma_20,
            sma_50,
            sma_200,
            bb_lower: bb.lower,
            bb_middle: bb.average,
            bb_upper: bb.upper,
        })
    }
}
