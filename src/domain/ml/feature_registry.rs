use serde::{Deserialize, Serialize};

/// Fully-defined indicator values for one trading session.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureRow {
    pub close: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub sma_20: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub bb_lower: f64,
    pub bb_middle: f64,
    pub bb_upper: f64,
}

/// Ordered list of model input columns.
/// Persisted artifacts record the active subset; a model trained on one order
/// must never be fed another.
pub const FEATURE_NAMES: &[&str] = &[
    "close",
    "rsi",
    "macd",
    "macd_signal",
    "sma_20",
    "sma_50",
    "sma_200",
    "bb_lower",
    "bb_upper",
];

/// Which optional columns take part in the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub include_macd_signal: bool,
}

impl Default for FeatureLayout {
    fn default() -> Self {
        Self {
            include_macd_signal: true,
        }
    }
}

impl FeatureLayout {
    pub fn columns(&self) -> Vec<&'static str> {
        FEATURE_NAMES
            .iter()
            .copied()
            .filter(|name| self.include_macd_signal || *name != "macd_signal")
            .collect()
    }

    pub fn width(&self) -> usize {
        if self.include_macd_signal {
            FEATURE_NAMES.len()
        } else {
            FEATURE_NAMES.len() - 1
        }
    }

    /// Flattens a row in column order.
    pub fn to_vector(&self, row: &FeatureRow) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.width());
        values.push(row.close);
        values.push(row.rsi);
        values.push(row.macd);
        if self.include_macd_signal {
            values.push(row.macd_signal);
        }
        values.push(row.sma_20);
        values.push(row.sma_50);
        values.push(row.sma_200);
        values.push(row.bb_lower);
        values.push(row.bb_upper);
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> FeatureRow {
        FeatureRow {
            close: 101.0,
            rsi: 55.0,
            macd: 0.4,
            macd_signal: 0.3,
            sma_20: 100.0,
            sma_50: 98.0,
            sma_200: 90.0,
            bb_lower: 95.0,
            bb_middle: 100.0,
            bb_upper: 105.0,
        }
    }

    #[test]
    fn test_feature_vector_length() {
        let layout = FeatureLayout::default();
        let vec = layout.to_vector(&sample_row());
        assert_eq!(vec.len(), FEATURE_NAMES.len());
        assert_eq!(layout.columns().len(), layout.width());
    }

    #[test]
    fn test_feature_consistency() {
        let vec = FeatureLayout::default().to_vector(&sample_row());
        // close is index 0, bb_upper last
        assert_eq!(vec[0], 101.0);
        assert_eq!(vec[3], 0.3);
        assert_eq!(vec[8], 105.0);
    }

    #[test]
    fn test_layout_without_signal_drops_column() {
        let layout = FeatureLayout {
            include_macd_signal: false,
        };
        let vec = layout.to_vector(&sample_row());
        assert_eq!(vec.len(), 8);
        assert!(!layout.columns().contains(&"macd_signal"));
        // sma_20 shifts into the signal slot
        assert_eq!(vec[3], 100.0);
    }
}
