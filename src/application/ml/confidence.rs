use crate::config::ConfidenceConfig;

/// Mean absolute difference between two scaled prediction vectors.
pub fn disagreement(tree: [f64; 2], sequence: [f64; 2]) -> f64 {
    tree.iter()
        .zip(sequence.iter())
        .map(|(a, b)| (a - b).abs())
        .sum::<f64>()
        / tree.len() as f64
}

/// Heuristic trust score in [0, 1].
///
/// Starts from model agreement (or a fixed base when only the tree model
/// ran) and adds a boost when RSI and sentiment point to the same reversal:
/// oversold with bullish news, or overbought with bearish news.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceEstimator {
    config: ConfidenceConfig,
}

impl ConfidenceEstimator {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    pub fn estimate(
        &self,
        tree: [f64; 2],
        sequence: Option<[f64; 2]>,
        rsi: f64,
        sentiment: f64,
    ) -> f64 {
        let c = &self.config;
        let base = match sequence {
            Some(seq) => c.base - c.disagreement_weight * disagreement(tree, seq),
            None => c.single_model_base,
        };

        let oversold_bullish = rsi < c.rsi_low && sentiment > c.sentiment_high;
        let overbought_bearish = rsi > c.rsi_high && sentiment < c.sentiment_low;
        let boost = if oversold_bullish || overbought_bearish {
            c.reversal_boost
        } else {
            0.0
        };

        let score = base + boost;
        if score.is_nan() {
            return 0.0;
        }
        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> ConfidenceEstimator {
        ConfidenceEstimator::new(ConfidenceConfig::default())
    }

    #[test]
    fn test_perfect_agreement_is_full_confidence() {
        let c = estimator().estimate([0.4, 0.6], Some([0.4, 0.6]), 50.0, 0.5);
        assert_eq!(c, 1.0);
    }

    #[test]
    fn test_disagreement_lowers_confidence() {
        // mean |diff| = 0.1 -> 1 - 2 * 0.1
        let c = estimator().estimate([0.4, 0.6], Some([0.5, 0.5]), 50.0, 0.5);
        assert!((c - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_large_disagreement_floors_at_zero() {
        let c = estimator().estimate([0.0, 0.0], Some([3.0, -3.0]), 50.0, 0.5);
        assert_eq!(c, 0.0);
    }

    #[test]
    fn test_tree_only_uses_single_model_base() {
        assert_eq!(estimator().estimate([0.3, 0.3], None, 50.0, 0.5), 0.5);
    }

    #[test]
    fn test_reversal_boost() {
        let e = estimator();
        assert!((e.estimate([0.3, 0.3], None, 25.0, 0.8) - 0.6).abs() < 1e-9);
        assert!((e.estimate([0.3, 0.3], None, 75.0, 0.2) - 0.6).abs() < 1e-9);
        // mixed signals get nothing
        assert_eq!(e.estimate([0.3, 0.3], None, 25.0, 0.2), 0.5);
        // boost cannot push past 1
        assert_eq!(e.estimate([0.3, 0.3], Some([0.3, 0.3]), 25.0, 0.8), 1.0);
    }

    #[test]
    fn test_always_within_unit_interval() {
        let e = estimator();
        for tree in [[-5.0, 5.0], [0.0, 1.0], [10.0, 10.0]] {
            for seq in [None, Some([0.0, 0.0]), Some([f64::NAN, 0.0])] {
                for rsi in [0.0, 29.0, 50.0, 71.0, 100.0] {
                    let c = e.estimate(tree, seq, rsi, 0.9);
                    assert!((0.0..=1.0).contains(&c), "{}", c);
                }
            }
        }
    }
}
