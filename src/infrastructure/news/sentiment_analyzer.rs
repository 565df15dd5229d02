//! Headline polarity scoring with VADER plus an equity-market lexicon.
//!
//! VADER's general-purpose lexicon misses much of the vocabulary of
//! earnings and analyst coverage ("beats estimates", "downgrade", "guidance
//! cut"), so matching phrases nudge the compound score.

use crate::domain::sentiment::SentimentScorer;
use vader_sentiment::SentimentIntensityAnalyzer;

const BULLISH_PHRASES: &[(&str, f64)] = &[
    ("beats estimates", 0.5),
    ("beat estimates", 0.5),
    ("tops estimates", 0.4),
    ("raises guidance", 0.5),
    ("record revenue", 0.4),
    ("record high", 0.4),
    ("all-time high", 0.4),
    ("upgrade", 0.4),
    ("upgraded", 0.4),
    ("outperform", 0.3),
    ("buyback", 0.3),
    ("dividend increase", 0.3),
    ("surge", 0.4),
    ("surges", 0.4),
    ("rally", 0.4),
    ("rallies", 0.4),
    ("soars", 0.5),
    ("jumps", 0.3),
    ("bullish", 0.5),
    ("breakout", 0.3),
    ("partnership", 0.2),
    ("approval", 0.3),
];

const BEARISH_PHRASES: &[(&str, f64)] = &[
    ("misses estimates", -0.5),
    ("missed estimates", -0.5),
    ("cuts guidance", -0.5),
    ("lowers guidance", -0.5),
    ("profit warning", -0.5),
    ("downgrade", -0.4),
    ("downgraded", -0.4),
    ("underperform", -0.3),
    ("layoffs", -0.3),
    ("recall", -0.3),
    ("investigation", -0.3),
    ("lawsuit", -0.4),
    ("fraud", -0.5),
    ("bankruptcy", -0.6),
    ("plunge", -0.5),
    ("plunges", -0.5),
    ("tumbles", -0.4),
    ("crash", -0.5),
    ("sell-off", -0.4),
    ("selloff", -0.4),
    ("bearish", -0.5),
    ("sec probe", -0.4),
];

/// Weight of the lexicon boost relative to the VADER compound.
const BOOST_WEIGHT: f64 = 0.5;

/// VADER compound score with equity keyword boosting, clamped to [-1, 1].
pub struct SentimentAnalyzer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    /// Sum of lexicon scores found in `text`. Phrases match on word boundaries.
    fn market_boost(&self, text: &str) -> f64 {
        let normalized: String = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
            .collect();
        let padded = format!(" {} ", normalized.split_whitespace().collect::<Vec<_>>().join(" "));

        BULLISH_PHRASES
            .iter()
            .chain(BEARISH_PHRASES)
            .filter(|(phrase, _)| padded.contains(&format!(" {} ", phrase)))
            .map(|(_, score)| score)
            .sum()
    }

    pub fn analyze(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let scores = self.analyzer.polarity_scores(text);
        let compound = scores.get("compound").copied().unwrap_or(0.0);
        (compound + self.market_boost(text) * BOOST_WEIGHT).clamp(-1.0, 1.0)
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for SentimentAnalyzer {
    fn score(&self, text: &str) -> f64 {
        self.analyze(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullish_headlines() {
        let analyzer = SentimentAnalyzer::new();

        let headlines = [
            "Apple beats estimates as iPhone sales surge",
            "Analyst upgrade sends shares to record high",
            "Company raises guidance and announces buyback",
        ];

        for headline in headlines {
            let score = analyzer.analyze(headline);
            assert!(score > 0.0, "Expected bullish score for '{}', got {}", headline, score);
        }
    }

    #[test]
    fn test_bearish_headlines() {
        let analyzer = SentimentAnalyzer::new();

        let headlines = [
            "Retailer misses estimates and cuts guidance",
            "Shares plunge after fraud lawsuit",
            "Automaker downgraded amid recall and layoffs",
        ];

        for headline in headlines {
            let score = analyzer.analyze(headline);
            assert!(score < 0.0, "Expected bearish score for '{}', got {}", headline, score);
        }
    }

    #[test]
    fn test_neutral_headlines() {
        let analyzer = SentimentAnalyzer::new();
        for headline in [
            "Quarterly earnings report scheduled for Thursday",
            "Market closes unchanged from previous session",
        ] {
            let score = analyzer.analyze(headline);
            assert!(score.abs() < 0.5, "Expected neutral score for '{}', got {}", headline, score);
        }
    }

    #[test]
    fn test_phrases_match_whole_words() {
        let analyzer = SentimentAnalyzer::new();
        assert_eq!(analyzer.market_boost("recalled"), 0.0);
        assert_eq!(analyzer.market_boost("Product RECALL announced"), -0.3);
        assert_eq!(analyzer.market_boost("It beats estimates."), 0.5);
    }

    #[test]
    fn test_empty_text_and_bounds() {
        let analyzer = SentimentAnalyzer::new();
        assert_eq!(analyzer.score(""), 0.0);
        let score = analyzer.score("record high surge rally soars bullish upgrade breakout");
        assert!(score <= 1.0);
    }
}
