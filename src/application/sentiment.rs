use crate::domain::errors::ForecastError;
use crate::domain::ports::HeadlineProvider;
use crate::domain::sentiment::{
    Headline, NEUTRAL_SENTIMENT, SentimentClassification, SentimentScorer, normalize_compound,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Most recent headlines considered per symbol.
pub const DEFAULT_HEADLINE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineScore {
    pub title: String,
    pub compound: f64,
    pub classification: SentimentClassification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSummary {
    /// Normalized to [0, 1]; 0.5 is neutral.
    pub score: f64,
    pub average_compound: f64,
    pub classification: SentimentClassification,
    pub headlines: Vec<HeadlineScore>,
}

impl SentimentSummary {
    fn neutral() -> Self {
        Self {
            score: NEUTRAL_SENTIMENT,
            average_compound: 0.0,
            classification: SentimentClassification::Neutral,
            headlines: Vec::new(),
        }
    }
}

/// Averages per-headline polarity into a single [0, 1] sentiment score.
pub struct HeadlineSentimentAggregator {
    scorer: Arc<dyn SentimentScorer>,
    limit: usize,
}

impl HeadlineSentimentAggregator {
    pub fn new(scorer: Arc<dyn SentimentScorer>) -> Self {
        Self {
            scorer,
            limit: DEFAULT_HEADLINE_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Scores title and summary together for the first `limit` headlines.
    /// No headlines gives the neutral score.
    pub fn summarize(&self, headlines: &[Headline]) -> SentimentSummary {
        let scored: Vec<HeadlineScore> = headlines
            .iter()
            .take(self.limit)
            .map(|h| {
                let text = if h.summary.trim().is_empty() {
                    h.title.clone()
                } else {
                    format!("{} {}", h.title, h.summary)
                };
                let compound = self.scorer.score(&text);
                HeadlineScore {
                    title: h.title.clone(),
                    compound,
                    classification: SentimentClassification::from_compound(compound),
                }
            })
            .collect();

        if scored.is_empty() {
            return SentimentSummary::neutral();
        }

        let average = scored.iter().map(|h| h.compound).sum::<f64>() / scored.len() as f64;
        debug!("Scored {} headlines, average compound {:.3}", scored.len(), average);

        SentimentSummary {
            score: normalize_compound(average),
            average_compound: average,
            classification: SentimentClassification::from_aggregate(average),
            headlines: scored,
        }
    }

    /// Fetches and summarizes headlines for `symbol`.
    /// Provider failures are returned; substituting neutral is the caller's call.
    pub fn sentiment_for(
        &self,
        provider: &dyn HeadlineProvider,
        symbol: &str,
    ) -> Result<SentimentSummary, ForecastError> {
        let headlines = provider.fetch_headlines(symbol, self.limit)?;
        Ok(self.summarize(&headlines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// +1 per "up", -1 per "down", clamped.
    struct WordScorer;

    impl SentimentScorer for WordScorer {
        fn score(&self, text: &str) -> f64 {
            let up = text.matches("up").count() as f64;
            let down = text.matches("down").count() as f64;
            (up - down).clamp(-1.0, 1.0)
        }
    }

    struct FailingProvider;

    impl HeadlineProvider for FailingProvider {
        fn fetch_headlines(&self, symbol: &str, _limit: usize) -> Result<Vec<Headline>, ForecastError> {
            Err(ForecastError::UpstreamDataUnavailable {
                symbol: symbol.to_string(),
                reason: "feed offline".to_string(),
            })
        }
    }

    fn headline(title: &str, summary: &str) -> Headline {
        Headline {
            title: title.to_string(),
            summary: summary.to_string(),
            published: None,
        }
    }

    fn aggregator() -> HeadlineSentimentAggregator {
        HeadlineSentimentAggregator::new(Arc::new(WordScorer))
    }

    #[test]
    fn test_no_headlines_is_neutral() {
        let summary = aggregator().summarize(&[]);
        assert_eq!(summary.score, 0.5);
        assert_eq!(summary.classification, SentimentClassification::Neutral);
    }

    #[test]
    fn test_average_is_normalized() {
        let summary = aggregator().summarize(&[
            headline("shares up", ""),
            headline("guidance", "revised up"),
            headline("flat day", ""),
            headline("shares down", ""),
        ]);
        // compounds 1, 1, 0, -1 -> 0.25
        assert!((summary.average_compound - 0.25).abs() < 1e-12);
        assert!((summary.score - 0.625).abs() < 1e-12);
        assert_eq!(summary.classification, SentimentClassification::Bullish);
        assert_eq!(summary.headlines[1].classification, SentimentClassification::Bullish);
    }

    #[test]
    fn test_limit_applies() {
        let mut headlines = vec![headline("down", ""); 3];
        headlines.extend(vec![headline("up", ""); 20]);
        let summary = aggregator().with_limit(3).summarize(&headlines);
        assert_eq!(summary.headlines.len(), 3);
        assert_eq!(summary.score, 0.0);
    }

    #[test]
    fn test_provider_failure_is_surfaced() {
        let err = aggregator().sentiment_for(&FailingProvider, "TSLA").unwrap_err();
        assert!(matches!(err, ForecastError::UpstreamDataUnavailable { .. }));
    }
}
