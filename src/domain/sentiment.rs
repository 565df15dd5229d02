use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score used when no headline signal exists.
pub const NEUTRAL_SENTIMENT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentClassification {
    Bearish,
    Neutral,
    Bullish,
}

impl fmt::Display for SentimentClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearish => write!(f, "Bearish"),
            Self::Neutral => write!(f, "Neutral"),
            Self::Bullish => write!(f, "Bullish"),
        }
    }
}

impl SentimentClassification {
    /// Classifies a single headline's compound polarity in [-1, 1].
    pub fn from_compound(compound: f64) -> Self {
        if compound >= 0.05 {
            Self::Bullish
        } else if compound <= -0.05 {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }

    /// Classifies an aggregate average in [-1, 1], which uses a wider neutral band.
    pub fn from_aggregate(average: f64) -> Self {
        if average >= 0.1 {
            Self::Bullish
        } else if average <= -0.1 {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }
}

/// A news item as delivered by the headline provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub published: Option<DateTime<Utc>>,
}

/// Maps polarity text to a compound score in [-1, 1].
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;
}

/// Maps a compound average in [-1, 1] onto [0, 1].
pub fn normalize_compound(compound: f64) -> f64 {
    ((compound.clamp(-1.0, 1.0)) + 1.0) / 2.0
}
