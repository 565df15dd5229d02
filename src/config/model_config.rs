//! Model hyperparameters and pipeline policy switches.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a persisted artifact may be reused for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ModelPolicy {
    /// Reuse the stored artifact for a symbol regardless of data recency.
    #[default]
    CacheModels,
    /// Retrain on every request and overwrite the stored artifact.
    AlwaysRetrain,
}

impl FromStr for ModelPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cache-models" | "cache" => Ok(ModelPolicy::CacheModels),
            "always-retrain" | "retrain" => Ok(ModelPolicy::AlwaysRetrain),
            _ => anyhow::bail!(
                "Invalid model policy: {}. Must be 'cache-models' or 'always-retrain'",
                s
            ),
        }
    }
}

impl fmt::Display for ModelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelPolicy::CacheModels => write!(f, "cache-models"),
            ModelPolicy::AlwaysRetrain => write!(f, "always-retrain"),
        }
    }
}

/// How horizon targets are expressed before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TargetEncoding {
    /// Target = close at horizon minus close of the feature row.
    /// Forecast = latest close + inverse-scaled prediction.
    #[default]
    Relative,
    /// Target = close at horizon.
    Absolute,
}

impl FromStr for TargetEncoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relative" => Ok(TargetEncoding::Relative),
            "absolute" => Ok(TargetEncoding::Absolute),
            _ => anyhow::bail!(
                "Invalid target encoding: {}. Must be 'relative' or 'absolute'",
                s
            ),
        }
    }
}

/// Post-processing applied to price-unit forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PriceClamp {
    #[default]
    None,
    NonNegative,
}

impl FromStr for PriceClamp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(PriceClamp::None),
            "non-negative" | "nonnegative" => Ok(PriceClamp::NonNegative),
            _ => anyhow::bail!("Invalid price clamp: {}. Must be 'none' or 'non-negative'", s),
        }
    }
}

impl PriceClamp {
    pub fn apply(&self, price: f64) -> f64 {
        match self {
            PriceClamp::None => price,
            PriceClamp::NonNegative => price.max(0.0),
        }
    }
}

/// Random forest settings. `seed` is part of the reproducibility contract:
/// the same rows and seed always yield the same forest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: 12,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Trailing rows per sample.
    pub window: usize,
    pub hidden_size: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Global gradient-norm ceiling applied per batch.
    pub clip_norm: f64,
    pub seed: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            window: 60,
            hidden_size: 32,
            epochs: 5,
            batch_size: 32,
            learning_rate: 0.01,
            clip_norm: 1.0,
            seed: 42,
        }
    }
}

/// Constants of the confidence heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Confidence with perfect model agreement.
    pub base: f64,
    /// Penalty per unit of mean absolute scaled disagreement.
    pub disagreement_weight: f64,
    /// Starting point when only the tree model produced a prediction.
    pub single_model_base: f64,
    pub reversal_boost: f64,
    pub rsi_low: f64,
    pub rsi_high: f64,
    pub sentiment_high: f64,
    pub sentiment_low: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            base: 1.0,
            disagreement_weight: 2.0,
            single_model_base: 0.5,
            reversal_boost: 0.1,
            rsi_low: 30.0,
            rsi_high: 70.0,
            sentiment_high: 0.6,
            sentiment_low: 0.4,
        }
    }
}
