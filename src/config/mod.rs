//! Configuration module for pricecast.
//!
//! Settings are read from environment variables (with `.env` support in the
//! binary) or from a TOML document. Every field has a default so an empty
//! environment yields a working configuration.

mod model_config;
mod observability_config;

pub use model_config::{
    ConfidenceConfig, ModelPolicy, PriceClamp, SequenceConfig, TargetEncoding, TreeConfig,
};
pub use observability_config::ObservabilityEnvConfig;

use crate::domain::ml::FeatureLayout;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Main forecasting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Root directory of the model store.
    pub model_dir: PathBuf,
    pub model_policy: ModelPolicy,
    /// Feed min-max scaled rows to the tree model instead of raw indicator values.
    pub scaled_tree_input: bool,
    pub include_macd_signal: bool,
    pub target_encoding: TargetEncoding,
    pub price_clamp: PriceClamp,
    /// Runtime switch for the sequence model; the `sequence-model` feature must also be on.
    pub sequence_enabled: bool,
    /// Fit the tree and sequence models on separate rayon workers.
    pub parallel_training: bool,
    pub min_training_rows: usize,
    /// Daily returns used for the expected move.
    pub expected_move_window: usize,
    pub tree: TreeConfig,
    pub sequence: SequenceConfig,
    pub confidence: ConfidenceConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            model_policy: ModelPolicy::CacheModels,
            scaled_tree_input: true,
            include_macd_signal: true,
            target_encoding: TargetEncoding::Relative,
            price_clamp: PriceClamp::None,
            sequence_enabled: true,
            parallel_training: true,
            min_training_rows: 100,
            expected_move_window: 30,
            tree: TreeConfig::default(),
            sequence: SequenceConfig::default(),
            confidence: ConfidenceConfig::default(),
            observability: ObservabilityEnvConfig::default(),
        }
    }
}

impl ForecastConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source, falling back to defaults
    /// for missing keys. Malformed values are errors, not silent defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let tree = TreeConfig {
            n_trees: parse_or(&lookup, "PRICECAST_TREE_N_TREES", defaults.tree.n_trees)?,
            max_depth: parse_or(&lookup, "PRICECAST_TREE_MAX_DEPTH", defaults.tree.max_depth)?,
            min_samples_split: parse_or(
                &lookup,
                "PRICECAST_TREE_MIN_SAMPLES_SPLIT",
                defaults.tree.min_samples_split,
            )?,
            seed: parse_or(&lookup, "PRICECAST_TREE_SEED", defaults.tree.seed)?,
        };

        let sequence = SequenceConfig {
            window: parse_or(&lookup, "PRICECAST_SEQ_WINDOW", defaults.sequence.window)?,
            hidden_size: parse_or(
                &lookup,
                "PRICECAST_SEQ_HIDDEN_SIZE",
                defaults.sequence.hidden_size,
            )?,
            epochs: parse_or(&lookup, "PRICECAST_SEQ_EPOCHS", defaults.sequence.epochs)?,
            batch_size: parse_or(
                &lookup,
                "PRICECAST_SEQ_BATCH_SIZE",
                defaults.sequence.batch_size,
            )?,
            learning_rate: parse_or(
                &lookup,
                "PRICECAST_SEQ_LEARNING_RATE",
                defaults.sequence.learning_rate,
            )?,
            clip_norm: parse_or(&lookup, "PRICECAST_SEQ_CLIP_NORM", defaults.sequence.clip_norm)?,
            seed: parse_or(&lookup, "PRICECAST_SEQ_SEED", defaults.sequence.seed)?,
        };

        let config = Self {
            model_dir: lookup("PRICECAST_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            model_policy: parse_or(&lookup, "PRICECAST_MODEL_POLICY", defaults.model_policy)?,
            scaled_tree_input: parse_or(
                &lookup,
                "PRICECAST_SCALED_TREE_INPUT",
                defaults.scaled_tree_input,
            )?,
            include_macd_signal: parse_or(
                &lookup,
                "PRICECAST_INCLUDE_MACD_SIGNAL",
                defaults.include_macd_signal,
            )?,
            target_encoding: parse_or(
                &lookup,
                "PRICECAST_TARGET_ENCODING",
                defaults.target_encoding,
            )?,
            price_clamp: parse_or(&lookup, "PRICECAST_PRICE_CLAMP", defaults.price_clamp)?,
            sequence_enabled: parse_or(
                &lookup,
                "PRICECAST_SEQUENCE_ENABLED",
                defaults.sequence_enabled,
            )?,
            parallel_training: parse_or(
                &lookup,
                "PRICECAST_PARALLEL_TRAINING",
                defaults.parallel_training,
            )?,
            min_training_rows: parse_or(
                &lookup,
                "PRICECAST_MIN_TRAINING_ROWS",
                defaults.min_training_rows,
            )?,
            expected_move_window: parse_or(
                &lookup,
                "PRICECAST_EXPECTED_MOVE_WINDOW",
                defaults.expected_move_window,
            )?,
            tree,
            sequence,
            confidence: defaults.confidence,
            observability: ObservabilityEnvConfig::from_lookup(&lookup),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; absent tables and keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse forecast config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn feature_layout(&self) -> FeatureLayout {
        FeatureLayout {
            include_macd_signal: self.include_macd_signal,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sequence.window < 2 {
            anyhow::bail!("sequence window must be at least 2, got {}", self.sequence.window);
        }
        if self.sequence.hidden_size == 0 || self.sequence.batch_size == 0 {
            anyhow::bail!("sequence hidden_size and batch_size must be > 0");
        }
        if self.tree.n_trees == 0 {
            anyhow::bail!("tree n_trees must be > 0");
        }
        if self.expected_move_window < 2 {
            anyhow::bail!(
                "expected_move_window must be at least 2, got {}",
                self.expected_move_window
            );
        }
        if !(self.sequence.learning_rate > 0.0) {
            anyhow::bail!("sequence learning_rate must be positive");
        }
        Ok(())
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {} ({})", key, raw, e)),
        None => Ok(default),
    }
}
