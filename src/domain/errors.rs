use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that terminate a single forecast request.
///
/// Sequence-model unavailability is deliberately absent: it is a degradation
/// path handled inside the ensemble, never a failure.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Insufficient history: {bars} bars, need at least {required} for a fully-defined feature row")]
    InsufficientHistory { bars: usize, required: usize },

    #[error("Insufficient training data: {rows} usable rows < minimum {required}")]
    InsufficientTrainingData { rows: usize, required: usize },

    #[error("Model store I/O failure for {symbol}: {reason}")]
    ModelStoreIo { symbol: String, reason: String },

    #[error("Upstream data unavailable for {symbol}: {reason}")]
    UpstreamDataUnavailable { symbol: String, reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Model failure in {model}: {reason}")]
    Model { model: &'static str, reason: String },
}

impl ForecastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            Self::InsufficientTrainingData { .. } => ErrorKind::InsufficientTrainingData,
            Self::ModelStoreIo { .. } => ErrorKind::ModelStoreIOFailure,
            Self::UpstreamDataUnavailable { .. } => ErrorKind::UpstreamDataUnavailable,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Model { .. } => ErrorKind::ModelFailure,
        }
    }

    pub fn model(model: &'static str, reason: impl fmt::Display) -> Self {
        Self::Model {
            model,
            reason: reason.to_string(),
        }
    }

    pub fn store_io(symbol: &str, reason: impl fmt::Display) -> Self {
        Self::ModelStoreIo {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Wire-level classification of a [`ForecastError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InsufficientHistory,
    InsufficientTrainingData,
    #[serde(rename = "ModelStoreIOFailure")]
    ModelStoreIOFailure,
    UpstreamDataUnavailable,
    InvalidInput,
    ModelFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelStoreIOFailure => write!(f, "ModelStoreIOFailure"),
            other => write!(f, "{:?}", other),
        }
    }
}
