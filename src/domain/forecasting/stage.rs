//! Lifecycle of a single forecast request.
//!
//! ```text
//! Fetched → Validated → FeaturesBuilt → {Cached | Trained} → Predicted
//!         → Combined → Confidenced → Emitted
//! ```
//!
//! Any non-terminal stage may move to `Failed`. There are no retries: a failed
//! request stays failed and the caller decides what to do next.

use crate::domain::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastStage {
    Fetched,
    Validated,
    FeaturesBuilt,
    Cached,
    Trained,
    Predicted,
    Combined,
    Confidenced,
    Emitted,
    Failed(ErrorKind),
}

impl ForecastStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ForecastStage::Emitted | ForecastStage::Failed(_))
    }

    pub fn can_transition_to(&self, next: ForecastStage) -> bool {
        use ForecastStage::*;

        if let Failed(_) = next {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Fetched, Validated)
                | (Validated, FeaturesBuilt)
                | (FeaturesBuilt, Cached)
                | (FeaturesBuilt, Trained)
                | (Cached, Predicted)
                | (Trained, Predicted)
                | (Predicted, Combined)
                | (Combined, Confidenced)
                | (Confidenced, Emitted)
        )
    }
}

/// Records the path a request takes through [`ForecastStage`].
#[derive(Debug, Clone)]
pub struct StageTracker {
    symbol: String,
    trail: Vec<ForecastStage>,
}

impl StageTracker {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            trail: vec![ForecastStage::Fetched],
        }
    }

    pub fn current(&self) -> ForecastStage {
        // trail is never empty
        self.trail
            .last()
            .copied()
            .unwrap_or(ForecastStage::Fetched)
    }

    /// Moves to `next`, returning false (and staying put) on an illegal transition.
    pub fn advance(&mut self, next: ForecastStage) -> bool {
        let current = self.current();
        if !current.can_transition_to(next) {
            debug!(
                symbol = %self.symbol,
                "Rejected stage transition {:?} -> {:?}",
                current,
                next
            );
            return false;
        }
        debug!(symbol = %self.symbol, "Stage {:?} -> {:?}", current, next);
        self.trail.push(next);
        true
    }

    pub fn trail(&self) -> &[ForecastStage] {
        &self.trail
    }
}
