//! Observability configuration parsing from environment variables.

use serde::{Deserialize, Serialize};

/// Observability environment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEnvConfig {
    /// Emit the Prometheus text exposition to stderr when a CLI run ends.
    pub enabled: bool,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            enabled: lookup("PRICECAST_METRICS_ENABLED")
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(false),
        }
    }
}
