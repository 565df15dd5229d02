//! In-memory model store.
//!
//! Artifacts are kept in their encoded envelope form, so loads go through the
//! same checksum and decoding path as the file store. Suitable for tests and
//! single-process runs; nothing survives a restart.

use super::model_store::{decode_artifact, encode_artifact};
use crate::application::ml::{ModelArtifact, ModelRepository};
use crate::domain::errors::ForecastError;
use crate::domain::market::normalize_symbol;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct InMemoryModelStore {
    artifacts: RwLock<HashMap<String, String>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores raw envelope text under an already normalized `symbol`, bypassing encoding.
    pub fn insert_raw(&self, symbol: &str, content: impl Into<String>) {
        let mut artifacts = self.artifacts.write().unwrap_or_else(|e| e.into_inner());
        artifacts.insert(symbol.to_string(), content.into());
    }
}

impl ModelRepository for InMemoryModelStore {
    fn load_or_none(&self, symbol: &str) -> Result<Option<ModelArtifact>, ForecastError> {
        let symbol = normalize_symbol(symbol)?;
        let artifacts = self.artifacts.read().unwrap_or_else(|e| e.into_inner());
        artifacts
            .get(&symbol)
            .map(|content| decode_artifact(&symbol, content))
            .transpose()
    }

    fn save(&self, artifact: &ModelArtifact) -> Result<(), ForecastError> {
        let symbol = normalize_symbol(&artifact.symbol)?;
        let content = encode_artifact(artifact)?;
        self.insert_raw(&symbol, content);
        Ok(())
    }
}
