//! File-backed model store.
//!
//! One file per symbol, `<SYMBOL>.model.json`, holding an envelope with a
//! format version and a SHA-256 checksum of the serialized artifact. Writes go
//! to a uniquely named temp file in the same directory and are renamed over
//! the target, so readers see either the old artifact or the new one.

use crate::application::ml::{ModelArtifact, ModelRepository};
use crate::domain::errors::ForecastError;
use crate::domain::market::normalize_symbol;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

/// Bumped whenever the artifact layout changes incompatibly.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

const ARTIFACT_SUFFIX: &str = ".model.json";

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEnvelope {
    format_version: u32,
    symbol: String,
    checksum: String,
    payload: String,
}

pub fn checksum(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

/// Serializes an artifact into its on-disk envelope.
pub fn encode_artifact(artifact: &ModelArtifact) -> Result<String, ForecastError> {
    let symbol = normalize_symbol(&artifact.symbol)?;
    let payload = serde_json::to_string(artifact)
        .map_err(|e| ForecastError::store_io(&artifact.symbol, format!("serialize: {}", e)))?;
    let envelope = ArtifactEnvelope {
        format_version: ARTIFACT_FORMAT_VERSION,
        symbol,
        checksum: checksum(&payload),
        payload,
    };
    serde_json::to_string(&envelope)
        .map_err(|e| ForecastError::store_io(&artifact.symbol, format!("serialize envelope: {}", e)))
}

/// Verifies and decodes an envelope written by [`encode_artifact`].
pub fn decode_artifact(symbol: &str, content: &str) -> Result<ModelArtifact, ForecastError> {
    let symbol = normalize_symbol(symbol)?;
    let symbol = symbol.as_str();
    let envelope: ArtifactEnvelope = serde_json::from_str(content)
        .map_err(|e| ForecastError::store_io(symbol, format!("unreadable envelope: {}", e)))?;

    if envelope.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(ForecastError::store_io(
            symbol,
            format!(
                "format version {} (expected {})",
                envelope.format_version, ARTIFACT_FORMAT_VERSION
            ),
        ));
    }
    if envelope.symbol != symbol {
        return Err(ForecastError::store_io(
            symbol,
            format!("artifact belongs to {}", envelope.symbol),
        ));
    }
    if checksum(&envelope.payload) != envelope.checksum {
        return Err(ForecastError::store_io(symbol, "checksum mismatch"));
    }

    serde_json::from_str(&envelope.payload)
        .map_err(|e| ForecastError::store_io(symbol, format!("unreadable payload: {}", e)))
}

pub struct FileModelStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileModelStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ForecastError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            ForecastError::store_io("*", format!("create {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the artifact for an already normalized `symbol`.
    pub fn artifact_path(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("{}{}", symbol, ARTIFACT_SUFFIX))
    }

    /// Removes the stored artifact, if any.
    pub fn remove(&self, symbol: &str) -> Result<bool, ForecastError> {
        let symbol = normalize_symbol(symbol)?;
        let symbol = symbol.as_str();
        let lock = self.symbol_lock(symbol);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        match fs::remove_file(self.artifact_path(symbol)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ForecastError::store_io(symbol, format!("remove: {}", e))),
        }
    }

    fn symbol_lock(&self, symbol: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn write_atomically(&self, symbol: &str, content: &str) -> Result<(), ForecastError> {
        let target = self.artifact_path(symbol);
        let temp_path = self
            .root
            .join(format!(".{}.{}.tmp", symbol, Uuid::new_v4()));

        let written = File::create(&temp_path)
            .and_then(|mut file| {
                file.write_all(content.as_bytes())?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&temp_path, &target));

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(ForecastError::store_io(
                symbol,
                format!("write {}: {}", target.display(), e),
            ));
        }
        Ok(())
    }
}

impl ModelRepository for FileModelStore {
    fn load_or_none(&self, symbol: &str) -> Result<Option<ModelArtifact>, ForecastError> {
        let symbol = normalize_symbol(symbol)?;
        let symbol = symbol.as_str();
        let path = self.artifact_path(symbol);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(symbol, "No stored artifact at {:?}", path);
                return Ok(None);
            }
            Err(e) => {
                return Err(ForecastError::store_io(
                    symbol,
                    format!("read {}: {}", path.display(), e),
                ));
            }
        };

        let artifact = decode_artifact(symbol, &content)?;
        info!(symbol, "Loaded artifact from {:?}", path);
        Ok(Some(artifact))
    }

    fn save(&self, artifact: &ModelArtifact) -> Result<(), ForecastError> {
        let symbol = normalize_symbol(&artifact.symbol)?;
        let symbol = symbol.as_str();
        let content = encode_artifact(artifact)?;

        let lock = self.symbol_lock(symbol);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write_atomically(symbol, &content)?;

        info!(symbol, "Saved artifact to {:?}", self.artifact_path(symbol));
        Ok(())
    }
}
