//! # Local Durable Store
//!
//! Synchronous persistence of the whole document plus the VaultKey to bin-id
//! association. Both are single JSON files replaced atomically (temp file
//! then rename), written on every mutation and read once at startup.
//!
//! Local persistence never waits on the network: the engine writes here
//! before any push is even scheduled.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::model::Document;
use crate::remote::BinId;
use crate::vault::VaultKey;

const DOCUMENT_FILE: &str = "document.json";
const BIN_MAP_FILE: &str = "bins.json";

/// Local persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("local store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("local store serialization failure: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed store rooted at the configured data directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    document_path: PathBuf,
    bin_map_path: PathBuf,
}

impl LocalStore {
    /// Open the store, creating the data directory if needed.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            document_path: data_dir.join(DOCUMENT_FILE),
            bin_map_path: data_dir.join(BIN_MAP_FILE),
        })
    }

    /// Load the persisted document.
    ///
    /// A missing or unparseable file yields the default empty document:
    /// startup must not fail because the cache rotted.
    pub fn load_document(&self) -> Document {
        self.load_or_default(&self.document_path, "document")
    }

    pub fn save_document(&self, document: &Document) -> Result<(), StoreError> {
        self.write_atomic(&self.document_path, document)
    }

    /// Load the persisted VaultKey to bin-id map.
    pub fn load_bin_map(&self) -> HashMap<VaultKey, BinId> {
        self.load_or_default(&self.bin_map_path, "bin map")
    }

    pub fn save_bin_map(&self, map: &HashMap<VaultKey, BinId>) -> Result<(), StoreError> {
        self.write_atomic(&self.bin_map_path, map)
    }

    /// Remove all persisted state (the explicit user-triggered wipe).
    pub fn wipe(&self) -> Result<(), StoreError> {
        for path in [&self.document_path, &self.bin_map_path] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn load_or_default<T: DeserializeOwned + Default>(&self, path: &Path, what: &str) -> T {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
            Err(e) => {
                warn!("failed to read local {}: {}", what, e);
                return T::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!("local {} is corrupt, falling back to default: {}", what, e);
                T::default()
            }
        }
    }

    fn write_atomic<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
