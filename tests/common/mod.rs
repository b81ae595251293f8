//! Shared test helpers: an in-memory blob store double with call counters
//! and failure injection, plus an engine constructor wired to a temp data
//! directory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use homebound::config::SyncConfig;
use homebound::model::Document;
use homebound::remote::{BinId, BlobStore, ConnectionSignal, RemoteError};
use homebound::sync::SyncEngine;
use homebound::vault::VaultKey;

/// In-memory [`BlobStore`] double.
#[derive(Default)]
pub struct MemoryBlobStore {
    bins: Mutex<HashMap<BinId, Document>>,
    signals: Mutex<HashMap<String, ConnectionSignal>>,
    next_id: AtomicUsize,
    /// Number of upcoming document operations that fail with HTTP 503.
    fail_next: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
    reads: AtomicUsize,
}

#[allow(dead_code)]
impl MemoryBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `n` document operations fail with a retryable error.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn bin(&self, id: &BinId) -> Option<Document> {
        self.bins.lock().unwrap().get(id).cloned()
    }

    pub fn bin_ids(&self) -> Vec<BinId> {
        self.bins.lock().unwrap().keys().cloned().collect()
    }

    pub fn put_bin(&self, id: BinId, document: Document) {
        self.bins.lock().unwrap().insert(id, document);
    }

    pub fn delete_bin(&self, id: &BinId) {
        self.bins.lock().unwrap().remove(id);
    }

    pub fn signal_for(&self, key: &VaultKey) -> Option<ConnectionSignal> {
        self.signals.lock().unwrap().get(key.as_str()).cloned()
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn maybe_fail(&self) -> Result<(), RemoteError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(RemoteError::Http { status: 503 });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn create(&self, document: &Document, _label: &str) -> Result<BinId, RemoteError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        let id = BinId(format!("bin-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.bins.lock().unwrap().insert(id.clone(), document.clone());
        Ok(id)
    }

    async fn read(&self, id: &BinId) -> Result<Document, RemoteError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        self.bins.lock().unwrap().get(id).cloned().ok_or(RemoteError::NotFound)
    }

    async fn update(&self, id: &BinId, document: &Document) -> Result<(), RemoteError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        let mut bins = self.bins.lock().unwrap();
        if !bins.contains_key(id) {
            return Err(RemoteError::NotFound);
        }
        bins.insert(id.clone(), document.clone());
        Ok(())
    }

    async fn send_signal(
        &self,
        recipient: &VaultKey,
        signal: &ConnectionSignal,
    ) -> Result<(), RemoteError> {
        self.signals.lock().unwrap().insert(recipient.as_str().to_string(), signal.clone());
        Ok(())
    }

    async fn read_signal(
        &self,
        recipient: &VaultKey,
    ) -> Result<Option<ConnectionSignal>, RemoteError> {
        Ok(self.signals.lock().unwrap().get(recipient.as_str()).cloned())
    }

    async fn clear_signal(&self, recipient: &VaultKey) -> Result<(), RemoteError> {
        self.signals.lock().unwrap().remove(recipient.as_str());
        Ok(())
    }
}

/// Test timing mirrors the production defaults (8s debounce, 2s retry,
/// 45s poll); tests run under tokio's paused clock so these never block.
pub fn test_config(data_dir: std::path::PathBuf) -> SyncConfig {
    SyncConfig::builder()
        .server_url("http://127.0.0.1:1")
        .api_key("test-key")
        .data_dir(data_dir)
        .debounce(Duration::from_secs(8))
        .poll_interval(Duration::from_secs(45))
        .retry_delay(Duration::from_secs(2))
        .build()
        .unwrap()
}

/// Engine backed by the given double and a fresh temp data directory.
pub fn engine_with(remote: Arc<MemoryBlobStore>) -> (TempDir, SyncEngine) {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path().to_path_buf());
    let engine = SyncEngine::new(config, remote).unwrap();
    (dir, engine)
}
