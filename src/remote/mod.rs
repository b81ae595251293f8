//! # Remote Blob Store
//!
//! Abstract capability the sync engine consumes: create, read and update one
//! opaque JSON document per vault, plus a best-effort partner signal channel.
//! The store offers no compare-and-swap; every write is a blind overwrite,
//! and the engine's logical clock is the only staleness defence.
//!
//! The engine, not this module, owns the VaultKey to [`BinId`] association.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Document;
use crate::vault::VaultKey;

pub use http::HttpBlobStore;

/// Opaque identifier of a remote document, assigned by the store on create.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BinId(pub String);

impl BinId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Remote call failures.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The identified document no longer exists. The caller re-creates.
    #[error("remote document not found")]
    NotFound,
    /// Non-2xx response other than 404.
    #[error("remote call failed with HTTP {status}")]
    Http { status: u16 },
    /// Connection, DNS or timeout failure.
    #[error("network transport failure: {0}")]
    Transport(String),
    /// Response body was not the expected shape.
    #[error("undecodable remote response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Transport(_) => true,
            RemoteError::Http { status } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

/// Partner connection signal, keyed by the recipient's vault key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSignal {
    /// Canonical email of the sender.
    pub from: String,
    /// Send instant (millis).
    pub at: i64,
}

/// Capability interface for the remote store.
///
/// Document operations must succeed for sync to work; the signal operations
/// are best-effort by contract and the engine logs and discards their
/// failures.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create a new remote document, returning its assigned id.
    async fn create(&self, document: &Document, label: &str) -> Result<BinId, RemoteError>;

    /// Fetch a remote document by id.
    async fn read(&self, id: &BinId) -> Result<Document, RemoteError>;

    /// Overwrite a remote document by id.
    async fn update(&self, id: &BinId, document: &Document) -> Result<(), RemoteError>;

    /// Leave a connection signal for the recipient.
    async fn send_signal(
        &self,
        recipient: &VaultKey,
        signal: &ConnectionSignal,
    ) -> Result<(), RemoteError>;

    /// Check for a pending signal addressed to the recipient.
    async fn read_signal(&self, recipient: &VaultKey)
        -> Result<Option<ConnectionSignal>, RemoteError>;

    /// Remove any pending signal addressed to the recipient.
    async fn clear_signal(&self, recipient: &VaultKey) -> Result<(), RemoteError>;
}
