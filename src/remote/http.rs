//! HTTP implementation of the blob store against a JSONBin-style API.
//!
//! Documents live under `{base}/b` (`POST` to create, `GET`/`PUT` by id);
//! reads come back wrapped in a `{"record": ...}` envelope and creates
//! return `{"metadata": {"id": ...}}`. Signals live under
//! `{base}/s/{vault_key}`. Every request carries the `X-Master-Key` header
//! and is bounded by the configured transport timeout.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::model::Document;
use crate::vault::VaultKey;

use super::{BinId, BlobStore, ConnectionSignal, RemoteError};

/// Application tag stamped into every pushed payload.
const APP_NAME: &str = "Homebound";
/// Payload schema version.
const APP_VERSION: &str = "2.0";

/// Outbound document with identification tags, as the original client wrote.
#[derive(Serialize)]
struct SyncPayload<'a> {
    #[serde(flatten)]
    document: &'a Document,
    app: &'a str,
    version: &'a str,
}

#[derive(Deserialize)]
struct ReadEnvelope {
    record: Document,
}

#[derive(Deserialize)]
struct CreateEnvelope {
    metadata: CreateMetadata,
}

#[derive(Deserialize)]
struct CreateMetadata {
    id: String,
}

/// reqwest-backed [`BlobStore`].
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBlobStore {
    pub fn from_config(config: &SyncConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(RemoteError::from)?;
        Ok(Self {
            client,
            base_url: config.server_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn bin_url(&self, id: &BinId) -> String {
        format!("{}/b/{}", self.base_url, id.as_str())
    }

    fn signal_url(&self, recipient: &VaultKey) -> String {
        format!("{}/s/{}", self.base_url, recipient)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-Master-Key", key),
            None => request,
        }
    }

    fn check_status(status: StatusCode) -> Result<(), RemoteError> {
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::NOT_FOUND {
            Err(RemoteError::NotFound)
        } else {
            Err(RemoteError::Http { status: status.as_u16() })
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn create(&self, document: &Document, label: &str) -> Result<BinId, RemoteError> {
        let payload = SyncPayload { document, app: APP_NAME, version: APP_VERSION };
        // Bin names are capped server-side; trim rather than 400.
        let name: String = label.chars().take(128).collect();
        let response = self
            .authed(self.client.post(format!("{}/b", self.base_url)))
            .header("X-Bin-Name", name)
            .header("X-Bin-Private", "true")
            .json(&payload)
            .send()
            .await?;
        Self::check_status(response.status())?;
        let envelope: CreateEnvelope = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(BinId(envelope.metadata.id))
    }

    async fn read(&self, id: &BinId) -> Result<Document, RemoteError> {
        let response = self.authed(self.client.get(self.bin_url(id))).send().await?;
        Self::check_status(response.status())?;
        let envelope: ReadEnvelope = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(envelope.record)
    }

    async fn update(&self, id: &BinId, document: &Document) -> Result<(), RemoteError> {
        let payload = SyncPayload { document, app: APP_NAME, version: APP_VERSION };
        let response = self
            .authed(self.client.put(self.bin_url(id)))
            .json(&payload)
            .send()
            .await?;
        Self::check_status(response.status())
    }

    async fn send_signal(
        &self,
        recipient: &VaultKey,
        signal: &ConnectionSignal,
    ) -> Result<(), RemoteError> {
        let response = self
            .authed(self.client.put(self.signal_url(recipient)))
            .json(signal)
            .send()
            .await?;
        Self::check_status(response.status())
    }

    async fn read_signal(
        &self,
        recipient: &VaultKey,
    ) -> Result<Option<ConnectionSignal>, RemoteError> {
        let response = self.authed(self.client.get(self.signal_url(recipient))).send().await?;
        match Self::check_status(response.status()) {
            Ok(()) => {
                let signal = response
                    .json()
                    .await
                    .map_err(|e| RemoteError::Decode(e.to_string()))?;
                Ok(Some(signal))
            }
            Err(RemoteError::NotFound) => Ok(None),
            Err(other) => Err(other),
        }
    }

    async fn clear_signal(&self, recipient: &VaultKey) -> Result<(), RemoteError> {
        let response = self.authed(self.client.delete(self.signal_url(recipient))).send().await?;
        match Self::check_status(response.status()) {
            // Already gone is fine.
            Ok(()) | Err(RemoteError::NotFound) => Ok(()),
            Err(other) => Err(other),
        }
    }
}
