//! # Portable Vault Codec
//!
//! Encodes the shareable subset of a document into a printable string for
//! manual device-to-device transfer (copy-paste through a clipboard or text
//! field), independent of the remote store.
//!
//! The payload keeps the original short-key wire layout (`t`/`s`/`l`) and is
//! base64-encoded JSON: no compression, no encryption.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Document, Settings, Task};

/// Codec failures. Always a value, never a panic: the caller shows a
/// "bad code" message and moves on.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid code: not valid base64")]
    Decode(#[from] base64::DecodeError),
    #[error("invalid code: not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("invalid code: malformed payload")]
    Parse(#[from] serde_json::Error),
}

/// The transferable subset of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortablePayload {
    #[serde(rename = "t")]
    pub tasks: Vec<Task>,
    #[serde(rename = "s")]
    pub settings: Settings,
    #[serde(rename = "l")]
    pub today_list: Vec<String>,
}

impl From<&Document> for PortablePayload {
    fn from(doc: &Document) -> Self {
        Self {
            tasks: doc.tasks.clone(),
            settings: doc.settings.clone(),
            today_list: doc.today_list.clone(),
        }
    }
}

/// Encode `{tasks, settings, todayList}` as a printable ASCII string.
pub fn export(document: &Document) -> String {
    let payload = PortablePayload::from(document);
    let json = serde_json::to_vec(&payload).expect("document model serializes");
    BASE64.encode(json)
}

/// Decode a portable code back into its document fragment.
pub fn import(code: &str) -> Result<PortablePayload, CodecError> {
    let bytes = BASE64.decode(code.trim())?;
    let json = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&json)?)
}
