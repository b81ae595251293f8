//! Engine-level error type.
//!
//! Maps the failure taxonomy onto the concern-local errors: being offline is
//! a silent no-op rather than an error, a missing remote document triggers
//! re-creation inside the push path, remote failures are retried once and
//! then surfaced as a transient status, and only genuinely actionable
//! failures (bad import codes, local I/O, invalid input) reach the caller as
//! values of this type.

use thiserror::Error;

use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::remote::RemoteError;
use crate::store::StoreError;

/// Errors surfaced by [`crate::sync::SyncEngine`] operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Malformed portable code; shown to the user immediately, no retry.
    #[error(transparent)]
    InvalidCode(#[from] CodecError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid partner email: {0}")]
    InvalidPartner(String),
}
