//! Sync status tracking.

/// Per-attempt sync status, surfaced to callers for display.
///
/// `Synced` and `Error` are transient: the engine reverts them to `Idle`
/// after a short display window. Failures always terminate here, never as a
/// propagated fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Synced,
    Error,
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Idle
    }
}

/// Point-in-time view of the engine's sync state.
#[derive(Debug, Clone, Default)]
pub struct SyncSnapshot {
    pub status: SyncStatus,
    /// Instant of the last successful push (millis).
    pub last_sync: Option<i64>,
    pub online: bool,
    /// Canonical email of a partner asking to connect, if a signal arrived.
    pub pending_partner_request: Option<String>,
}
