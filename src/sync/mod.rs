//! # Sync Engine
//!
//! Owns the in-memory document and coordinates the two independent halves of
//! synchronization:
//!
//! - **Push**: every mutation persists locally at once, then (re)starts a
//!   debounce window; when it elapses one push uploads the document. A
//!   manual force-sync bypasses the debounce. An in-flight guard covers the
//!   whole attempt, including the create-if-missing fallback, so two pushes
//!   can never race to create duplicate remote documents.
//! - **Pull**: one pull at startup, then a fixed-interval poll (plus a
//!   partner-signal check). A fetched document is applied only when its
//!   logical clock is strictly ahead of ours, via [`reconciler::merge`].
//!
//! All mutations — user actions, accepted pulls, accepted imports — funnel
//! through one entry point that advances the logical clock and writes the
//! local store under the same lock, so no stale read-modify-write can slip
//! in between a snapshot and a concurrent pull.
//!
//! Push and pull failures never escape: they end in a transient status
//! (auto-reverting to idle) or are silently absorbed while offline.

pub mod reconciler;
pub mod scheduler;
pub mod status;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::{canonical_email, local_day_start_millis, now_millis, Document, Frequency, Task, Theme};
use crate::remote::{BinId, BlobStore, ConnectionSignal, RemoteError};
use crate::store::LocalStore;
use crate::vault::VaultKey;

use scheduler::{Debouncer, PollHandle};
pub use status::{SyncSnapshot, SyncStatus};

/// Which way a card was swiped. Right means "bring home today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

struct EngineInner {
    config: SyncConfig,
    store: LocalStore,
    remote: Arc<dyn BlobStore>,
    document: RwLock<Document>,
    /// VaultKey to bin-id cache, mirrored to the local store once known so
    /// repeated runs reuse the same remote document.
    bin_ids: RwLock<HashMap<VaultKey, BinId>>,
    status: RwLock<SyncStatus>,
    last_sync: RwLock<Option<i64>>,
    pending_partner_request: RwLock<Option<String>>,
    online: AtomicBool,
    /// In-flight push guard. Held across update *and* create-if-missing.
    push_guard: Mutex<()>,
    push_debounce: Debouncer,
    status_revert: Debouncer,
    poll: StdMutex<Option<PollHandle>>,
}

/// Cheaply cloneable handle to the engine.
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl Clone for SyncEngine {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl SyncEngine {
    /// Construct the engine: open the local store and load the persisted
    /// document and bin-id map.
    pub fn new(config: SyncConfig, remote: Arc<dyn BlobStore>) -> Result<Self, SyncError> {
        let store = LocalStore::open(&config.data_dir)?;
        let document = store.load_document();
        let bin_ids = store.load_bin_map();
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                store,
                remote,
                document: RwLock::new(document),
                bin_ids: RwLock::new(bin_ids),
                status: RwLock::new(SyncStatus::Idle),
                last_sync: RwLock::new(None),
                pending_partner_request: RwLock::new(None),
                online: AtomicBool::new(true),
                push_guard: Mutex::new(()),
                push_debounce: Debouncer::new(),
                status_revert: Debouncer::new(),
                poll: StdMutex::new(None),
            }),
        })
    }

    /// Snapshot of the current document.
    pub async fn document(&self) -> Document {
        self.inner.document.read().await.clone()
    }

    /// Current sync state for display.
    pub async fn status(&self) -> SyncSnapshot {
        SyncSnapshot {
            status: *self.inner.status.read().await,
            last_sync: *self.inner.last_sync.read().await,
            online: self.inner.online.load(Ordering::SeqCst),
            pending_partner_request: self.inner.pending_partner_request.read().await.clone(),
        }
    }

    /// Tasks currently in the deck (active, not tombstoned, not dismissed
    /// today).
    pub async fn active_tasks(&self) -> Vec<Task> {
        let day_start = local_day_start_millis();
        let doc = self.inner.document.read().await;
        doc.active_tasks(day_start).into_iter().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Mutations. Every one serializes through `mutate`.
    // ------------------------------------------------------------------

    /// The single mutation entry point: apply `f` under the write lock,
    /// advance the logical clock, persist locally, then schedule a debounced
    /// push. Local persistence never waits on the network.
    async fn mutate<R>(&self, f: impl FnOnce(&mut Document) -> R) -> Result<R, SyncError> {
        let result = {
            let mut doc = self.inner.document.write().await;
            let result = f(&mut doc);
            doc.bump_clock();
            self.inner.store.save_document(&doc)?;
            result
        };
        self.schedule_push();
        Ok(result)
    }

    /// Add a new task card at the top of the deck.
    pub async fn add_task(&self, name: &str, frequency: Frequency) -> Result<Task, SyncError> {
        let name = name.to_string();
        self.mutate(move |doc| {
            let task = Task::new(name, frequency, doc.tasks.len());
            doc.tasks.insert(0, task.clone());
            task
        })
        .await
    }

    /// Swipe a card. Either direction dismisses it for the rest of the day;
    /// a right swipe additionally puts its name on the today list.
    ///
    /// Returns `false` when the id is unknown (nothing is mutated).
    pub async fn swipe(&self, id: Uuid, direction: SwipeDirection) -> Result<bool, SyncError> {
        let name = {
            let doc = self.inner.document.read().await;
            doc.tasks.iter().find(|t| t.id == id).map(|t| t.name.clone())
        };
        let Some(name) = name else {
            return Ok(false);
        };
        self.mutate(move |doc| {
            if direction == SwipeDirection::Right && !doc.today_list.contains(&name) {
                doc.today_list.push(name);
            }
            if let Some(task) = doc.tasks.iter_mut().find(|t| t.id == id) {
                task.last_dismissed = Some(now_millis());
            }
        })
        .await?;
        Ok(true)
    }

    /// Manual "reset today": empty the today list and clear every dismissal
    /// so all tasks rejoin the deck.
    pub async fn reset_today(&self) -> Result<(), SyncError> {
        self.mutate(|doc| {
            doc.today_list.clear();
            for task in &mut doc.tasks {
                task.last_dismissed = None;
            }
            doc.last_reset_timestamp = now_millis();
        })
        .await
    }

    /// Complete first-run onboarding. Canonicalizes identities and, when a
    /// partner was named, leaves them a best-effort connection signal.
    pub async fn onboard(
        &self,
        email: &str,
        partner_email: Option<&str>,
        is_subscribed: bool,
    ) -> Result<(), SyncError> {
        let email = canonical_email(email);
        let partner = partner_email.map(canonical_email).filter(|p| !p.is_empty());
        {
            let email = email.clone();
            let partner = partner.clone();
            self.mutate(move |doc| {
                doc.settings.email = email;
                doc.settings.partner_email = partner;
                doc.settings.is_subscribed = is_subscribed;
                doc.settings.has_onboarded = true;
            })
            .await?;
        }
        if let Some(partner) = partner {
            self.send_connection_signal(&email, &partner).await;
        }
        Ok(())
    }

    /// Link a partner after onboarding and signal them.
    pub async fn connect_partner(&self, partner_email: &str) -> Result<(), SyncError> {
        let partner = canonical_email(partner_email);
        let own = {
            let doc = self.inner.document.read().await;
            doc.settings.email.clone()
        };
        if !partner.contains('@') {
            return Err(SyncError::InvalidPartner(partner));
        }
        if partner == own {
            return Err(SyncError::InvalidPartner(partner));
        }
        {
            let partner = partner.clone();
            self.mutate(move |doc| {
                doc.settings.partner_email = Some(partner);
            })
            .await?;
        }
        self.send_connection_signal(&own, &partner).await;
        Ok(())
    }

    /// Accept a pending partner request surfaced by the signal channel.
    ///
    /// Returns `false` when no request is pending.
    pub async fn accept_partner_request(&self) -> Result<bool, SyncError> {
        let Some(from) = self.inner.pending_partner_request.write().await.take() else {
            return Ok(false);
        };
        self.mutate(move |doc| {
            doc.settings.partner_email = Some(from);
        })
        .await?;
        self.clear_own_signal().await;
        Ok(true)
    }

    /// Decline a pending partner request, clearing the signal.
    pub async fn decline_partner_request(&self) {
        self.inner.pending_partner_request.write().await.take();
        self.clear_own_signal().await;
    }

    /// Flip the display theme.
    pub async fn set_theme(&self, theme: Theme) -> Result<(), SyncError> {
        self.mutate(move |doc| {
            doc.settings.theme = theme;
        })
        .await
    }

    /// Encode the shareable subset of the document as a portable code.
    pub async fn export_code(&self) -> String {
        let doc = self.inner.document.read().await;
        codec::export(&doc)
    }

    /// Apply a portable code, replacing tasks, settings and the today list.
    ///
    /// A malformed code is a typed error; the document is untouched.
    pub async fn apply_import(&self, code: &str) -> Result<(), SyncError> {
        let payload = codec::import(code)?;
        self.mutate(move |doc| {
            doc.tasks = payload.tasks;
            doc.settings = payload.settings;
            doc.settings.email = canonical_email(&doc.settings.email);
            doc.settings.partner_email =
                doc.settings.partner_email.take().map(|p| canonical_email(&p));
            doc.today_list = payload.today_list;
        })
        .await
    }

    /// Wipe all local state: durable files, in-memory document, bin cache.
    pub async fn wipe(&self) -> Result<(), SyncError> {
        self.inner.store.wipe()?;
        *self.inner.document.write().await = Document::default();
        self.inner.bin_ids.write().await.clear();
        self.set_status(SyncStatus::Idle).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle.
    // ------------------------------------------------------------------

    /// Start background sync: one startup pull, then the poll loop.
    pub async fn start(&self) {
        if self.inner.poll.lock().expect("poll lock poisoned").is_some() {
            return;
        }
        if let Err(e) = self.pull_once().await {
            warn!("startup pull failed: {}", e);
        }
        let engine = self.clone();
        let handle = scheduler::spawn_poll(self.inner.config.poll_interval, move || {
            let engine = engine.clone();
            async move {
                engine.poll_tick().await;
            }
        });
        *self.inner.poll.lock().expect("poll lock poisoned") = Some(handle);
    }

    /// Stop background sync and cancel any pending push.
    pub fn stop(&self) {
        if let Some(handle) = self.inner.poll.lock().expect("poll lock poisoned").take() {
            handle.stop();
        }
        self.inner.push_debounce.cancel();
        self.inner.status_revert.cancel();
    }

    /// Record connectivity. Going offline parks both sync halves (cancelling
    /// the pending debounce, not any in-flight local write); coming back
    /// online resumes from a clean slate with a fresh pull.
    pub async fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
        if online {
            let engine = self.clone();
            tokio::spawn(async move {
                if let Err(e) = engine.pull_once().await {
                    warn!("pull after reconnect failed: {}", e);
                }
            });
        } else {
            self.inner.push_debounce.cancel();
            self.set_status(SyncStatus::Idle).await;
        }
    }

    // ------------------------------------------------------------------
    // Push path.
    // ------------------------------------------------------------------

    /// Push immediately, bypassing the debounce window.
    pub async fn force_sync(&self) {
        self.request_push(true).await;
    }

    /// Attempt a push. Silent no-op when identity is unset, onboarding is
    /// incomplete, or we are offline. A non-forced request skips when a push
    /// is already in flight; a forced one waits its turn (never two network
    /// calls racing). Failures retry once and then settle into a transient
    /// error status.
    pub async fn request_push(&self, force: bool) {
        let ready = {
            let doc = self.inner.document.read().await;
            !doc.settings.email.is_empty() && doc.settings.has_onboarded
        };
        if !ready || !self.inner.online.load(Ordering::SeqCst) {
            self.set_status(SyncStatus::Idle).await;
            return;
        }

        let _guard = if force {
            self.inner.push_guard.lock().await
        } else {
            match self.inner.push_guard.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!("push already in flight, skipping");
                    return;
                }
            }
        };

        self.set_status(SyncStatus::Syncing).await;
        let snapshot = self.document().await;
        match self.attempt_push(&snapshot).await {
            Ok(()) => {
                self.record_push_success().await;
                return;
            }
            Err(e) => {
                warn!("push failed, retrying once: {}", e);
            }
        }

        tokio::time::sleep(self.inner.config.retry_delay).await;
        if !self.inner.online.load(Ordering::SeqCst) {
            self.set_status(SyncStatus::Idle).await;
            return;
        }
        // Fresh snapshot: mutations may have landed during the delay.
        let snapshot = self.document().await;
        match self.attempt_push(&snapshot).await {
            Ok(()) => self.record_push_success().await,
            Err(e) => {
                warn!("push failed twice, giving up until next trigger: {}", e);
                self.set_status(SyncStatus::Error).await;
                self.schedule_status_revert(SyncStatus::Error, self.inner.config.error_window);
            }
        }
    }

    /// One upload: update the known bin, or create one (re-creating when the
    /// old bin vanished) and persist the new association.
    async fn attempt_push(&self, snapshot: &Document) -> Result<(), RemoteError> {
        let key =
            VaultKey::derive(&snapshot.settings.email, snapshot.settings.partner_email.as_deref());

        let known = self.inner.bin_ids.read().await.get(&key).cloned();
        if let Some(id) = known {
            match self.inner.remote.update(&id, snapshot).await {
                Ok(()) => return Ok(()),
                Err(RemoteError::NotFound) => {
                    info!("remote document {} vanished, re-creating", id.as_str());
                    self.inner.bin_ids.write().await.remove(&key);
                }
                Err(e) => return Err(e),
            }
        }

        let label = format!("Homebound Vault - {}", snapshot.settings.email);
        let id = self.inner.remote.create(snapshot, &label).await?;
        let map = {
            let mut bin_ids = self.inner.bin_ids.write().await;
            bin_ids.insert(key, id);
            bin_ids.clone()
        };
        // The push itself succeeded; a failure to persist the mapping only
        // costs a duplicate bin on some future run.
        if let Err(e) = self.inner.store.save_bin_map(&map) {
            warn!("failed to persist bin map: {}", e);
        }
        Ok(())
    }

    async fn record_push_success(&self) {
        *self.inner.last_sync.write().await = Some(now_millis());
        self.set_status(SyncStatus::Synced).await;
        self.schedule_status_revert(SyncStatus::Synced, self.inner.config.synced_window);
    }

    /// (Re)start the debounce window for a push.
    fn schedule_push(&self) {
        if !self.inner.online.load(Ordering::SeqCst) {
            return;
        }
        let engine = self.clone();
        self.inner.push_debounce.schedule(self.inner.config.debounce, move || async move {
            engine.request_push(false).await;
        });
    }

    fn schedule_status_revert(&self, from: SyncStatus, window: std::time::Duration) {
        let engine = self.clone();
        self.inner.status_revert.schedule(window, move || async move {
            let mut status = engine.inner.status.write().await;
            if *status == from {
                *status = SyncStatus::Idle;
            }
        });
    }

    async fn set_status(&self, status: SyncStatus) {
        *self.inner.status.write().await = status;
    }

    // ------------------------------------------------------------------
    // Pull path.
    // ------------------------------------------------------------------

    /// Fetch the remote document and reconcile it if strictly newer.
    ///
    /// Returns whether a merge was applied. With no known bin id there is
    /// nothing to fetch (the next push will create the document). A remote
    /// document at or behind our clock is discarded, leaving local state
    /// untouched.
    pub async fn pull_once(&self) -> Result<bool, SyncError> {
        if !self.inner.online.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let key = {
            let doc = self.inner.document.read().await;
            if doc.settings.email.is_empty() {
                return Ok(false);
            }
            VaultKey::derive(&doc.settings.email, doc.settings.partner_email.as_deref())
        };
        let Some(id) = self.inner.bin_ids.read().await.get(&key).cloned() else {
            debug!("no bin id known for {}, skipping pull", key);
            return Ok(false);
        };

        let remote_doc = match self.inner.remote.read(&id).await {
            Ok(doc) => doc,
            Err(RemoteError::NotFound) => {
                info!("remote document {} gone, dropping stale mapping", id.as_str());
                let map = {
                    let mut bin_ids = self.inner.bin_ids.write().await;
                    bin_ids.remove(&key);
                    bin_ids.clone()
                };
                if let Err(e) = self.inner.store.save_bin_map(&map) {
                    warn!("failed to persist bin map: {}", e);
                }
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        // Hold the write lock across the staleness check, the merge and the
        // durable write so a concurrent mutation cannot interleave.
        let mut doc = self.inner.document.write().await;
        if remote_doc.last_updated <= doc.last_updated {
            debug!(
                "discarding stale remote document ({} <= {})",
                remote_doc.last_updated, doc.last_updated
            );
            return Ok(false);
        }
        *doc = reconciler::merge(&doc, &remote_doc);
        self.inner.store.save_document(&doc)?;
        info!("applied remote document at clock {}", doc.last_updated);
        Ok(true)
    }

    /// One poll-loop beat: dormant while offline, otherwise check for a
    /// partner signal and pull. Errors are logged; the loop always survives
    /// to the next tick.
    async fn poll_tick(&self) {
        if !self.inner.online.load(Ordering::SeqCst) {
            return;
        }
        self.check_signal().await;
        if let Err(e) = self.pull_once().await {
            warn!("periodic pull failed: {}", e);
        }
    }

    /// Best-effort check of the signal channel addressed to us. An incoming
    /// signal surfaces as a pending partner request in the status snapshot.
    /// Runs on every poll beat; callable on demand as well.
    pub async fn check_signal(&self) {
        let email = {
            let doc = self.inner.document.read().await;
            doc.settings.email.clone()
        };
        if email.is_empty() {
            return;
        }
        let key = VaultKey::derive(&email, None);
        match self.inner.remote.read_signal(&key).await {
            Ok(Some(signal)) if signal.from != email => {
                info!("partner connection request from {}", signal.from);
                *self.inner.pending_partner_request.write().await = Some(signal.from);
            }
            Ok(_) => {}
            Err(e) => debug!("signal check failed (ignored): {}", e),
        }
    }

    /// Best-effort connection signal to a partner's own vault key. Failure
    /// is logged and discarded by contract.
    async fn send_connection_signal(&self, from: &str, partner: &str) {
        let key = VaultKey::derive(partner, None);
        let signal = ConnectionSignal { from: from.to_string(), at: now_millis() };
        if let Err(e) = self.inner.remote.send_signal(&key, &signal).await {
            debug!("connection signal dropped (ignored): {}", e);
        }
    }

    async fn clear_own_signal(&self) {
        let email = {
            let doc = self.inner.document.read().await;
            doc.settings.email.clone()
        };
        if email.is_empty() {
            return;
        }
        let key = VaultKey::derive(&email, None);
        if let Err(e) = self.inner.remote.clear_signal(&key).await {
            debug!("signal clear failed (ignored): {}", e);
        }
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Some(handle) = self.poll.lock().ok().and_then(|mut p| p.take()) {
            handle.stop();
        }
    }
}
