//! Homebound Sync - Main Library
//!
//! Replicated-state synchronization engine for a small shared checklist
//! document: a deck of recurring household task cards, a "bring home today"
//! list, and the settings tying one or two partners to a shared vault.
//!
//! # Overview
//!
//! The engine treats the whole application state as one JSON [`model::Document`]
//! and keeps three replicas loosely convergent:
//!
//! - the in-memory document, mutated by user actions;
//! - a local durable copy ([`store::LocalStore`]), written synchronously on
//!   every mutation;
//! - a remote blob ([`remote::BlobStore`]) addressed by a deterministic
//!   [`vault::VaultKey`], pushed after a debounce window and pulled on a
//!   poll interval.
//!
//! Conflict resolution is merge-on-read ([`sync::reconciler`]): collections
//! are unioned, scalar fields are last-write-wins by the `lastUpdated`
//! logical clock. A portable base64 code ([`codec`]) covers manual
//! device-to-device transfer when no remote store is configured.
//!
//! # Module Structure
//!
//! - **`model`** - the document, tasks, settings and clock helpers
//! - **`vault`** - order-independent key derivation from partner emails
//! - **`store`** - local durable persistence (atomic JSON files)
//! - **`remote`** - blob store trait and the reqwest HTTP implementation
//! - **`sync`** - the engine: debounced push, polling pull, reconciliation
//! - **`codec`** - portable export/import codes
//! - **`config`** / **`error`** - configuration and the error taxonomy
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use homebound::config::SyncConfig;
//! use homebound::model::Frequency;
//! use homebound::remote::HttpBlobStore;
//! use homebound::sync::SyncEngine;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::from_env()?;
//! let remote = Arc::new(HttpBlobStore::from_config(&config)?);
//! let engine = SyncEngine::new(config, remote)?;
//!
//! engine.onboard("alice@example.com", Some("bob@example.com"), false).await?;
//! engine.start().await;
//! engine.add_task("Milk", Frequency::Daily).await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod store;
pub mod sync;
pub mod vault;

pub use error::SyncError;
