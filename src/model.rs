//! # Document Model
//!
//! The synchronized application state and its entities. A [`Document`] is the
//! unit of synchronization: the task deck, the "bring home today" list, user
//! settings, and the logical clock used for staleness comparison.
//!
//! Wire format matches the original camelCase JSON layout (`todayList`,
//! `lastResetTimestamp`, `lastUpdated`) so documents written by any client
//! of the shared vault stay interoperable. All timestamps are wall-clock
//! milliseconds.

use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Card colours assigned round-robin at task creation.
pub const CARD_COLORS: [&str; 8] = [
    "rose", "amber", "emerald", "sky", "violet", "indigo", "fuchsia", "orange",
];

/// Current wall-clock time in milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Start of the current local calendar day, in milliseconds.
///
/// Dismissals are scoped to the local day: a task swiped yesterday is active
/// again today.
pub fn local_day_start_millis() -> i64 {
    let now = Local::now();
    let midnight = now.date_naive().and_hms_opt(0, 0, 0).expect("midnight is a valid time");
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis())
}

/// Canonical form of an email identity: lower-cased and trimmed.
///
/// Every identity is canonicalized before it is stored or used as a key
/// input, so `" Alice@Example.com "` and `"alice@example.com"` address the
/// same vault.
pub fn canonical_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// How often a task recurs. Informational only: frequency does not drive
/// automatic scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Alternate,
    Weekly,
    OneTime,
    Custom,
}

/// Display theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// A recurring household task card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque unique identifier, generated client-side, immutable.
    pub id: Uuid,
    /// Free-text label.
    pub name: String,
    pub frequency: Frequency,
    /// Display tag from [`CARD_COLORS`], chosen by creation order.
    pub color: String,
    /// Creation instant (millis).
    pub created_at: i64,
    /// Set when the card is swiped in either direction; cleared by the daily
    /// reset. A dismissed task stays out of the deck for the rest of the
    /// local day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_dismissed: Option<i64>,
    /// Soft-delete flag. Current operations never flip this to false.
    pub is_active: bool,
    /// Deletion tombstone (millis). No current operation sets this, but the
    /// merge and display paths honour it so hard deletion can be layered in
    /// without another migration of the wire format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl Task {
    /// Create a task with the colour for the given creation index.
    pub fn new(name: impl Into<String>, frequency: Frequency, creation_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            frequency,
            color: CARD_COLORS[creation_index % CARD_COLORS.len()].to_string(),
            created_at: now_millis(),
            last_dismissed: None,
            is_active: true,
            deleted_at: None,
        }
    }

    /// Whether this task belongs in the deck, given the start of the current
    /// local day.
    pub fn is_active_for(&self, day_start: i64) -> bool {
        if !self.is_active || self.deleted_at.is_some() {
            return false;
        }
        match self.last_dismissed {
            Some(at) => at < day_start,
            None => true,
        }
    }
}

/// Identity and preferences. Replaced wholesale (remote wins) during merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Primary identity, canonical form. Empty until onboarding completes.
    #[serde(default)]
    pub email: String,
    /// Optional partner identity, canonical form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_email: Option<String>,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(default = "default_theme")]
    pub theme: Theme,
    /// Gate for the first-run flow; sync stays dormant until this is set.
    #[serde(default)]
    pub has_onboarded: bool,
    #[serde(default)]
    pub notifications_enabled: bool,
    /// Daily reminder time in `HH:mm`.
    #[serde(default = "default_reminder_time")]
    pub reminder_time: String,
}

fn default_theme() -> Theme {
    Theme::Dark
}

fn default_reminder_time() -> String {
    "17:00".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            email: String::new(),
            partner_email: None,
            is_subscribed: false,
            theme: Theme::Dark,
            has_onboarded: false,
            notifications_enabled: false,
            reminder_time: default_reminder_time(),
        }
    }
}

/// The full synchronized state.
///
/// `last_updated` is the logical clock: wall-clock millis at the last local
/// mutation, and the sole authority for deciding whether an incoming remote
/// document is newer. It is advanced only by local mutation or by accepting
/// a strictly newer remote document. Clock skew between partner devices can
/// misorder the scalar-field merge; this is a known, accepted limitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Insertion order is display order, newest first. Unique by id.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Task names selected "for today". Order preserved for display only.
    #[serde(default)]
    pub today_list: Vec<String>,
    #[serde(default)]
    pub settings: Settings,
    /// Instant of the last manual "reset today".
    #[serde(default)]
    pub last_reset_timestamp: i64,
    /// Logical clock, see type-level docs.
    #[serde(default)]
    pub last_updated: i64,
}

impl Default for Document {
    fn default() -> Self {
        let now = now_millis();
        Self {
            tasks: Vec::new(),
            today_list: Vec::new(),
            settings: Settings::default(),
            last_reset_timestamp: now,
            last_updated: now,
        }
    }
}

impl Document {
    /// Advance the logical clock past its current value.
    ///
    /// Uses wall-clock time but never moves backwards, so a burst of
    /// mutations inside one millisecond still produces distinct clocks.
    pub fn bump_clock(&mut self) {
        self.last_updated = now_millis().max(self.last_updated + 1);
    }

    /// Tasks currently in the deck, given the start of the local day.
    pub fn active_tasks(&self, day_start: i64) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_active_for(day_start)).collect()
    }
}
