//! # Reconciler
//!
//! Pure merge of a local document with a strictly newer remote one.
//!
//! Collections are unioned (local wins on conflicting task ids) while the
//! scalar field group is last-write-wins in the remote's favour. The caller
//! enforces the precondition `remote.last_updated > local.last_updated`;
//! once the clock has advanced to match, re-merging the same remote document
//! changes nothing.
//!
//! Consequences worth knowing: a task edited differently on both sides keeps
//! the local edit, and because tasks are unioned a task removed on only one
//! side reappears. Removal is expected to go through the `deleted_at`
//! tombstone, which survives the union like any other task field.

use crate::model::Document;

/// Merge `remote` into `local`, producing the reconciled document.
pub fn merge(local: &Document, remote: &Document) -> Document {
    let mut tasks = local.tasks.clone();
    for remote_task in &remote.tasks {
        if !tasks.iter().any(|t| t.id == remote_task.id) {
            tasks.push(remote_task.clone());
        }
    }

    let mut today_list = local.today_list.clone();
    for item in &remote.today_list {
        if !today_list.contains(item) {
            today_list.push(item.clone());
        }
    }

    Document {
        tasks,
        today_list,
        settings: remote.settings.clone(),
        last_reset_timestamp: remote.last_reset_timestamp,
        last_updated: remote.last_updated,
    }
}
