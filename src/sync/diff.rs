//! Manifest comparison.
//!
//! [`compare`] classifies every item into upload, download and conflict
//! lists in one pass over each manifest:
//!
//! - local-only, sync-enabled → upload
//! - remote-only → download
//! - both sides, equal hash → nothing, whatever the timestamps say
//! - both sides, different hash → conflict, plus an upload or download chosen
//!   by the [`ConflictResolver`]
//!
//! Local entries with sync disabled are skipped entirely: never uploaded and
//! never reported as conflicting. They still occupy their id, so a remote
//! copy of the same item is not downloaded over them either; disabling only
//! stops pushing, and incoming items with new ids still arrive.

use tracing::trace;

use crate::sync::resolve::ConflictResolver;
use crate::sync::types::{Manifest, SyncAction, SyncConflict, SyncDifferences};

/// Compare two manifests with the default last-writer-wins resolver.
#[must_use]
pub fn compare(local: &Manifest, remote: &Manifest) -> SyncDifferences {
    compare_with(local, remote, &ConflictResolver::default())
}

/// Compare two manifests using `resolver` for hash mismatches.
#[must_use]
pub fn compare_with(
    local: &Manifest,
    remote: &Manifest,
    resolver: &ConflictResolver,
) -> SyncDifferences {
    let mut diff = SyncDifferences::default();

    for local_entry in local.iter().filter(|e| e.is_sync_enabled) {
        let Some(remote_entry) = remote.get(&local_entry.item_id) else {
            trace!(item = %local_entry.item_id, "Local only");
            diff.to_upload.push(local_entry.clone());
            continue;
        };

        if remote_entry.content_hash == local_entry.content_hash {
            continue;
        }

        let action = resolver.decide(local_entry, remote_entry);
        trace!(item = %local_entry.item_id, %action, "Hash mismatch");
        match action {
            SyncAction::Upload => diff.to_upload.push(local_entry.clone()),
            SyncAction::Download => diff.to_download.push(remote_entry.clone()),
        }
        diff.conflicts.push(SyncConflict {
            item_id: local_entry.item_id.clone(),
            local_version: local_entry.clone(),
            remote_version: remote_entry.clone(),
        });
    }

    for remote_entry in remote.iter() {
        if !local.contains(&remote_entry.item_id) {
            trace!(item = %remote_entry.item_id, "Remote only");
            diff.to_download.push(remote_entry.clone());
        }
    }

    diff
}
