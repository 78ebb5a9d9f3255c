//! Per-kind adapters consumed by the sync core.
//!
//! Each item kind supplies one type implementing both traits: it lists the
//! local items as manifest entries, serves their payloads for upload, and
//! writes accepted remote payloads back into the local store.

use crate::sync::types::{ItemKind, ManifestEntry, SyncResult};

/// Lists syncable local items.
pub trait EntryEnumerator {
    /// Kind of item this adapter handles.
    fn kind(&self) -> ItemKind;

    /// Scan the local store.
    ///
    /// An item that cannot be read is logged and left out; a single failure
    /// never aborts the scan.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store as a whole cannot be read, which
    /// fails the sync run.
    fn enumerate(&self) -> SyncResult<Vec<ManifestEntry>>;

    /// Bytes to push for a local entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the item can no longer be read.
    fn read_payload(&self, entry: &ManifestEntry) -> SyncResult<Vec<u8>>;
}

/// Writes accepted remote items into the local store.
pub trait ItemApplier {
    /// Verify `payload` against `entry` and write it locally.
    ///
    /// Must leave the local store untouched when it returns an error.
    ///
    /// # Errors
    ///
    /// Returns an error on hash mismatch, conversion failure or write failure.
    fn write_item(&mut self, entry: &ManifestEntry, payload: &[u8]) -> SyncResult<()>;
}
