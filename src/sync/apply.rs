//! Applying remote entries locally.

use tracing::debug;

use crate::sync::adapter::ItemApplier;
use crate::sync::manifest::ManifestStore;
use crate::sync::types::{ManifestEntry, SyncResult};

/// Writes a remote item through its adapter, then records it in the manifest.
///
/// On success the local manifest entry is replaced wholesale by the remote
/// entry, so comparing against the same remote state afterwards reports
/// nothing for that item. On failure the manifest is not touched.
pub struct ApplyEngine<'a, A: ItemApplier> {
    applier: &'a mut A,
    store: &'a mut ManifestStore,
}

impl<'a, A: ItemApplier> ApplyEngine<'a, A> {
    #[must_use]
    pub fn new(applier: &'a mut A, store: &'a mut ManifestStore) -> Self {
        Self { applier, store }
    }

    /// Apply one remote entry with its payload.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error; the manifest is unchanged in that case.
    pub fn apply(&mut self, remote_entry: &ManifestEntry, payload: &[u8]) -> SyncResult<()> {
        self.applier.write_item(remote_entry, payload)?;
        self.store.put(remote_entry.clone());
        debug!(item = %remote_entry.item_id, "Applied remote entry");
        Ok(())
    }
}
