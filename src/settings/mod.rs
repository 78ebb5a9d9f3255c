//! Configuration item kind.
//!
//! Every key in the allow-list becomes one manifest entry whose value is the
//! typed setting inline. The payload moved over the wire is the JSON form of
//! [`SettingValue`] (`{"Int":5}`); the content hash covers its canonical
//! encoding, so the two sides agree on equality regardless of formatting.
//!
//! An entry's modification time is the key's last write on this booth. Values
//! that only exist as defaults are dated to a fixed point in the past, so a
//! booth that was never configured does not override one that was.

mod catalog;
mod store;

pub use catalog::{SYNCABLE_SETTINGS, SettingDescriptor, SettingKind, find_descriptor};
pub use store::{SettingsStore, unwritten_timestamp};

use serde_json::Value;
use tracing::{debug, warn};

use crate::sync::{
    EntryEnumerator, EntryValue, ItemApplier, ItemKind, ManifestEntry, SettingValue, SyncError,
    SyncResult, value_hash,
};

/// Manifest entry for a typed setting value.
#[must_use]
pub fn setting_entry(descriptor: &SettingDescriptor, value: SettingValue) -> ManifestEntry {
    let hash = value_hash(&value);
    let mut entry = ManifestEntry::new(descriptor.key, descriptor.category, EntryValue::Inline(value), hash)
        .with_priority(descriptor.priority());
    entry
        .metadata
        .insert("type".to_string(), Value::String(descriptor.kind.to_string()));
    entry
}

/// Adapter syncing the allow-listed configuration keys.
#[derive(Debug)]
pub struct SettingsAdapter {
    store: SettingsStore,
    catalog: &'static [SettingDescriptor],
}

impl SettingsAdapter {
    /// Adapter over the default allow-list.
    #[must_use]
    pub fn new(store: SettingsStore) -> Self {
        Self::with_catalog(store, SYNCABLE_SETTINGS)
    }

    #[must_use]
    pub fn with_catalog(store: SettingsStore, catalog: &'static [SettingDescriptor]) -> Self {
        Self { store, catalog }
    }

    #[must_use]
    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    fn descriptor(&self, key: &str) -> SyncResult<&'static SettingDescriptor> {
        self.catalog
            .iter()
            .find(|d| d.key == key)
            .ok_or_else(|| SyncError::UnknownItem(key.to_string()))
    }
}

impl EntryEnumerator for SettingsAdapter {
    fn kind(&self) -> ItemKind {
        ItemKind::Settings
    }

    fn enumerate(&self) -> SyncResult<Vec<ManifestEntry>> {
        let mut entries = Vec::with_capacity(self.catalog.len());
        for descriptor in self.catalog {
            match self.store.read(descriptor) {
                Ok(Some(value)) => entries.push(
                    setting_entry(descriptor, value)
                        .with_last_modified(self.store.modified_at(descriptor.key)),
                ),
                Ok(None) => debug!(key = descriptor.key, "Unset; not synced"),
                Err(e) => warn!(key = descriptor.key, error = %e, "Skipping unreadable setting"),
            }
        }
        Ok(entries)
    }

    fn read_payload(&self, entry: &ManifestEntry) -> SyncResult<Vec<u8>> {
        match &entry.value {
            EntryValue::Inline(value) => Ok(serde_json::to_vec(value)?),
            EntryValue::Path(_) => Err(SyncError::UnknownItem(entry.item_id.clone())),
        }
    }
}

impl ItemApplier for SettingsAdapter {
    fn write_item(&mut self, entry: &ManifestEntry, payload: &[u8]) -> SyncResult<()> {
        let descriptor = self.descriptor(&entry.item_id)?;
        let incoming: SettingValue = serde_json::from_slice(payload)?;

        let actual = value_hash(&incoming);
        if actual != entry.content_hash {
            return Err(SyncError::HashMismatch {
                item_id: entry.item_id.clone(),
                expected: entry.content_hash.clone(),
                actual,
            });
        }

        // Only values already in the key's stored form are accepted. Anything
        // else would be written under a different hash than the one recorded.
        let converted = descriptor.kind.convert(descriptor.key, incoming.clone())?;
        if converted != incoming {
            return Err(SyncError::Conversion {
                key: descriptor.key.to_string(),
                message: format!("{incoming} is not in stored form (expected {converted})"),
            });
        }
        self.store.set_and_save(descriptor.key, &converted)?;
        debug!(key = descriptor.key, value = %converted, "Applied setting");
        Ok(())
    }
}
