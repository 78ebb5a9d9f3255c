//! Sync types shared by every item kind.
//!
//! A manifest maps item identifiers to [`ManifestEntry`] rows. The diff engine
//! compares two manifests and produces [`SyncDifferences`]; the orchestrator
//! reports progress through [`SyncEvent`]s.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::value::SettingValue;

/// The two domains kept in sync. Each has its own manifest and adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Configuration key/value pairs.
    Settings,
    /// On-disk template files.
    Templates,
}

impl ItemKind {
    /// All kinds, in the order a full sync processes them.
    pub const ALL: [Self; 2] = [Self::Settings, Self::Templates];

    /// Directory / file stem used for this kind on disk and on the remote.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Templates => "templates",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "settings" | "setting" | "config" => Ok(Self::Settings),
            "templates" | "template" => Ok(Self::Templates),
            _ => Err(format!("Unknown item kind: {s}")),
        }
    }
}

/// Payload reference carried by an entry: an inline value or a relative path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EntryValue {
    /// Inline configuration value.
    Inline(SettingValue),
    /// Path of a template file, relative to the template root, `/`-separated.
    Path(String),
}

/// One row of a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManifestEntry {
    /// Stable identifier, unique within one manifest.
    pub item_id: String,
    /// Grouping tag; informational only.
    pub category: String,
    /// Payload reference.
    pub value: EntryValue,
    /// Lowercase hex SHA-256 of the canonical value or raw file bytes.
    pub content_hash: String,
    /// When the entry was last written locally or reported by the remote.
    pub last_modified: DateTime<Utc>,
    /// Disabled entries are never pushed.
    #[serde(default = "default_sync_enabled")]
    pub is_sync_enabled: bool,
    /// Display ordering hint.
    #[serde(default)]
    pub priority: i32,
    /// Free-form facts captured at enumeration time; round-tripped only.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

const fn default_sync_enabled() -> bool {
    true
}

impl ManifestEntry {
    /// Create an enabled entry stamped with the current time.
    #[must_use]
    pub fn new(
        item_id: impl Into<String>,
        category: impl Into<String>,
        value: EntryValue,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            category: category.into(),
            value,
            content_hash: content_hash.into(),
            last_modified: Utc::now(),
            is_sync_enabled: true,
            priority: 0,
            metadata: serde_json::Map::new(),
        }
    }

    /// Override the modification time.
    #[must_use]
    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Override the display priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Whether `last_modified` carries a real timestamp (not the Unix epoch).
    #[must_use]
    pub fn has_valid_timestamp(&self) -> bool {
        self.last_modified.timestamp() > 0
    }

    /// Relative path for template entries.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match &self.value {
            EntryValue::Path(p) => Some(p),
            EntryValue::Inline(_) => None,
        }
    }
}

/// Mapping from item id to entry, iterated in id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, item_id: &str) -> Option<&ManifestEntry> {
        self.entries.get(item_id)
    }

    pub fn get_mut(&mut self, item_id: &str) -> Option<&mut ManifestEntry> {
        self.entries.get_mut(item_id)
    }

    /// Insert or replace the entry keyed by its `item_id`.
    pub fn insert(&mut self, entry: ManifestEntry) -> Option<ManifestEntry> {
        self.entries.insert(entry.item_id.clone(), entry)
    }

    pub fn remove(&mut self, item_id: &str) -> Option<ManifestEntry> {
        self.entries.remove(item_id)
    }

    #[must_use]
    pub fn contains(&self, item_id: &str) -> bool {
        self.entries.contains_key(item_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.values()
    }

    /// Make every entry's `item_id` agree with its map key.
    ///
    /// Returns the number of entries that had to be corrected.
    pub fn normalize_ids(&mut self) -> usize {
        let mut fixed = 0;
        for (key, entry) in &mut self.entries {
            if entry.item_id != *key {
                entry.item_id.clone_from(key);
                fixed += 1;
            }
        }
        fixed
    }
}

impl FromIterator<ManifestEntry> for Manifest {
    fn from_iter<I: IntoIterator<Item = ManifestEntry>>(iter: I) -> Self {
        let mut manifest = Self::new();
        for entry in iter {
            manifest.insert(entry);
        }
        manifest
    }
}

impl IntoIterator for Manifest {
    type Item = ManifestEntry;
    type IntoIter = std::collections::btree_map::IntoValues<String, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

/// A manifest written for another device to read, tagged with its writer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportedManifest {
    /// Identifier of the installation that last wrote this document.
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries: Manifest,
}

/// Both versions of an item whose content differs between the two sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncConflict {
    pub item_id: String,
    pub local_version: ManifestEntry,
    pub remote_version: ManifestEntry,
}

/// Output of a manifest comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncDifferences {
    /// Local entries the remote should receive.
    pub to_upload: Vec<ManifestEntry>,
    /// Remote entries to apply locally.
    pub to_download: Vec<ManifestEntry>,
    /// Every item whose hash differs on the two sides.
    pub conflicts: Vec<SyncConflict>,
}

impl SyncDifferences {
    /// True when nothing needs to move and nothing conflicts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_upload.is_empty() && self.to_download.is_empty() && self.conflicts.is_empty()
    }

    /// Number of transfers this diff calls for.
    #[must_use]
    pub fn transfer_count(&self) -> usize {
        self.to_upload.len() + self.to_download.len()
    }
}

/// Direction chosen for a conflicting item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Upload,
    Download,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => f.write_str("upload"),
            Self::Download => f.write_str("download"),
        }
    }
}

/// Orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Enumerating,
    Diffing,
    Resolving,
    Uploading,
    Downloading,
    Persisting,
    Failed,
}

impl SyncState {
    /// Nominal completion percentage on entering this state.
    #[must_use]
    pub const fn base_percent(&self) -> u8 {
        match self {
            Self::Idle | Self::Failed => 0,
            Self::Enumerating => 5,
            Self::Diffing => 20,
            Self::Resolving => 30,
            Self::Uploading => 40,
            Self::Downloading => 65,
            Self::Persisting => 90,
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Enumerating => "enumerating",
            Self::Diffing => "diffing",
            Self::Resolving => "resolving",
            Self::Uploading => "uploading",
            Self::Downloading => "downloading",
            Self::Persisting => "persisting",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Progress notification emitted on every state transition and per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncProgress {
    pub state: SyncState,
    pub message: String,
    /// 0..=100.
    pub progress: u8,
    pub current_item: Option<String>,
}

/// Terminal notification of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncCompletion {
    pub success: bool,
    pub message: String,
    pub items_synced: usize,
    pub uploaded: usize,
    pub downloaded: usize,
    pub conflicts: usize,
    pub errors: Vec<String>,
}

impl SyncCompletion {
    /// Build the completion record for a finished run.
    ///
    /// A run with errors only counts as failed when nothing synced at all.
    #[must_use]
    pub fn finished(uploaded: usize, downloaded: usize, conflicts: usize, errors: Vec<String>) -> Self {
        let items_synced = uploaded + downloaded;
        let success = errors.is_empty() || items_synced > 0;
        let message = if errors.is_empty() {
            format!("Synced {items_synced} item(s)")
        } else if success {
            format!(
                "Synced {items_synced} item(s) with {} error(s)",
                errors.len()
            )
        } else {
            format!("Sync failed with {} error(s)", errors.len())
        };
        Self {
            success,
            message,
            items_synced,
            uploaded,
            downloaded,
            conflicts,
            errors,
        }
    }

    /// Completion record for a run that could not proceed.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            errors: vec![message.clone()],
            message,
            ..Self::default()
        }
    }
}

/// Event stream element for UI and logging collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    Progress(SyncProgress),
    Completed(SyncCompletion),
}

/// Sync-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote store failed to serve or accept an item.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A payload could not be converted to the target type.
    #[error("Cannot convert value for {key}: {message}")]
    Conversion {
        /// Configuration key.
        key: String,
        /// What went wrong.
        message: String,
    },

    /// A payload's digest disagrees with its manifest entry.
    #[error("Content hash mismatch for {item_id}: expected {expected}, got {actual}")]
    HashMismatch {
        item_id: String,
        expected: String,
        actual: String,
    },

    /// A relative path escapes its root or is otherwise unusable.
    #[error("Invalid item path: {0}")]
    InvalidPath(String),

    /// Another run holds the manifest lock.
    #[error("Manifest is locked by another sync run: {0}")]
    Locked(String),

    /// The adapter does not know this item.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// The run was cancelled between items.
    #[error("Sync cancelled")]
    Cancelled,
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str) -> ManifestEntry {
        ManifestEntry::new(id, "General", EntryValue::Path(format!("{id}.png")), "abc")
    }

    #[test]
    fn test_manifest_insert_replaces_by_id() {
        let mut manifest = Manifest::new();
        assert!(manifest.insert(entry("a")).is_none());
        let mut updated = entry("a");
        updated.content_hash = "def".into();
        assert!(manifest.insert(updated).is_some());
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("a").unwrap().content_hash, "def");
    }

    #[test]
    fn test_manifest_iterates_in_id_order() {
        let manifest: Manifest = ["c", "a", "b"].into_iter().map(entry).collect();
        let ids: Vec<_> = manifest.iter().map(|e| e.item_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_manifest_json_is_keyed_by_id_with_pascal_case_fields() {
        let manifest: Manifest = std::iter::once(entry("Strips/a.png")).collect();
        let json = serde_json::to_value(&manifest).unwrap();
        let row = &json["Strips/a.png"];
        assert_eq!(row["ItemId"], "Strips/a.png");
        assert_eq!(row["ContentHash"], "abc");
        assert_eq!(row["IsSyncEnabled"], true);
        assert_eq!(row["Value"]["Path"], "Strips/a.png.png");
    }

    #[test]
    fn test_entry_defaults_when_optional_fields_missing() {
        let json = r#"{
            "ItemId": "Brightness",
            "Category": "Camera",
            "Value": {"Inline": {"Int": 5}},
            "ContentHash": "a1",
            "LastModified": "2025-01-20T10:00:00Z"
        }"#;
        let parsed: ManifestEntry = serde_json::from_str(json).unwrap();
        assert!(parsed.is_sync_enabled);
        assert_eq!(parsed.priority, 0);
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.value, EntryValue::Inline(SettingValue::Int(5)));
    }

    #[test]
    fn test_normalize_ids() {
        let mut manifest = Manifest::new();
        manifest.insert(entry("a"));
        manifest.get_mut("a").unwrap().item_id = "wrong".into();
        assert_eq!(manifest.normalize_ids(), 1);
        assert_eq!(manifest.get("a").unwrap().item_id, "a");
    }

    #[test]
    fn test_epoch_timestamp_is_invalid() {
        let stale = entry("a").with_last_modified(Utc.timestamp_opt(0, 0).unwrap());
        assert!(!stale.has_valid_timestamp());
        assert!(entry("b").has_valid_timestamp());
    }

    #[test]
    fn test_completion_partial_success() {
        let done = SyncCompletion::finished(2, 1, 0, vec!["boom".into()]);
        assert!(done.success);
        assert_eq!(done.items_synced, 3);

        let failed = SyncCompletion::finished(0, 0, 0, vec!["boom".into()]);
        assert!(!failed.success);

        let idle = SyncCompletion::finished(0, 0, 0, Vec::new());
        assert!(idle.success);
    }

    #[test]
    fn test_item_kind_parse() {
        assert_eq!("Templates".parse::<ItemKind>().unwrap(), ItemKind::Templates);
        assert_eq!("config".parse::<ItemKind>().unwrap(), ItemKind::Settings);
        assert!("other".parse::<ItemKind>().is_err());
    }
}
