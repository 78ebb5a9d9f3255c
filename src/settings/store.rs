//! Live configuration store.
//!
//! The kiosk's configuration is a flat JSON object of plain scalars
//! (`{"Brightness": 3, "PrintLayout": "Strip"}`). Keys outside the
//! syncable allow-list are preserved untouched.
//!
//! Write times are kept per key in a `<name>.modified.json` sidecar. A key
//! that was never written carries [`unwritten_timestamp`], which every real
//! write beats under last-writer-wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::settings::catalog::SettingDescriptor;
use crate::sync::file::{read_json, write_json_pretty};
use crate::sync::{SettingValue, SyncError, SyncResult};

/// 2000-01-01T00:00:00Z.
const UNWRITTEN_SECS: i64 = 946_684_800;

/// Modification time of a value nobody has written on this booth.
#[must_use]
pub fn unwritten_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(UNWRITTEN_SECS, 0).unwrap_or_default()
}

/// File-backed configuration values.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    values: Map<String, Value>,
    written: BTreeMap<String, DateTime<Utc>>,
    file_modified: Option<DateTime<Utc>>,
}

impl SettingsStore {
    /// Open the store; a missing file is an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is not a JSON object.
    pub fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        let values = match read_json::<Value>(&path)? {
            None => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(SyncError::Conversion {
                    key: path.display().to_string(),
                    message: "settings document is not a JSON object".to_string(),
                });
            }
        };
        let written = read_json(&written_path(&path))?.unwrap_or_default();
        let file_modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        Ok(Self {
            path,
            values,
            written,
            file_modified,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When `key` was last written on this booth.
    ///
    /// Keys set through [`Self::set_and_save`] report that write. Keys that
    /// are in the document without a recorded write report the document's
    /// modification time. Keys that only have a default report
    /// [`unwritten_timestamp`].
    #[must_use]
    pub fn modified_at(&self, key: &str) -> DateTime<Utc> {
        if let Some(at) = self.written.get(key) {
            return *at;
        }
        self.file_modified
            .filter(|_| self.values.contains_key(key))
            .unwrap_or_else(unwritten_timestamp)
    }

    /// Raw stored JSON for a key.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Current typed value of a syncable key.
    ///
    /// Absent keys fall back to the descriptor default. `Ok(None)` means the
    /// key is nullable and unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value cannot be read as the key's type.
    pub fn read(&self, descriptor: &SettingDescriptor) -> SyncResult<Option<SettingValue>> {
        match self.values.get(descriptor.key) {
            None => descriptor.default_value(),
            Some(Value::Null) if descriptor.nullable => Ok(None),
            Some(raw) => {
                let value = SettingValue::from_json(raw).ok_or_else(|| SyncError::Conversion {
                    key: descriptor.key.to_string(),
                    message: format!("unsupported stored value {raw}"),
                })?;
                descriptor.kind.convert(descriptor.key, value).map(Some)
            }
        }
    }

    /// Set a value, record when, and persist both.
    ///
    /// The in-memory state only changes if the writes succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document or its write times cannot be written.
    pub fn set_and_save(&mut self, key: &str, value: &SettingValue) -> SyncResult<()> {
        let mut updated = self.values.clone();
        updated.insert(key.to_string(), value.to_json());
        let mut written = self.written.clone();
        written.insert(key.to_string(), Utc::now());

        write_json_pretty(&self.path, &updated)?;
        write_json_pretty(&written_path(&self.path), &written)?;
        self.values = updated;
        self.written = written;
        Ok(())
    }

    /// Number of stored keys, syncable or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn written_path(path: &Path) -> PathBuf {
    path.with_extension("modified.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::catalog::find_descriptor;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = SettingsStore::open(temp_dir.path().join("settings.json")).unwrap();
        let countdown = find_descriptor("CountdownSeconds").unwrap();
        assert_eq!(store.read(countdown).unwrap(), Some(SettingValue::Int(5)));
    }

    #[test]
    fn test_write_times() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{"Brightness": 2}"#).unwrap();
        let mut store = SettingsStore::open(&path).unwrap();

        assert_eq!(store.modified_at("CountdownSeconds"), unwritten_timestamp());
        let hand_edited = store.modified_at("Brightness");
        assert!(hand_edited > unwritten_timestamp());

        let before = Utc::now();
        store.set_and_save("PrintCopies", &SettingValue::Int(2)).unwrap();
        assert!(store.modified_at("PrintCopies") >= before);
        assert!(temp_dir.path().join("settings.modified.json").exists());

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.modified_at("PrintCopies"), store.modified_at("PrintCopies"));
        assert_eq!(reopened.modified_at("CountdownSeconds"), unwritten_timestamp());
        assert!(unwritten_timestamp().timestamp() > 0);
    }

    #[test]
    fn test_non_object_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(SettingsStore::open(&path).is_err());
    }

    #[test]
    fn test_set_and_save_preserves_foreign_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{"LocalCameraSerial": "X123", "Brightness": 1}"#).unwrap();

        let mut store = SettingsStore::open(&path).unwrap();
        store.set_and_save("Brightness", &SettingValue::Int(4)).unwrap();

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.raw("LocalCameraSerial").unwrap(), "X123");
        assert_eq!(reopened.raw("Brightness").unwrap(), 4);
    }

    #[test]
    fn test_enum_stored_as_plain_string() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        let mut store = SettingsStore::open(&path).unwrap();
        store
            .set_and_save("PrintLayout", &SettingValue::Enum("Both".into()))
            .unwrap();

        let layout = find_descriptor("PrintLayout").unwrap();
        assert_eq!(
            store.read(layout).unwrap(),
            Some(SettingValue::Enum("Both".into()))
        );
        assert_eq!(store.raw("PrintLayout").unwrap(), "Both");
    }

    #[test]
    fn test_unreadable_value_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{"PrintCopies": "lots", "PrinterName": null}"#).unwrap();
        let store = SettingsStore::open(&path).unwrap();

        assert!(store.read(find_descriptor("PrintCopies").unwrap()).is_err());
        assert_eq!(store.read(find_descriptor("PrinterName").unwrap()).unwrap(), None);
    }
}
