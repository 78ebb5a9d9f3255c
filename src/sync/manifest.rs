//! Local manifest persistence.
//!
//! The manifest is a pretty-printed JSON object mapping item id to entry,
//! read and written wholesale. Loading never fails: a missing or corrupt
//! document degrades to an empty manifest with a warning. Saving is atomic
//! and the in-memory copy only changes once the write has succeeded.
//!
//! A sync run holds a [`ManifestLock`] for its whole duration so that two
//! runs never interleave writes to the same document.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use tracing::{debug, warn};

use crate::sync::file::{read_json, write_json_pretty};
use crate::sync::types::{ExportedManifest, Manifest, ManifestEntry, SyncError, SyncResult};

/// Durable store for one local manifest document.
#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    manifest: Manifest,
}

impl ManifestStore {
    /// Open the store at `path`, loading whatever is on disk.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            manifest: Manifest::new(),
        };
        store.load();
        store
    }

    /// Path of the manifest document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload the manifest from disk.
    ///
    /// An absent or unparseable document yields an empty manifest.
    pub fn load(&mut self) -> &Manifest {
        self.manifest = match read_json::<Manifest>(&self.path) {
            Ok(Some(mut manifest)) => {
                let fixed = manifest.normalize_ids();
                if fixed > 0 {
                    warn!(
                        path = %self.path.display(),
                        fixed,
                        "Manifest entries disagreed with their keys; keys win"
                    );
                }
                debug!(path = %self.path.display(), entries = manifest.len(), "Loaded manifest");
                manifest
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No manifest on disk; starting empty");
                Manifest::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable manifest; starting empty");
                Manifest::new()
            }
        };
        &self.manifest
    }

    /// Current in-memory manifest.
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    #[must_use]
    pub fn get(&self, item_id: &str) -> Option<&ManifestEntry> {
        self.manifest.get(item_id)
    }

    /// Insert or replace an entry in memory.
    pub fn put(&mut self, entry: ManifestEntry) {
        self.manifest.insert(entry);
    }

    /// Remove an entry from memory.
    pub fn remove(&mut self, item_id: &str) -> Option<ManifestEntry> {
        self.manifest.remove(item_id)
    }

    /// Write the in-memory manifest to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written; the previous
    /// on-disk version is left in place.
    pub fn save(&self) -> SyncResult<()> {
        write_json_pretty(&self.path, &self.manifest)?;
        debug!(path = %self.path.display(), entries = self.manifest.len(), "Saved manifest");
        Ok(())
    }

    /// Persist `manifest` and adopt it as the in-memory copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails, in which case memory is unchanged.
    pub fn replace(&mut self, manifest: Manifest) -> SyncResult<()> {
        write_json_pretty(&self.path, &manifest)?;
        self.manifest = manifest;
        Ok(())
    }

    /// Adopt `manifest` in memory without writing it.
    pub fn stage(&mut self, manifest: Manifest) {
        self.manifest = manifest;
    }

    /// Export the manifest tagged with the writing device.
    ///
    /// # Errors
    ///
    /// Returns an error if the export document cannot be written.
    pub fn export(&self, device_id: &str, destination: &Path) -> SyncResult<ExportedManifest> {
        let exported = ExportedManifest {
            device_id: Some(device_id.to_string()),
            exported_at: Some(Utc::now()),
            entries: self.manifest.clone(),
        };
        write_json_pretty(destination, &exported)?;
        Ok(exported)
    }

    /// Take the single-writer lock for this manifest without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Locked`] if another run holds the lock.
    pub fn lock(&self) -> SyncResult<ManifestLock> {
        ManifestLock::acquire(&self.path)
    }
}

/// Exclusive advisory lock on `<manifest>.lock`, released on drop.
#[derive(Debug)]
pub struct ManifestLock {
    file: File,
    path: PathBuf,
}

impl ManifestLock {
    fn acquire(manifest_path: &Path) -> SyncResult<Self> {
        let (file, path) = Self::open_lock_file(manifest_path)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                return Err(SyncError::Locked(manifest_path.display().to_string()));
            }
            return Err(e.into());
        }

        debug!(path = %path.display(), "Acquired manifest lock");
        Ok(Self { file, path })
    }

    /// Block until the lock on `manifest_path` is free, then take it.
    ///
    /// Used for short read-modify-write sections on documents shared between
    /// machines, where waiting is preferable to failing.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or locked.
    pub fn wait(manifest_path: &Path) -> SyncResult<Self> {
        let (file, path) = Self::open_lock_file(manifest_path)?;
        file.lock_exclusive()?;
        debug!(path = %path.display(), "Acquired manifest lock after waiting");
        Ok(Self { file, path })
    }

    fn open_lock_file(manifest_path: &Path) -> SyncResult<(File, PathBuf)> {
        let mut name = manifest_path
            .file_name()
            .map(ToOwned::to_owned)
            .unwrap_or_default();
        name.push(".lock");
        let path = manifest_path.with_file_name(name);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok((file, path))
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ManifestLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to release manifest lock");
        }
    }
}
