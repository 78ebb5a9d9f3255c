//! Remote store abstraction.
//!
//! The sync core only decides which items move; fetching the remote manifest
//! and moving payloads is delegated to these traits. [`FolderRemote`] backs
//! them with a shared directory such as a network mount.
//!
//! # Folder layout
//!
//! ```text
//! <root>/<kind>/manifest.json      exported manifest document
//! <root>/<kind>/items/<item id>    payload bytes
//! ```
//!
//! Several kiosks may write the same folder. Manifest updates hold an
//! exclusive lock on `manifest.json.lock` for the whole read-modify-write.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::sync::file::{atomic_write, read_json, resolve_under, write_json_pretty};
use crate::sync::manifest::ManifestLock;
use crate::sync::types::{
    ExportedManifest, ItemKind, Manifest, ManifestEntry, SyncError, SyncResult,
};

/// Supplies the remote manifest snapshot for one sync run.
pub trait RemoteManifestProvider: Send + Sync {
    /// Fetch the current remote manifest for `kind`.
    fn get_remote_manifest(
        &self,
        kind: ItemKind,
    ) -> impl Future<Output = SyncResult<Manifest>> + Send;
}

/// Moves item payloads to and from the remote store.
pub trait ItemTransport: Send + Sync {
    /// Push a local item. The remote manifest must list `entry` afterwards.
    fn upload_item(
        &self,
        kind: ItemKind,
        entry: &ManifestEntry,
        payload: Vec<u8>,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    /// Fetch the payload of a remote item.
    fn download_item(
        &self,
        kind: ItemKind,
        entry: &ManifestEntry,
    ) -> impl Future<Output = SyncResult<Vec<u8>>> + Send;
}

/// Remote store kept in a plain directory.
#[derive(Debug)]
pub struct FolderRemote {
    root: PathBuf,
    device_id: Option<String>,
    manifest_guard: Mutex<()>,
}

impl FolderRemote {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            device_id: None,
            manifest_guard: Mutex::new(()),
        }
    }

    /// Tag manifests written by this remote with a device id.
    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the manifest document for `kind`.
    #[must_use]
    pub fn manifest_path(&self, kind: ItemKind) -> PathBuf {
        self.root.join(kind.as_str()).join("manifest.json")
    }

    fn payload_path(&self, kind: ItemKind, item_id: &str) -> SyncResult<PathBuf> {
        resolve_under(&self.root.join(kind.as_str()).join("items"), item_id)
    }

    fn read_document(&self, kind: ItemKind) -> SyncResult<ExportedManifest> {
        read_document(&self.manifest_path(kind))
    }
}

fn read_document(path: &Path) -> SyncResult<ExportedManifest> {
    let mut document = read_json::<ExportedManifest>(path)?.unwrap_or_default();
    document.entries.normalize_ids();
    Ok(document)
}

/// Insert `entry` into the manifest at `path` under the cross-process lock.
fn upsert_entry(path: &Path, entry: ManifestEntry, device_id: Option<String>) -> SyncResult<()> {
    let _lock = ManifestLock::wait(path)?;
    let mut document = read_document(path)?;
    document.entries.insert(entry);
    document.device_id = device_id;
    document.exported_at = Some(Utc::now());
    write_json_pretty(path, &document)
}

impl RemoteManifestProvider for FolderRemote {
    async fn get_remote_manifest(&self, kind: ItemKind) -> SyncResult<Manifest> {
        let document = self.read_document(kind)?;
        debug!(
            %kind,
            entries = document.entries.len(),
            writer = document.device_id.as_deref().unwrap_or("unknown"),
            "Read remote manifest"
        );
        Ok(document.entries)
    }
}

impl ItemTransport for FolderRemote {
    async fn upload_item(
        &self,
        kind: ItemKind,
        entry: &ManifestEntry,
        payload: Vec<u8>,
    ) -> SyncResult<()> {
        let path = self.payload_path(kind, &entry.item_id)?;
        atomic_write(&path, &payload)?;

        let _guard = self.manifest_guard.lock().await;
        let manifest_path = self.manifest_path(kind);
        let recorded = entry.clone();
        let device_id = self.device_id.clone();
        tokio::task::spawn_blocking(move || upsert_entry(&manifest_path, recorded, device_id))
            .await
            .map_err(|e| SyncError::Transport(format!("manifest update for {} failed: {e}", entry.item_id)))??;

        debug!(%kind, item = %entry.item_id, bytes = payload.len(), "Uploaded item");
        Ok(())
    }

    async fn download_item(&self, kind: ItemKind, entry: &ManifestEntry) -> SyncResult<Vec<u8>> {
        let path = self.payload_path(kind, &entry.item_id)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SyncError::Transport(format!(
                "payload missing for {}",
                entry.item_id
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
