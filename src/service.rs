//! Wiring between configuration, item kinds and the sync core.
//!
//! [`BoothSync`] is built once per command from the home directory. It hands
//! out the adapter, manifest store and remote for each item kind, so every
//! command drives the same orchestrator the same way.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::{BoothHome, SyncConfig, load_or_create_device_id, resolve_home};
use crate::error::{Error, Result};
use crate::settings::{SettingsAdapter, SettingsStore};
use crate::sync::{
    EntryEnumerator, ExportedManifest, FolderRemote, ItemApplier, ItemKind, Manifest,
    ManifestEntry, ManifestStore, ProgressSink, SyncCompletion, SyncOrchestrator, SyncPlan,
    reconcile_snapshot,
};
use crate::templates::TemplateAdapter;

/// One initialized installation.
#[derive(Debug)]
pub struct BoothSync {
    home: BoothHome,
    config: SyncConfig,
    device_id: String,
    remote_dir: Option<PathBuf>,
}

impl BoothSync {
    /// Open the installation at the resolved home directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if `init` was never run there, or a
    /// configuration error if its files cannot be read.
    pub fn open(home: Option<&Path>, remote: Option<&Path>) -> Result<Self> {
        let home = resolve_home(home)?;
        let config = home.load_config()?;
        let device_id = load_or_create_device_id(&home)?;
        let remote_dir = config.remote_dir(remote);
        Ok(Self {
            home,
            config,
            device_id,
            remote_dir,
        })
    }

    #[must_use]
    pub fn home(&self) -> &BoothHome {
        &self.home
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn remote_dir(&self) -> Option<&Path> {
        self.remote_dir.as_deref()
    }

    /// Remote store for this installation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRemote`] when no remote directory is configured.
    pub fn remote(&self) -> Result<Arc<FolderRemote>> {
        let dir = self.remote_dir.as_ref().ok_or(Error::NoRemote)?;
        Ok(Arc::new(
            FolderRemote::new(dir).with_device_id(self.device_id.clone()),
        ))
    }

    /// Live configuration store.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings document is unreadable.
    pub fn settings_store(&self) -> Result<SettingsStore> {
        Ok(SettingsStore::open(self.config.settings_path(&self.home))?)
    }

    /// Adapter for the configuration item kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings document is unreadable.
    pub fn settings_adapter(&self) -> Result<SettingsAdapter> {
        Ok(SettingsAdapter::new(self.settings_store()?))
    }

    /// Adapter for the template item kind.
    #[must_use]
    pub fn template_adapter(&self) -> TemplateAdapter {
        TemplateAdapter::with_extensions(
            self.config.template_dir(&self.home),
            self.config.template_extensions.iter().cloned(),
        )
    }

    /// Local manifest store for `kind`, loaded from disk.
    #[must_use]
    pub fn manifest_store(&self, kind: ItemKind) -> ManifestStore {
        ManifestStore::open(self.home.manifest_path(kind))
    }

    fn orchestrator<A>(&self, adapter: A, kind: ItemKind) -> Result<SyncOrchestrator<A, FolderRemote>>
    where
        A: EntryEnumerator + ItemApplier,
    {
        Ok(SyncOrchestrator::new(adapter, self.manifest_store(kind), self.remote()?)
            .with_resolver(self.config.resolver())
            .with_max_concurrency(self.config.max_concurrency()))
    }

    /// Run a full sync of one item kind.
    ///
    /// # Errors
    ///
    /// Returns an error only if the run cannot be set up; failures during the
    /// run are reported in the returned completion.
    pub async fn sync(
        &self,
        kind: ItemKind,
        sink: impl ProgressSink + 'static,
    ) -> Result<SyncCompletion> {
        info!(%kind, remote = ?self.remote_dir, "Starting sync");
        let completion = match kind {
            ItemKind::Settings => {
                self.orchestrator(self.settings_adapter()?, kind)?
                    .with_sink(sink)
                    .run()
                    .await
            }
            ItemKind::Templates => {
                self.orchestrator(self.template_adapter(), kind)?
                    .with_sink(sink)
                    .run()
                    .await
            }
        };
        Ok(completion)
    }

    /// What the next sync of `kind` would do.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote manifest cannot be read.
    pub async fn plan(&self, kind: ItemKind) -> Result<SyncPlan> {
        let diff = match kind {
            ItemKind::Settings => self.orchestrator(self.settings_adapter()?, kind)?.plan().await?,
            ItemKind::Templates => self.orchestrator(self.template_adapter(), kind)?.plan().await?,
        };
        Ok(SyncPlan::new(kind, &diff, &self.config.resolver()))
    }

    fn scan(&self, kind: ItemKind) -> Result<Vec<ManifestEntry>> {
        Ok(match kind {
            ItemKind::Settings => self.settings_adapter()?.enumerate()?,
            ItemKind::Templates => self.template_adapter().enumerate()?,
        })
    }

    /// Rescan local items and rewrite the manifest without syncing.
    ///
    /// # Errors
    ///
    /// Returns an error if the local items cannot be scanned or the manifest
    /// is locked or cannot be written.
    pub fn rebuild_manifest(&self, kind: ItemKind) -> Result<Manifest> {
        let scanned = self.scan(kind)?;
        let mut store = self.manifest_store(kind);
        let _lock = store.lock()?;
        let stored = store.load().clone();
        let rebuilt = reconcile_snapshot(&stored, scanned);
        store.replace(rebuilt.clone())?;
        info!(%kind, entries = rebuilt.len(), "Rebuilt manifest");
        Ok(rebuilt)
    }

    /// Turn syncing of one item on or off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemNotFound`] if the manifest has no such entry.
    pub fn set_sync_enabled(&self, kind: ItemKind, item_id: &str, enabled: bool) -> Result<ManifestEntry> {
        let mut store = self.manifest_store(kind);
        let _lock = store.lock()?;
        store.load();

        let mut entry = store.get(item_id).cloned().ok_or_else(|| Error::ItemNotFound {
            kind: kind.to_string(),
            id: item_id.to_string(),
        })?;
        entry.is_sync_enabled = enabled;
        store.put(entry.clone());
        store.save()?;
        Ok(entry)
    }

    /// Write the local manifest of `kind` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if the export cannot be written.
    pub fn export_manifest(&self, kind: ItemKind, destination: &Path) -> Result<ExportedManifest> {
        Ok(self.manifest_store(kind).export(&self.device_id, destination)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::find_descriptor;
    use crate::sync::{EntryValue, LogSink, RemoteManifestProvider, SettingValue};
    use std::fs;
    use tempfile::TempDir;

    fn booth(home: &Path, remote: &Path) -> BoothSync {
        SyncConfig::default()
            .save(&BoothHome::new(home).config_path())
            .unwrap();
        BoothSync::open(Some(home), Some(remote)).unwrap()
    }

    #[test]
    fn test_open_requires_init() {
        let temp_dir = TempDir::new().unwrap();
        let result = BoothSync::open(Some(temp_dir.path()), None);
        assert!(matches!(result, Err(Error::NotInitialized)));
    }

    #[test]
    fn test_remote_required_for_sync() {
        let temp_dir = TempDir::new().unwrap();
        let home = BoothHome::new(temp_dir.path());
        let service = BoothSync {
            config: SyncConfig::default(),
            device_id: "kiosk".to_string(),
            remote_dir: None,
            home,
        };
        assert!(matches!(service.remote(), Err(Error::NoRemote)));
    }

    #[tokio::test]
    async fn test_two_booths_converge_on_templates() {
        let remote = TempDir::new().unwrap();
        let home_a = TempDir::new().unwrap();
        let home_b = TempDir::new().unwrap();
        let a = booth(home_a.path(), remote.path());
        let b = booth(home_b.path(), remote.path());

        let templates_a = home_a.path().join("templates/Strips");
        fs::create_dir_all(&templates_a).unwrap();
        fs::write(templates_a.join("classic.png"), b"strip bytes").unwrap();

        let pushed = a.sync(ItemKind::Templates, LogSink).await.unwrap();
        assert!(pushed.success);
        assert_eq!(pushed.uploaded, 1);

        let pulled = b.sync(ItemKind::Templates, LogSink).await.unwrap();
        assert_eq!(pulled.downloaded, 1);
        assert_eq!(
            fs::read(home_b.path().join("templates/Strips/classic.png")).unwrap(),
            b"strip bytes"
        );

        let plan = b.plan(ItemKind::Templates).await.unwrap();
        assert!(plan.is_in_sync());
    }

    #[tokio::test]
    async fn test_settings_flow_between_booths() {
        let remote = TempDir::new().unwrap();
        let home_a = TempDir::new().unwrap();
        let home_b = TempDir::new().unwrap();
        fs::write(home_a.path().join("settings.json"), r#"{"PrintCopies": 3}"#).unwrap();
        let a = booth(home_a.path(), remote.path());
        let b = booth(home_b.path(), remote.path());

        let pushed = a.sync(ItemKind::Settings, LogSink).await.unwrap();
        assert!(pushed.success, "{pushed:?}");

        // b was never configured, so its defaults lose to a's values.
        let pulled = b.sync(ItemKind::Settings, LogSink).await.unwrap();
        assert!(pulled.success, "{pulled:?}");
        assert_eq!(pulled.uploaded, 0);
        assert_eq!(pulled.downloaded, 1);

        let copies = find_descriptor("PrintCopies").unwrap();
        let store_b = b.settings_store().unwrap();
        assert_eq!(store_b.read(copies).unwrap(), Some(SettingValue::Int(3)));
        assert!(b.plan(ItemKind::Settings).await.unwrap().is_in_sync());

        let remote_copies = FolderRemote::new(remote.path())
            .get_remote_manifest(ItemKind::Settings)
            .await
            .unwrap();
        assert_eq!(
            remote_copies.get("PrintCopies").unwrap().value,
            EntryValue::Inline(SettingValue::Int(3))
        );
    }

    #[tokio::test]
    async fn test_local_edit_after_pull_travels_back() {
        let remote = TempDir::new().unwrap();
        let home_a = TempDir::new().unwrap();
        let home_b = TempDir::new().unwrap();
        fs::write(home_a.path().join("settings.json"), r#"{"Brightness": 3}"#).unwrap();
        let a = booth(home_a.path(), remote.path());
        let b = booth(home_b.path(), remote.path());
        a.sync(ItemKind::Settings, LogSink).await.unwrap();
        b.sync(ItemKind::Settings, LogSink).await.unwrap();

        b.settings_store()
            .unwrap()
            .set_and_save("Brightness", &SettingValue::Int(-1))
            .unwrap();
        let pushed = b.sync(ItemKind::Settings, LogSink).await.unwrap();
        assert_eq!(pushed.uploaded, 1);

        let pulled = a.sync(ItemKind::Settings, LogSink).await.unwrap();
        assert_eq!(pulled.downloaded, 1);
        let brightness = find_descriptor("Brightness").unwrap();
        assert_eq!(
            a.settings_store().unwrap().read(brightness).unwrap(),
            Some(SettingValue::Int(-1))
        );
    }

    #[test]
    fn test_rebuild_and_toggle() {
        let temp_dir = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        let service = booth(temp_dir.path(), remote.path());
        fs::create_dir_all(temp_dir.path().join("templates")).unwrap();
        fs::write(temp_dir.path().join("templates/logo.png"), b"logo").unwrap();

        let rebuilt = service.rebuild_manifest(ItemKind::Templates).unwrap();
        assert!(rebuilt.contains("logo.png"));

        let entry = service
            .set_sync_enabled(ItemKind::Templates, "logo.png", false)
            .unwrap();
        assert!(!entry.is_sync_enabled);

        // A rebuild keeps the flag.
        let rebuilt = service.rebuild_manifest(ItemKind::Templates).unwrap();
        assert!(!rebuilt.get("logo.png").unwrap().is_sync_enabled);

        let missing = service.set_sync_enabled(ItemKind::Templates, "nope.png", true);
        assert!(matches!(missing, Err(Error::ItemNotFound { .. })));
    }

    #[test]
    fn test_export_tags_device() {
        let temp_dir = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        let service = booth(temp_dir.path(), remote.path());
        service.rebuild_manifest(ItemKind::Settings).unwrap();

        let out = temp_dir.path().join("out/settings-export.json");
        let exported = service.export_manifest(ItemKind::Settings, &out).unwrap();

        assert_eq!(exported.device_id.as_deref(), Some(service.device_id()));
        assert!(out.exists());
        assert!(!exported.entries.is_empty());
    }
}
