//! Sync run sequencing.
//!
//! One run walks `Enumerating → Diffing → Resolving → Uploading →
//! Downloading → Persisting → Idle`. Per-item failures are collected into
//! the completion event; only a manifest-level failure (lock held, remote
//! manifest unreadable, local manifest unwritable) ends in `Failed`.
//!
//! Transfers run on a [`JoinSet`] bounded by a [`Semaphore`]. Downloads are
//! applied one at a time as they finish, so the manifest has a single writer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::sync::adapter::{EntryEnumerator, ItemApplier};
use crate::sync::apply::ApplyEngine;
use crate::sync::diff::compare_with;
use crate::sync::hash::has_changed;
use crate::sync::manifest::ManifestStore;
use crate::sync::resolve::ConflictResolver;
use crate::sync::transport::{ItemTransport, RemoteManifestProvider};
use crate::sync::types::{
    Manifest, ManifestEntry, SyncCompletion, SyncDifferences, SyncError, SyncEvent,
    SyncProgress, SyncResult, SyncState,
};

/// Default number of concurrent transfers.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Cooperative cancellation, checked between items.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Receives progress and completion notifications.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, progress: &SyncProgress);
    fn completed(&self, completion: &SyncCompletion);
}

/// Sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn progress(&self, progress: &SyncProgress) {
        debug!(
            state = %progress.state,
            percent = progress.progress,
            item = progress.current_item.as_deref().unwrap_or(""),
            "{}",
            progress.message
        );
    }

    fn completed(&self, completion: &SyncCompletion) {
        if completion.success {
            info!(synced = completion.items_synced, "{}", completion.message);
        } else {
            warn!(errors = completion.errors.len(), "{}", completion.message);
        }
    }
}

impl ProgressSink for mpsc::UnboundedSender<SyncEvent> {
    fn progress(&self, progress: &SyncProgress) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.send(SyncEvent::Progress(progress.clone()));
    }

    fn completed(&self, completion: &SyncCompletion) {
        let _ = self.send(SyncEvent::Completed(completion.clone()));
    }
}

/// Merge a fresh scan with the stored manifest.
///
/// An item whose hash is unchanged keeps its stored timestamp, and every
/// item keeps its stored sync flag. Items missing from the scan drop out.
#[must_use]
pub fn reconcile_snapshot(stored: &Manifest, scanned: Vec<ManifestEntry>) -> Manifest {
    scanned
        .into_iter()
        .map(|mut entry| {
            if let Some(previous) = stored.get(&entry.item_id) {
                entry.is_sync_enabled = previous.is_sync_enabled;
                if !has_changed(&entry.content_hash, Some(&previous.content_hash)) {
                    entry.last_modified = previous.last_modified;
                }
            }
            entry
        })
        .collect()
}

/// Drives one item kind through a sync run.
pub struct SyncOrchestrator<A, R> {
    adapter: A,
    store: ManifestStore,
    remote: Arc<R>,
    resolver: ConflictResolver,
    max_concurrency: usize,
    sink: Box<dyn ProgressSink>,
    cancel: CancelFlag,
    state: SyncState,
}

impl<A, R> SyncOrchestrator<A, R>
where
    A: EntryEnumerator + ItemApplier,
    R: RemoteManifestProvider + ItemTransport + 'static,
{
    #[must_use]
    pub fn new(adapter: A, store: ManifestStore, remote: Arc<R>) -> Self {
        Self {
            adapter,
            store,
            remote,
            resolver: ConflictResolver::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            sink: Box::new(LogSink),
            cancel: CancelFlag::new(),
            state: SyncState::Idle,
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: ConflictResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Bound concurrent transfers; values below one are treated as one.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that cancels this orchestrator's runs.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    #[must_use]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    #[must_use]
    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Scan and diff without transferring or saving anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the local scan fails or the remote manifest cannot
    /// be fetched.
    pub async fn plan(&mut self) -> SyncResult<SyncDifferences> {
        let stored = self.store.load().clone();
        let local = reconcile_snapshot(&stored, self.adapter.enumerate()?);
        let remote = self.remote.get_remote_manifest(self.adapter.kind()).await?;
        let (remote, _) = Self::screen_remote(remote);
        Ok(compare_with(&local, &remote, &self.resolver))
    }

    /// Run a full sync and report how it went.
    ///
    /// Never returns an error: fatal problems leave the orchestrator in
    /// [`SyncState::Failed`] and yield an unsuccessful completion.
    pub async fn run(&mut self) -> SyncCompletion {
        let completion = match self.try_run().await {
            Ok(completion) => {
                self.state = SyncState::Idle;
                completion
            }
            Err(e) => {
                error!(kind = %self.adapter.kind(), error = %e, "Sync run failed");
                self.state = SyncState::Failed;
                self.emit(format!("Sync failed: {e}"), 0, None);
                SyncCompletion::failed(e.to_string())
            }
        };
        self.sink.completed(&completion);
        completion
    }

    async fn try_run(&mut self) -> SyncResult<SyncCompletion> {
        let kind = self.adapter.kind();
        let _lock = self.store.lock()?;
        let mut errors = Vec::new();

        self.transition(SyncState::Enumerating, format!("Scanning local {kind}"));
        let stored = self.store.load().clone();
        let snapshot = reconcile_snapshot(&stored, self.adapter.enumerate()?);
        info!(%kind, items = snapshot.len(), "Local snapshot ready");
        self.store.stage(snapshot);

        self.transition(SyncState::Diffing, "Fetching remote manifest".to_string());
        let remote = self.remote.get_remote_manifest(kind).await?;
        let (remote, rejected) = Self::screen_remote(remote);
        errors.extend(rejected);
        let diff = compare_with(self.store.manifest(), &remote, &self.resolver);
        info!(
            %kind,
            upload = diff.to_upload.len(),
            download = diff.to_download.len(),
            conflicts = diff.conflicts.len(),
            "Diff computed"
        );

        self.transition(
            SyncState::Resolving,
            format!("Resolving {} conflict(s)", diff.conflicts.len()),
        );
        for conflict in &diff.conflicts {
            let action = self.resolver.resolve(conflict);
            info!(
                item = %conflict.item_id,
                %action,
                local = %conflict.local_version.last_modified,
                remote = %conflict.remote_version.last_modified,
                "Conflict resolved"
            );
            self.emit(
                format!("Conflict on {}: {action}", conflict.item_id),
                SyncState::Resolving.base_percent(),
                Some(conflict.item_id.clone()),
            );
        }

        self.transition(
            SyncState::Uploading,
            format!("Uploading {} item(s)", diff.to_upload.len()),
        );
        let uploaded = self.upload_all(&diff.to_upload, &mut errors).await;

        self.transition(
            SyncState::Downloading,
            format!("Downloading {} item(s)", diff.to_download.len()),
        );
        let downloaded = self.download_all(&diff.to_download, &mut errors).await;

        if self.cancel.is_cancelled() {
            warn!(%kind, "Sync cancelled; keeping items applied so far");
            errors.push(SyncError::Cancelled.to_string());
        }

        self.transition(SyncState::Persisting, "Saving manifest".to_string());
        self.store.save()?;

        Ok(SyncCompletion::finished(
            uploaded,
            downloaded,
            diff.conflicts.len(),
            errors,
        ))
    }

    /// Drop remote entries without a usable timestamp.
    fn screen_remote(remote: Manifest) -> (Manifest, Vec<String>) {
        let mut rejected = Vec::new();
        let accepted = remote
            .into_iter()
            .filter(|entry| {
                if entry.has_valid_timestamp() {
                    true
                } else {
                    warn!(item = %entry.item_id, "Remote entry has no modification time");
                    rejected.push(format!("{}: remote entry has no modification time", entry.item_id));
                    false
                }
            })
            .collect();
        (accepted, rejected)
    }

    async fn upload_all(&mut self, entries: &[ManifestEntry], errors: &mut Vec<String>) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let kind = self.adapter.kind();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for entry in entries {
            if self.cancel.is_cancelled() {
                break;
            }
            let payload = match self.adapter.read_payload(entry) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(item = %entry.item_id, error = %e, "Cannot read payload");
                    errors.push(format!("{}: {e}", entry.item_id));
                    continue;
                }
            };
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let remote = Arc::clone(&self.remote);
            let entry = entry.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = remote.upload_item(kind, &entry, payload).await;
                (entry.item_id, result)
            });
        }

        let total = entries.len();
        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((item_id, Ok(()))) => {
                    done += 1;
                    let percent = step_percent(SyncState::Uploading, done, total);
                    self.emit(format!("Uploaded {item_id}"), percent, Some(item_id));
                }
                Ok((item_id, Err(e))) => {
                    warn!(item = %item_id, error = %e, "Upload failed");
                    errors.push(format!("{item_id}: {e}"));
                }
                Err(e) => errors.push(format!("upload task failed: {e}")),
            }
        }
        done
    }

    async fn download_all(
        &mut self,
        entries: &[ManifestEntry],
        errors: &mut Vec<String>,
    ) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let kind = self.adapter.kind();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for entry in entries {
            if self.cancel.is_cancelled() {
                break;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let remote = Arc::clone(&self.remote);
            let entry = entry.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = remote.download_item(kind, &entry).await;
                (entry, result)
            });
        }

        let total = entries.len();
        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            let (entry, payload) = match joined {
                Ok((entry, Ok(payload))) => (entry, payload),
                Ok((entry, Err(e))) => {
                    warn!(item = %entry.item_id, error = %e, "Download failed");
                    errors.push(format!("{}: {e}", entry.item_id));
                    continue;
                }
                Err(e) => {
                    errors.push(format!("download task failed: {e}"));
                    continue;
                }
            };

            if self.cancel.is_cancelled() {
                tasks.abort_all();
                break;
            }

            let applied =
                ApplyEngine::new(&mut self.adapter, &mut self.store).apply(&entry, &payload);
            match applied {
                Ok(()) => {
                    done += 1;
                    let percent = step_percent(SyncState::Downloading, done, total);
                    self.emit(
                        format!("Applied {}", entry.item_id),
                        percent,
                        Some(entry.item_id),
                    );
                }
                Err(e) => {
                    warn!(item = %entry.item_id, error = %e, "Apply failed");
                    errors.push(format!("{}: {e}", entry.item_id));
                }
            }
        }
        done
    }

    fn transition(&mut self, state: SyncState, message: String) {
        debug!(from = %self.state, to = %state, "State transition");
        self.state = state;
        self.emit(message, state.base_percent(), None);
    }

    fn emit(&self, message: String, progress: u8, current_item: Option<String>) {
        self.sink.progress(&SyncProgress {
            state: self.state,
            message,
            progress,
            current_item,
        });
    }
}

/// Percentage inside a transfer state, between its base and the next one.
fn step_percent(state: SyncState, done: usize, total: usize) -> u8 {
    let (start, end) = match state {
        SyncState::Uploading => (SyncState::Uploading, SyncState::Downloading),
        SyncState::Downloading => (SyncState::Downloading, SyncState::Persisting),
        other => return other.base_percent(),
    };
    let start = usize::from(start.base_percent());
    let span = usize::from(end.base_percent()) - start;
    let within = if total == 0 { span } else { span * done.min(total) / total };
    u8::try_from(start + within).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::hash::hash_bytes;
    use crate::sync::resolve::{ConflictPolicy, TieBreak};
    use crate::sync::transport::FolderRemote;
    use crate::sync::types::{EntryValue, ItemKind, SyncError};
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::future::Future;
    use tempfile::TempDir;

    /// In-memory item kind keyed by id.
    #[derive(Default)]
    struct MemoryAdapter {
        items: BTreeMap<String, Vec<u8>>,
        reject: Option<String>,
        offline: bool,
    }

    impl MemoryAdapter {
        fn with(items: &[(&str, &str)]) -> Self {
            Self {
                items: items
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.as_bytes().to_vec()))
                    .collect(),
                ..Self::default()
            }
        }
    }

    impl EntryEnumerator for MemoryAdapter {
        fn kind(&self) -> ItemKind {
            ItemKind::Templates
        }

        fn enumerate(&self) -> SyncResult<Vec<ManifestEntry>> {
            if self.offline {
                return Err(std::io::Error::other("store offline").into());
            }
            Ok(self
                .items
                .iter()
                .map(|(id, bytes)| {
                    ManifestEntry::new(id, "General", EntryValue::Path(id.clone()), hash_bytes(bytes))
                })
                .collect())
        }

        fn read_payload(&self, entry: &ManifestEntry) -> SyncResult<Vec<u8>> {
            self.items
                .get(&entry.item_id)
                .cloned()
                .ok_or_else(|| SyncError::UnknownItem(entry.item_id.clone()))
        }
    }

    impl ItemApplier for MemoryAdapter {
        fn write_item(&mut self, entry: &ManifestEntry, payload: &[u8]) -> SyncResult<()> {
            if self.reject.as_deref() == Some(entry.item_id.as_str()) {
                return Err(SyncError::Conversion {
                    key: entry.item_id.clone(),
                    message: "rejected".into(),
                });
            }
            self.items.insert(entry.item_id.clone(), payload.to_vec());
            Ok(())
        }
    }

    /// Remote whose downloads always fail.
    struct BrokenRemote(FolderRemote);

    impl RemoteManifestProvider for BrokenRemote {
        fn get_remote_manifest(
            &self,
            kind: ItemKind,
        ) -> impl Future<Output = SyncResult<Manifest>> + Send {
            self.0.get_remote_manifest(kind)
        }
    }

    impl ItemTransport for BrokenRemote {
        fn upload_item(
            &self,
            kind: ItemKind,
            entry: &ManifestEntry,
            payload: Vec<u8>,
        ) -> impl Future<Output = SyncResult<()>> + Send {
            self.0.upload_item(kind, entry, payload)
        }

        async fn download_item(
            &self,
            _kind: ItemKind,
            entry: &ManifestEntry,
        ) -> SyncResult<Vec<u8>> {
            Err(SyncError::Transport(format!("offline: {}", entry.item_id)))
        }
    }

    struct Fixture {
        _dir: TempDir,
        manifest_path: std::path::PathBuf,
        remote: Arc<FolderRemote>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("local").join("templates.json");
        let remote = Arc::new(FolderRemote::new(dir.path().join("remote")));
        Fixture {
            _dir: dir,
            manifest_path,
            remote,
        }
    }

    async fn seed_remote(remote: &FolderRemote, id: &str, body: &str, secs: i64) -> ManifestEntry {
        let base = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let entry = ManifestEntry::new(id, "General", EntryValue::Path(id.into()), hash_bytes(body.as_bytes()))
            .with_last_modified(base + Duration::seconds(secs));
        remote
            .upload_item(ItemKind::Templates, &entry, body.as_bytes().to_vec())
            .await
            .unwrap();
        entry
    }

    #[tokio::test]
    async fn test_first_sync_uploads_everything() {
        let fx = fixture();
        let adapter = MemoryAdapter::with(&[("a.png", "A"), ("b.png", "B")]);
        let mut sync = SyncOrchestrator::new(
            adapter,
            ManifestStore::open(&fx.manifest_path),
            Arc::clone(&fx.remote),
        );

        let done = sync.run().await;

        assert!(done.success, "{done:?}");
        assert_eq!(done.uploaded, 2);
        assert_eq!(done.downloaded, 0);
        assert_eq!(sync.state(), SyncState::Idle);
        let remote = fx.remote.get_remote_manifest(ItemKind::Templates).await.unwrap();
        assert_eq!(remote.len(), 2);
        assert_eq!(ManifestStore::open(&fx.manifest_path).manifest().len(), 2);
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let fx = fixture();
        seed_remote(&fx.remote, "remote.png", "R", 0).await;
        let adapter = MemoryAdapter::with(&[("a.png", "A")]);
        let mut sync = SyncOrchestrator::new(
            adapter,
            ManifestStore::open(&fx.manifest_path),
            Arc::clone(&fx.remote),
        );

        let first = sync.run().await;
        assert_eq!(first.items_synced, 2);

        let second = sync.run().await;
        assert!(second.success);
        assert_eq!(second.items_synced, 0);
        assert_eq!(second.conflicts, 0);
        assert!(sync.plan().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newer_remote_wins_conflict() {
        let fx = fixture();
        let remote_entry = seed_remote(&fx.remote, "a.png", "REMOTE", 10).await;
        let adapter = MemoryAdapter::with(&[("a.png", "LOCAL")]);

        // Stored manifest pins the local timestamp before the remote one.
        let mut store = ManifestStore::open(&fx.manifest_path);
        let mut stored = adapter.enumerate().unwrap().remove(0);
        stored.last_modified = remote_entry.last_modified - Duration::seconds(5);
        store.put(stored);
        store.save().unwrap();

        let mut sync = SyncOrchestrator::new(adapter, store, Arc::clone(&fx.remote));
        let done = sync.run().await;

        assert_eq!(done.downloaded, 1);
        assert_eq!(done.conflicts, 1);
        assert_eq!(sync.adapter().items["a.png"], b"REMOTE");
        assert_eq!(sync.store().get("a.png"), Some(&remote_entry));
    }

    #[tokio::test]
    async fn test_prefer_local_policy_uploads_conflict() {
        let fx = fixture();
        seed_remote(&fx.remote, "a.png", "REMOTE", 10).await;
        let adapter = MemoryAdapter::with(&[("a.png", "LOCAL")]);
        let mut sync = SyncOrchestrator::new(
            adapter,
            ManifestStore::open(&fx.manifest_path),
            Arc::clone(&fx.remote),
        )
        .with_resolver(ConflictResolver::new(ConflictPolicy::PreferLocal, TieBreak::PreferRemote));

        let done = sync.run().await;

        assert_eq!(done.uploaded, 1);
        let payload = fx
            .remote
            .download_item(ItemKind::Templates, sync.store().get("a.png").unwrap())
            .await
            .unwrap();
        assert_eq!(payload, b"LOCAL");
    }

    #[tokio::test]
    async fn test_disabled_entry_stays_local() {
        let fx = fixture();
        let adapter = MemoryAdapter::with(&[("private.png", "P")]);
        let mut store = ManifestStore::open(&fx.manifest_path);
        let mut stored = adapter.enumerate().unwrap().remove(0);
        stored.is_sync_enabled = false;
        store.put(stored);
        store.save().unwrap();

        let mut sync = SyncOrchestrator::new(adapter, store, Arc::clone(&fx.remote));
        let done = sync.run().await;

        assert_eq!(done.items_synced, 0);
        assert!(fx.remote.get_remote_manifest(ItemKind::Templates).await.unwrap().is_empty());
        assert!(!sync.store().get("private.png").unwrap().is_sync_enabled);
    }

    #[tokio::test]
    async fn test_apply_failure_is_partial() {
        let fx = fixture();
        seed_remote(&fx.remote, "good.png", "G", 0).await;
        seed_remote(&fx.remote, "bad.png", "B", 0).await;
        let mut adapter = MemoryAdapter::default();
        adapter.reject = Some("bad.png".into());
        let mut sync = SyncOrchestrator::new(
            adapter,
            ManifestStore::open(&fx.manifest_path),
            Arc::clone(&fx.remote),
        );

        let done = sync.run().await;

        assert!(done.success);
        assert_eq!(done.downloaded, 1);
        assert_eq!(done.errors.len(), 1);
        assert!(done.errors[0].starts_with("bad.png"));
        assert!(sync.store().get("bad.png").is_none());
        assert!(sync.store().get("good.png").is_some());
    }

    #[tokio::test]
    async fn test_transport_failures_only_is_unsuccessful() {
        let fx = fixture();
        seed_remote(&fx.remote, "a.png", "A", 0).await;
        let remote = Arc::new(BrokenRemote(FolderRemote::new(fx.remote.root())));
        let mut sync = SyncOrchestrator::new(
            MemoryAdapter::default(),
            ManifestStore::open(&fx.manifest_path),
            remote,
        );

        let done = sync.run().await;

        assert!(!done.success);
        assert_eq!(done.items_synced, 0);
        assert_eq!(done.errors.len(), 1);
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_locked_manifest_fails_run() {
        let fx = fixture();
        let store = ManifestStore::open(&fx.manifest_path);
        let _held = store.lock().unwrap();
        let mut sync = SyncOrchestrator::new(
            MemoryAdapter::with(&[("a.png", "A")]),
            ManifestStore::open(&fx.manifest_path),
            Arc::clone(&fx.remote),
        );

        let done = sync.run().await;

        assert!(!done.success);
        assert_eq!(sync.state(), SyncState::Failed);
        assert!(done.message.contains("locked"));
    }

    #[tokio::test]
    async fn test_unreadable_remote_manifest_fails_run() {
        let fx = fixture();
        let path = fx.remote.manifest_path(ItemKind::Templates);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "garbage").unwrap();
        let mut sync = SyncOrchestrator::new(
            MemoryAdapter::with(&[("a.png", "A")]),
            ManifestStore::open(&fx.manifest_path),
            Arc::clone(&fx.remote),
        );

        let done = sync.run().await;

        assert!(!done.success);
        assert_eq!(sync.state(), SyncState::Failed);
        assert!(!fx.manifest_path.exists());
    }

    #[tokio::test]
    async fn test_failed_scan_fails_run_and_keeps_manifest() {
        let fx = fixture();
        let mut store = ManifestStore::open(&fx.manifest_path);
        store.put(ManifestEntry::new("a.png", "General", EntryValue::Path("a.png".into()), "h"));
        store.save().unwrap();
        let adapter = MemoryAdapter {
            offline: true,
            ..MemoryAdapter::default()
        };
        let mut sync = SyncOrchestrator::new(
            adapter,
            ManifestStore::open(&fx.manifest_path),
            Arc::clone(&fx.remote),
        );

        let done = sync.run().await;

        assert!(!done.success);
        assert_eq!(sync.state(), SyncState::Failed);
        assert!(sync.plan().await.is_err());
        let kept = ManifestStore::open(&fx.manifest_path);
        assert!(kept.manifest().contains("a.png"));
    }

    #[tokio::test]
    async fn test_cancelled_run_transfers_nothing_but_completes() {
        let fx = fixture();
        seed_remote(&fx.remote, "r.png", "R", 0).await;
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut sync = SyncOrchestrator::new(
            MemoryAdapter::with(&[("a.png", "A")]),
            ManifestStore::open(&fx.manifest_path),
            Arc::clone(&fx.remote),
        )
        .with_cancel_flag(cancel);

        let done = sync.run().await;

        assert_eq!(done.items_synced, 0);
        assert!(done.errors.contains(&SyncError::Cancelled.to_string()));
        assert!(fx.manifest_path.exists());
    }

    #[tokio::test]
    async fn test_epoch_remote_entry_is_rejected() {
        let fx = fixture();
        let mut stale = seed_remote(&fx.remote, "old.png", "O", 0).await;
        stale.last_modified = Utc.timestamp_opt(0, 0).unwrap();
        fx.remote
            .upload_item(ItemKind::Templates, &stale, b"O".to_vec())
            .await
            .unwrap();
        let mut sync = SyncOrchestrator::new(
            MemoryAdapter::default(),
            ManifestStore::open(&fx.manifest_path),
            Arc::clone(&fx.remote),
        );

        let done = sync.run().await;

        assert_eq!(done.downloaded, 0);
        assert_eq!(done.errors.len(), 1);
        assert!(sync.store().get("old.png").is_none());
    }

    #[tokio::test]
    async fn test_events_reach_channel_sink() {
        let fx = fixture();
        let (tx, mut rx) = mpsc::unbounded_channel::<SyncEvent>();
        let mut sync = SyncOrchestrator::new(
            MemoryAdapter::with(&[("a.png", "A")]),
            ManifestStore::open(&fx.manifest_path),
            Arc::clone(&fx.remote),
        )
        .with_sink(tx)
        .with_max_concurrency(0);

        sync.run().await;

        let mut states = Vec::new();
        let mut completed = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                SyncEvent::Progress(p) => {
                    assert!(p.progress <= 100);
                    if states.last() != Some(&p.state) {
                        states.push(p.state);
                    }
                }
                SyncEvent::Completed(c) => completed = Some(c),
            }
        }
        assert_eq!(
            states,
            [
                SyncState::Enumerating,
                SyncState::Diffing,
                SyncState::Resolving,
                SyncState::Uploading,
                SyncState::Downloading,
                SyncState::Persisting,
            ]
        );
        assert_eq!(completed.unwrap().uploaded, 1);
    }

    #[test]
    fn test_reconcile_keeps_timestamp_for_unchanged_items() {
        let old = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut stored = Manifest::new();
        let mut kept = ManifestEntry::new("same", "G", EntryValue::Path("same".into()), "h1")
            .with_last_modified(old);
        kept.is_sync_enabled = false;
        stored.insert(kept);
        stored.insert(
            ManifestEntry::new("edited", "G", EntryValue::Path("edited".into()), "h1")
                .with_last_modified(old),
        );
        stored.insert(ManifestEntry::new("gone", "G", EntryValue::Path("gone".into()), "h"));

        let scanned = vec![
            ManifestEntry::new("same", "G", EntryValue::Path("same".into()), "h1"),
            ManifestEntry::new("edited", "G", EntryValue::Path("edited".into()), "h2"),
        ];
        let snapshot = reconcile_snapshot(&stored, scanned);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("same").unwrap().last_modified, old);
        assert!(!snapshot.get("same").unwrap().is_sync_enabled);
        assert!(snapshot.get("edited").unwrap().last_modified > old);
        assert!(!snapshot.contains("gone"));
    }

    #[test]
    fn test_step_percent_bounds() {
        assert_eq!(step_percent(SyncState::Uploading, 0, 4), 40);
        assert_eq!(step_percent(SyncState::Uploading, 4, 4), 65);
        assert_eq!(step_percent(SyncState::Downloading, 1, 2), 77);
        assert_eq!(step_percent(SyncState::Resolving, 1, 1), 30);
    }
}
