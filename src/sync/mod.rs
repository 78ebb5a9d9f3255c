//! Manifest-based reconciliation.
//!
//! Each item kind keeps a local manifest of what it holds. A sync run
//! compares that manifest with the remote one and moves whatever differs:
//!
//! - **Hashing**: SHA-256 content hashes decide equality
//! - **Manifest**: atomic, lock-guarded persistence of the local manifest
//! - **Diff**: classify items into upload, download and conflict lists
//! - **Resolve**: pick a winner for each conflict (last writer wins)
//! - **Apply**: write accepted remote items locally and record them
//! - **Orchestrator**: sequence a run, bound transfers, report progress
//!
//! # Architecture
//!
//! The core never knows what an item is. An item kind plugs in through
//! [`EntryEnumerator`] (list local items, serve payloads) and
//! [`ItemApplier`] (write remote payloads). The remote side plugs in through
//! [`RemoteManifestProvider`] and [`ItemTransport`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use boothsync::sync::{FolderRemote, ManifestStore, SyncOrchestrator};
//! use boothsync::templates::TemplateAdapter;
//!
//! let adapter = TemplateAdapter::new("/srv/booth/templates");
//! let store = ManifestStore::open("/srv/booth/manifests/templates.json");
//! let remote = Arc::new(FolderRemote::new("/mnt/share/booth"));
//!
//! let completion = SyncOrchestrator::new(adapter, store, remote).run().await;
//! println!("{}", completion.message);
//! ```

mod adapter;
mod apply;
mod diff;
pub mod file;
mod hash;
mod manifest;
mod orchestrator;
mod resolve;
mod status;
mod transport;
mod types;
mod value;

pub use adapter::{EntryEnumerator, ItemApplier};
pub use apply::ApplyEngine;
pub use diff::{compare, compare_with};
pub use hash::{has_changed, hash_bytes, value_hash};
pub use manifest::{ManifestLock, ManifestStore};
pub use orchestrator::{
    CancelFlag, DEFAULT_MAX_CONCURRENCY, LogSink, ProgressSink, SyncOrchestrator,
    reconcile_snapshot,
};
pub use resolve::{ConflictPolicy, ConflictResolver, DEFAULT_TIE_BREAK, TieBreak};
pub use status::{PlannedConflict, SyncPlan, format_size, print_plan};
pub use transport::{FolderRemote, ItemTransport, RemoteManifestProvider};
pub use types::{
    EntryValue, ExportedManifest, ItemKind, Manifest, ManifestEntry, SyncAction, SyncCompletion,
    SyncConflict, SyncDifferences, SyncError, SyncEvent, SyncProgress, SyncResult, SyncState,
};
pub use value::SettingValue;
