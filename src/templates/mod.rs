//! Template item kind.
//!
//! Templates are binary files under a local root. The item id is the path
//! relative to that root with `/` separators, the entry value is that same
//! relative path, and the content hash covers the raw file bytes.

pub mod metadata;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::sync::file::{atomic_write, resolve_under};
use crate::sync::{
    EntryEnumerator, EntryValue, ItemApplier, ItemKind, ManifestEntry, SyncError, SyncResult,
    hash_bytes,
};

/// Extensions scanned when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "json", "xml"];

/// Adapter syncing the files of a template directory.
#[derive(Debug, Clone)]
pub struct TemplateAdapter {
    root: PathBuf,
    extensions: Vec<String>,
}

impl TemplateAdapter {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_extensions(root, DEFAULT_EXTENSIONS.iter().map(ToString::to_string))
    }

    /// Adapter scanning only files with the given extensions (case-insensitive).
    #[must_use]
    pub fn with_extensions(root: impl Into<PathBuf>, extensions: impl IntoIterator<Item = String>) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_template(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }

    /// Gather template files below the root.
    ///
    /// A missing root is an empty library. Any other failure to read the root
    /// is returned; unreadable subfolders are skipped.
    fn collect_root(&self) -> SyncResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "Template folder does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        self.collect_entries(entries, &mut files);
        Ok(files)
    }

    fn collect_files(&self, dir: &Path, out: &mut Vec<PathBuf>) {
        match fs::read_dir(dir) {
            Ok(entries) => self.collect_entries(entries, out),
            Err(e) => warn!(dir = %dir.display(), error = %e, "Cannot read template folder"),
        }
    }

    fn collect_entries(&self, entries: fs::ReadDir, out: &mut Vec<PathBuf>) {
        for entry in entries.flatten() {
            let path = entry.path();
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            match entry.file_type() {
                Ok(t) if t.is_dir() => self.collect_files(&path, out),
                Ok(t) if t.is_file() && self.is_template(&path) => out.push(path),
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping template"),
            }
        }
    }

    fn item_id(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative.iter().map(|c| c.to_str()).collect();
        Some(parts?.join("/"))
    }

    fn scan_file(&self, path: &Path) -> SyncResult<ManifestEntry> {
        let item_id = self
            .item_id(path)
            .ok_or_else(|| SyncError::InvalidPath(path.display().to_string()))?;
        let bytes = fs::read(path)?;

        let last_modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);

        let mut entry = ManifestEntry::new(
            item_id.clone(),
            metadata::categorize(&item_id),
            EntryValue::Path(item_id),
            hash_bytes(&bytes),
        )
        .with_last_modified(last_modified);
        entry.metadata = metadata::extract(path, &bytes);
        Ok(entry)
    }

    fn local_path(&self, entry: &ManifestEntry) -> SyncResult<PathBuf> {
        resolve_under(&self.root, &entry.item_id)
    }
}

impl EntryEnumerator for TemplateAdapter {
    fn kind(&self) -> ItemKind {
        ItemKind::Templates
    }

    fn enumerate(&self) -> SyncResult<Vec<ManifestEntry>> {
        let files = self.collect_root()?;

        let mut entries = Vec::with_capacity(files.len());
        for path in files {
            match self.scan_file(&path) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable template"),
            }
        }
        debug!(root = %self.root.display(), count = entries.len(), "Scanned templates");
        Ok(entries)
    }

    fn read_payload(&self, entry: &ManifestEntry) -> SyncResult<Vec<u8>> {
        Ok(fs::read(self.local_path(entry)?)?)
    }
}

impl ItemApplier for TemplateAdapter {
    fn write_item(&mut self, entry: &ManifestEntry, payload: &[u8]) -> SyncResult<()> {
        // The file lands where the next scan files it: under its item id.
        if let Some(path) = entry.path().filter(|path| *path != entry.item_id) {
            return Err(SyncError::InvalidPath(format!(
                "{} is stored at {path}",
                entry.item_id
            )));
        }

        let actual = hash_bytes(payload);
        if actual != entry.content_hash {
            return Err(SyncError::HashMismatch {
                item_id: entry.item_id.clone(),
                expected: entry.content_hash.clone(),
                actual,
            });
        }

        let path = self.local_path(entry)?;
        atomic_write(&path, payload)?;
        debug!(item = %entry.item_id, path = %path.display(), "Wrote template");
        Ok(())
    }
}
