//! Atomic file operations for sync.
//!
//! This module provides safe file operations that prevent data corruption:
//! - Atomic writes: write to temp file, sync to disk, then rename
//! - Pretty JSON documents read and written wholesale
//! - Safe resolution of item-relative paths under a root

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::sync::types::{SyncError, SyncResult};

/// Sibling path used for the temporary copy during an atomic write.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("file"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write bytes to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary file next to the target
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> SyncResult<()> {
    let temp_path = temp_path_for(path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Serialize a value as pretty JSON and write it atomically.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> SyncResult<()> {
    let mut content = serde_json::to_vec_pretty(value)?;
    content.push(b'\n');
    atomic_write(path, &content)
}

/// Read a JSON document.
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> SyncResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&content)?))
}

/// Get the size of a file in bytes.
///
/// Returns 0 if the file doesn't exist.
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Resolve a `/`-separated relative item path under `root`.
///
/// Absolute paths, `..` components and empty paths are rejected so that a
/// remote entry can never write outside the root.
///
/// # Errors
///
/// Returns [`SyncError::InvalidPath`] for unusable paths.
pub fn resolve_under(root: &Path, relative: &str) -> SyncResult<PathBuf> {
    let rel = Path::new(relative);
    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;

    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SyncError::InvalidPath(relative.to_string()));
            }
        }
    }

    if depth == 0 {
        return Err(SyncError::InvalidPath(relative.to_string()));
    }
    Ok(resolved)
}
