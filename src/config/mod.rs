//! Configuration management.
//!
//! This module locates the boothsync home directory and loads its
//! `config.json`.
//!
//! # Layout
//!
//! ```text
//! ~/.boothsync/
//!   config.json              SyncConfig
//!   device_id                this installation's identifier
//!   settings.json            live configuration (default location)
//!   templates/               template files (default location)
//!   manifests/settings.json  local manifest per item kind
//!   manifests/templates.json
//! ```

mod device;

pub use device::{load_device_id, load_or_create_device_id};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sync::file::{read_json, write_json_pretty};
use crate::sync::{ConflictPolicy, ConflictResolver, DEFAULT_MAX_CONCURRENCY, ItemKind, TieBreak};
use crate::templates::DEFAULT_EXTENSIONS;

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "BOOTHSYNC_HOME";

/// Environment variable overriding the remote directory.
pub const REMOTE_ENV: &str = "BOOTHSYNC_REMOTE";

/// Get the default home directory location (`~/.boothsync`).
#[must_use]
pub fn default_home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".boothsync"))
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Resolve the home directory.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `BOOTHSYNC_HOME` environment variable
/// 3. `~/.boothsync`
///
/// # Errors
///
/// Returns an error if no home directory can be determined.
pub fn resolve_home(explicit_path: Option<&Path>) -> Result<BoothHome> {
    explicit_path
        .map(Path::to_path_buf)
        .or_else(|| env_path(HOME_ENV))
        .or_else(default_home_dir)
        .map(BoothHome::new)
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Paths inside one home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoothHome {
    root: PathBuf,
}

impl BoothHome {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    #[must_use]
    pub fn device_id_path(&self) -> PathBuf {
        self.root.join("device_id")
    }

    /// Local manifest document for `kind`.
    #[must_use]
    pub fn manifest_path(&self, kind: ItemKind) -> PathBuf {
        self.root.join("manifests").join(format!("{}.json", kind.as_str()))
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.config_path().exists()
    }

    /// Load the configuration, failing if `init` was never run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] without a config file, or a
    /// configuration error if it does not parse.
    pub fn load_config(&self) -> Result<SyncConfig> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        SyncConfig::load(&self.config_path())
    }
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect()
}

const fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

/// Contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Shared directory acting as the remote store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_dir: Option<PathBuf>,
    /// Template root; `<home>/templates` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
    /// Live configuration file; `<home>/settings.json` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,
    #[serde(default = "default_extensions")]
    pub template_extensions: Vec<String>,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub policy: ConflictPolicy,
    #[serde(default)]
    pub tie_break: TieBreak,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_dir: None,
            template_dir: None,
            settings_path: None,
            template_extensions: default_extensions(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            policy: ConflictPolicy::default(),
            tie_break: TieBreak::default(),
        }
    }
}

impl SyncConfig {
    /// Load a configuration file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        read_json::<Self>(path)
            .map(Option::unwrap_or_default)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))
    }

    /// Write the configuration atomically.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_pretty(path, self)
            .map_err(|e| Error::Config(format!("Failed to write {}: {e}", path.display())))
    }

    #[must_use]
    pub fn template_dir(&self, home: &BoothHome) -> PathBuf {
        self.template_dir
            .clone()
            .unwrap_or_else(|| home.root().join("templates"))
    }

    #[must_use]
    pub fn settings_path(&self, home: &BoothHome) -> PathBuf {
        self.settings_path
            .clone()
            .unwrap_or_else(|| home.root().join("settings.json"))
    }

    /// Effective remote directory.
    ///
    /// Priority: explicit flag, then `BOOTHSYNC_REMOTE`, then `remote_dir`.
    #[must_use]
    pub fn remote_dir(&self, explicit_path: Option<&Path>) -> Option<PathBuf> {
        explicit_path
            .map(Path::to_path_buf)
            .or_else(|| env_path(REMOTE_ENV))
            .or_else(|| self.remote_dir.clone())
    }

    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    #[must_use]
    pub fn resolver(&self) -> ConflictResolver {
        ConflictResolver::new(self.policy, self.tie_break)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_home_with_explicit() {
        let explicit = PathBuf::from("/custom/booth");
        let home = resolve_home(Some(&explicit)).unwrap();
        assert_eq!(home.root(), explicit);
        assert_eq!(
            home.manifest_path(ItemKind::Templates),
            PathBuf::from("/custom/booth/manifests/templates.json")
        );
    }

    #[test]
    fn test_default_home_dir_returns_some() {
        let result = default_home_dir();
        assert!(result.is_some());
        assert!(result.unwrap().ends_with(".boothsync"));
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = SyncConfig::load(&temp_dir.path().join("config.json")).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.template_extensions.len(), 5);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"remote_dir": "/mnt/share", "policy": "local", "max_concurrency": 0}"#).unwrap();

        let config = SyncConfig::load(&path).unwrap();

        assert_eq!(config.remote_dir, Some(PathBuf::from("/mnt/share")));
        assert_eq!(config.policy, ConflictPolicy::PreferLocal);
        assert_eq!(config.tie_break, TieBreak::PreferRemote);
        assert_eq!(config.max_concurrency(), 1);
    }

    #[test]
    fn test_malformed_config_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(SyncConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_round_trip_and_defaults_paths() {
        let temp_dir = TempDir::new().unwrap();
        let home = BoothHome::new(temp_dir.path());
        assert!(matches!(home.load_config(), Err(Error::NotInitialized)));

        let config = SyncConfig {
            tie_break: TieBreak::PreferLocal,
            ..SyncConfig::default()
        };
        config.save(&home.config_path()).unwrap();

        let loaded = home.load_config().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.template_dir(&home), temp_dir.path().join("templates"));
        assert_eq!(loaded.settings_path(&home), temp_dir.path().join("settings.json"));
    }

    #[test]
    fn test_explicit_remote_wins() {
        let config = SyncConfig {
            remote_dir: Some(PathBuf::from("/from/config")),
            ..SyncConfig::default()
        };
        assert_eq!(
            config.remote_dir(Some(Path::new("/from/flag"))),
            Some(PathBuf::from("/from/flag"))
        );
    }
}
