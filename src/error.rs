//! Error types for the boothsync CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=setup, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::sync::SyncError;

/// Result type alias for boothsync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Setup (exit 2)
    NotInitialized,
    AlreadyInitialized,
    NoRemote,

    // Not Found (exit 3)
    SettingNotFound,
    ItemNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidValue,

    // Contention (exit 5)
    ManifestLocked,

    // Sync (exit 6)
    SyncError,
    IntegrityError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::NoRemote => "NO_REMOTE",
            Self::SettingNotFound => "SETTING_NOT_FOUND",
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidValue => "INVALID_VALUE",
            Self::ManifestLocked => "MANIFEST_LOCKED",
            Self::SyncError => "SYNC_ERROR",
            Self::IntegrityError => "INTEGRITY_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::NoRemote => 2,
            Self::SettingNotFound | Self::ItemNotFound => 3,
            Self::InvalidArgument | Self::InvalidValue => 4,
            Self::ManifestLocked => 5,
            Self::SyncError | Self::IntegrityError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether a caller should retry, with corrected input or after a wait.
    ///
    /// True for validation errors and a held manifest lock. False for
    /// not-found, I/O, or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument | Self::InvalidValue | Self::ManifestLocked
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in boothsync CLI operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `boothsync init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("No remote configured")]
    NoRemote,

    #[error("Not a syncable setting: {key}")]
    SettingNotFound { key: String },

    #[error("No {kind} manifest entry: {id}")]
    ItemNotFound { kind: String, id: String },

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::NoRemote => ErrorCode::NoRemote,
            Self::SettingNotFound { .. } => ErrorCode::SettingNotFound,
            Self::ItemNotFound { .. } => ErrorCode::ItemNotFound,
            Self::Sync(e) => match e {
                SyncError::Locked(_) => ErrorCode::ManifestLocked,
                SyncError::Conversion { .. } => ErrorCode::InvalidValue,
                SyncError::HashMismatch { .. } => ErrorCode::IntegrityError,
                SyncError::UnknownItem(_) => ErrorCode::ItemNotFound,
                SyncError::Io(_) => ErrorCode::IoError,
                SyncError::Json(_) => ErrorCode::JsonError,
                SyncError::Transport(_)
                | SyncError::InvalidPath(_)
                | SyncError::Cancelled => ErrorCode::SyncError,
            },
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => {
                Some("Run `boothsync init` to create the home directory".to_string())
            }

            Self::AlreadyInitialized { path } => Some(format!(
                "Configuration already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::NoRemote => Some(
                "Pass --remote <dir>, set BOOTHSYNC_REMOTE, or set \"remote_dir\" in config.json"
                    .to_string(),
            ),

            Self::SettingNotFound { .. } => Some(
                "Use `boothsync settings list` to see the syncable settings.".to_string(),
            ),

            Self::ItemNotFound { kind, .. } => Some(format!(
                "Use `boothsync manifest show {kind}` to see the tracked items."
            )),

            Self::Sync(SyncError::Locked(_)) => Some(
                "Another sync is running against this manifest. Retry once it finishes."
                    .to_string(),
            ),

            Self::Sync(SyncError::HashMismatch { .. }) => Some(
                "The remote copy is inconsistent with its manifest. Re-sync from the device that wrote it."
                    .to_string(),
            ),

            Self::InvalidArgument(msg) => {
                if msg.contains("kind") {
                    Some("Valid kinds: settings, templates".to_string())
                } else if msg.contains("policy") {
                    Some("Valid policies: newest, local, remote".to_string())
                } else {
                    None
                }
            }

            Self::Sync(_) | Self::Io(_) | Self::Json(_) | Self::Config(_) | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
