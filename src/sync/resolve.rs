//! Conflict resolution.
//!
//! Resolution is whole-entry: one side wins and its copy replaces the other.
//! Under the default [`ConflictPolicy::NewestWins`] the entry with the
//! strictly greater `last_modified` wins and equal timestamps fall to
//! [`DEFAULT_TIE_BREAK`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sync::types::{ManifestEntry, SyncAction, SyncConflict};

/// Which side wins when both entries carry the same timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Equal timestamps download the remote copy.
    #[default]
    #[serde(rename = "remote")]
    PreferRemote,
    /// Equal timestamps upload the local copy.
    #[serde(rename = "local")]
    PreferLocal,
}

/// Tie-break used when none is configured. Ties download.
pub const DEFAULT_TIE_BREAK: TieBreak = TieBreak::PreferRemote;

/// Conflict resolution policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Last writer wins, by `last_modified`.
    #[default]
    #[serde(rename = "newest")]
    NewestWins,
    /// Always push the local copy.
    #[serde(rename = "local")]
    PreferLocal,
    /// Always take the remote copy.
    #[serde(rename = "remote")]
    PreferRemote,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewestWins => f.write_str("newest"),
            Self::PreferLocal => f.write_str("local"),
            Self::PreferRemote => f.write_str("remote"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" | "newer" => Ok(Self::NewestWins),
            "local" => Ok(Self::PreferLocal),
            "remote" => Ok(Self::PreferRemote),
            _ => Err(format!("Unknown conflict policy: {s}")),
        }
    }
}

/// Decides the direction for an item whose hash differs on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictResolver {
    policy: ConflictPolicy,
    tie_break: TieBreak,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(ConflictPolicy::NewestWins, DEFAULT_TIE_BREAK)
    }
}

impl ConflictResolver {
    #[must_use]
    pub const fn new(policy: ConflictPolicy, tie_break: TieBreak) -> Self {
        Self { policy, tie_break }
    }

    #[must_use]
    pub const fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    #[must_use]
    pub const fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Pick a direction for two differing versions of the same item.
    #[must_use]
    pub fn decide(&self, local: &ManifestEntry, remote: &ManifestEntry) -> SyncAction {
        match self.policy {
            ConflictPolicy::PreferLocal => SyncAction::Upload,
            ConflictPolicy::PreferRemote => SyncAction::Download,
            ConflictPolicy::NewestWins => {
                if local.last_modified > remote.last_modified {
                    SyncAction::Upload
                } else if local.last_modified < remote.last_modified {
                    SyncAction::Download
                } else {
                    match self.tie_break {
                        TieBreak::PreferRemote => SyncAction::Download,
                        TieBreak::PreferLocal => SyncAction::Upload,
                    }
                }
            }
        }
    }

    /// Re-derive the direction the diff chose for a reported conflict.
    #[must_use]
    pub fn resolve(&self, conflict: &SyncConflict) -> SyncAction {
        self.decide(&conflict.local_version, &conflict.remote_version)
    }
}
