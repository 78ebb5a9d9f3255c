//! Sync plan display.
//!
//! A plan is the diff of one item kind with each conflict's outcome already
//! decided, so `status` can show exactly what the next `sync` would move.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::sync::resolve::ConflictResolver;
use crate::sync::types::{ItemKind, SyncAction, SyncDifferences};

/// One conflict and how it will be settled.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedConflict {
    pub item_id: String,
    pub action: SyncAction,
    pub local_modified: DateTime<Utc>,
    pub remote_modified: DateTime<Utc>,
}

/// What the next sync of one item kind would do.
#[derive(Debug, Clone, Serialize)]
pub struct SyncPlan {
    pub kind: ItemKind,
    pub to_upload: Vec<String>,
    pub to_download: Vec<String>,
    pub conflicts: Vec<PlannedConflict>,
}

impl SyncPlan {
    #[must_use]
    pub fn new(kind: ItemKind, diff: &SyncDifferences, resolver: &ConflictResolver) -> Self {
        Self {
            kind,
            to_upload: diff.to_upload.iter().map(|e| e.item_id.clone()).collect(),
            to_download: diff.to_download.iter().map(|e| e.item_id.clone()).collect(),
            conflicts: diff
                .conflicts
                .iter()
                .map(|c| PlannedConflict {
                    item_id: c.item_id.clone(),
                    action: resolver.resolve(c),
                    local_modified: c.local_version.last_modified,
                    remote_modified: c.remote_version.last_modified,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.to_upload.is_empty() && self.to_download.is_empty()
    }
}

/// Print a plan to stdout in a human-readable format.
pub fn print_plan(plan: &SyncPlan) {
    println!("{}", format!("{} sync plan", plan.kind).bold().underline());

    if plan.is_in_sync() {
        println!("  {}", "In sync.".green());
        println!();
        return;
    }

    if !plan.to_upload.is_empty() {
        println!("{}", "To upload:".blue().bold());
        for id in &plan.to_upload {
            println!("  {} {id}", "↑".blue());
        }
    }
    if !plan.to_download.is_empty() {
        println!("{}", "To download:".yellow().bold());
        for id in &plan.to_download {
            println!("  {} {id}", "↓".yellow());
        }
    }
    if !plan.conflicts.is_empty() {
        println!("{}", "Conflicts:".red().bold());
        for c in &plan.conflicts {
            println!(
                "  {} → {} {}",
                c.item_id,
                c.action.to_string().bold(),
                format!("(local {}, remote {})", c.local_modified.to_rfc3339(), c.remote_modified.to_rfc3339())
                    .dimmed()
            );
        }
    }
    println!();
}

/// Format a byte size as a human-readable string.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::diff::compare;
    use crate::sync::types::{EntryValue, Manifest, ManifestEntry};
    use chrono::TimeZone;

    fn entry(id: &str, hash: &str, secs: i64) -> ManifestEntry {
        ManifestEntry::new(id, "General", EntryValue::Path(id.into()), hash)
            .with_last_modified(Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }

    #[test]
    fn test_plan_carries_resolved_actions() {
        let local: Manifest = [entry("a.png", "a1", 200), entry("b.png", "b1", 100)]
            .into_iter()
            .collect();
        let remote: Manifest = [entry("a.png", "a2", 100), entry("c.png", "c1", 100)]
            .into_iter()
            .collect();

        let plan = SyncPlan::new(
            ItemKind::Templates,
            &compare(&local, &remote),
            &ConflictResolver::default(),
        );

        assert_eq!(plan.to_upload, vec!["a.png", "b.png"]);
        assert_eq!(plan.to_download, vec!["c.png"]);
        assert_eq!(plan.conflicts.len(), 1);
        assert_eq!(plan.conflicts[0].action, SyncAction::Upload);
        assert!(!plan.is_in_sync());
    }

    #[test]
    fn test_empty_plan_is_in_sync() {
        let manifest: Manifest = [entry("Template_4x6", "c3", 100)].into_iter().collect();
        let plan = SyncPlan::new(
            ItemKind::Templates,
            &compare(&manifest, &manifest),
            &ConflictResolver::default(),
        );
        assert!(plan.is_in_sync());
        assert!(plan.conflicts.is_empty());
    }
}
