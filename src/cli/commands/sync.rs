//! Sync command implementation.
//!
//! Runs one orchestrator per selected item kind, one after the other. Progress
//! events stream over a channel while the run is in flight: as JSON lines
//! with `--json`, as status lines otherwise.

use colored::Colorize;
use tokio::sync::mpsc;

use crate::cli::commands::runtime;
use crate::error::{Error, Result};
use crate::service::BoothSync;
use crate::sync::{ItemKind, SyncCompletion, SyncEvent};
use std::path::Path;

/// Execute the sync command.
///
/// # Errors
///
/// Returns an error if the installation cannot be opened, no remote is
/// configured, or any selected kind ends unsuccessfully.
pub fn execute(
    home: Option<&Path>,
    remote: Option<&Path>,
    kinds: &[ItemKind],
    json: bool,
    quiet: bool,
) -> Result<()> {
    let booth = BoothSync::open(home, remote)?;
    booth.remote()?;

    let rt = runtime()?;
    let mut failed = Vec::new();
    for &kind in kinds {
        let completion = rt.block_on(run_kind(&booth, kind, json, quiet))?;
        if !json && !quiet {
            print_completion(kind, &completion);
        }
        if !completion.success {
            failed.push(format!("{kind}: {}", completion.message));
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(Error::Other(format!("Sync failed ({})", failed.join("; "))))
    }
}

async fn run_kind(booth: &BoothSync, kind: ItemKind, json: bool, quiet: bool) -> Result<SyncCompletion> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SyncEvent>();

    let printer = async move {
        while let Some(event) = rx.recv().await {
            if json {
                if let Ok(line) = serde_json::to_string(&event) {
                    println!("{line}");
                }
            } else if !quiet {
                if let SyncEvent::Progress(p) = &event {
                    println!("{} {}", format!("[{kind} {:>3}%]", p.progress).dimmed(), p.message);
                }
            }
        }
    };

    let (completion, ()) = tokio::join!(booth.sync(kind, tx), printer);
    completion
}

fn print_completion(kind: ItemKind, completion: &SyncCompletion) {
    let headline = format!("{kind}: {}", completion.message);
    if completion.success {
        println!("{}", headline.green());
    } else {
        println!("{}", headline.red());
    }
    println!(
        "  {} uploaded, {} downloaded, {} conflict(s)",
        completion.uploaded, completion.downloaded, completion.conflicts
    );
    for error in &completion.errors {
        println!("  {} {error}", "!".yellow());
    }
}
