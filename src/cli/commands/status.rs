//! Status command implementation.
//!
//! Computes the diff for each selected kind without moving anything.

use crate::cli::commands::runtime;
use crate::error::Result;
use crate::service::BoothSync;
use crate::sync::{ItemKind, SyncPlan, print_plan};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct StatusOutput<'a> {
    device_id: &'a str,
    remote_dir: Option<&'a Path>,
    plans: Vec<SyncPlan>,
}

/// Execute the status command.
///
/// # Errors
///
/// Returns an error if no remote is configured or a remote manifest cannot
/// be read.
pub fn execute(home: Option<&Path>, remote: Option<&Path>, kinds: &[ItemKind], json: bool) -> Result<()> {
    let booth = BoothSync::open(home, remote)?;
    booth.remote()?;

    let rt = runtime()?;
    let plans = kinds
        .iter()
        .map(|&kind| rt.block_on(booth.plan(kind)))
        .collect::<Result<Vec<_>>>()?;

    if json {
        let output = StatusOutput {
            device_id: booth.device_id(),
            remote_dir: booth.remote_dir(),
            plans,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{} {}", "Device:".bold(), booth.device_id());
    if let Some(dir) = booth.remote_dir() {
        println!("{} {}", "Remote:".bold(), dir.display());
    }
    println!();
    for plan in &plans {
        print_plan(plan);
    }
    Ok(())
}
