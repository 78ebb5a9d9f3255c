//! Manifest command implementations.

use crate::cli::{KindArg, ManifestCommands, selected_kinds};
use crate::error::Result;
use crate::service::BoothSync;
use crate::sync::file::file_size;
use crate::sync::{EntryValue, ItemKind, ManifestEntry, format_size};
use colored::Colorize;
use std::path::Path;

/// Execute manifest commands.
///
/// # Errors
///
/// Returns an error if the installation cannot be opened or the manifest
/// cannot be read or written.
pub fn execute(command: &ManifestCommands, home: Option<&Path>, json: bool) -> Result<()> {
    let booth = BoothSync::open(home, None)?;

    match command {
        ManifestCommands::Show { kind } => show(&booth, (*kind).into(), json),
        ManifestCommands::Export { kind, output } => export(&booth, (*kind).into(), output, json),
        ManifestCommands::Enable { kind, id } => toggle(&booth, *kind, id, true, json),
        ManifestCommands::Disable { kind, id } => toggle(&booth, *kind, id, false, json),
        ManifestCommands::Rebuild { kind } => rebuild(&booth, &selected_kinds(*kind), json),
    }
}

fn describe_value(entry: &ManifestEntry) -> String {
    match &entry.value {
        EntryValue::Inline(value) => value.to_string(),
        EntryValue::Path(path) => entry
            .metadata
            .get("size")
            .and_then(serde_json::Value::as_u64)
            .map_or_else(|| path.clone(), |size| format!("{path} ({})", format_size(size))),
    }
}

fn show(booth: &BoothSync, kind: ItemKind, json: bool) -> Result<()> {
    let store = booth.manifest_store(kind);
    let manifest = store.manifest();

    if json {
        println!("{}", serde_json::to_string(manifest)?);
        return Ok(());
    }

    if manifest.is_empty() {
        println!("{}", format!("No {kind} manifest entries.").dimmed());
        println!("{}", format!("Run 'boothsync manifest rebuild {kind}' to scan.").dimmed());
        return Ok(());
    }

    println!("{}", format!("{kind} manifest ({} entries)", manifest.len()).bold().underline());
    for entry in manifest.iter() {
        let marker = if entry.is_sync_enabled {
            "●".green()
        } else {
            "○".dimmed()
        };
        println!(
            "  {marker} {} [{}] {}",
            entry.item_id.bold(),
            entry.category,
            describe_value(entry)
        );
        println!(
            "      {} {}",
            entry.last_modified.to_rfc3339().dimmed(),
            entry.content_hash.get(..12).unwrap_or(entry.content_hash.as_str()).dimmed()
        );
    }
    Ok(())
}

fn export(booth: &BoothSync, kind: ItemKind, output: &Path, json: bool) -> Result<()> {
    let exported = booth.export_manifest(kind, output)?;
    let size = file_size(output);

    if json {
        let payload = serde_json::json!({
            "kind": kind,
            "path": output,
            "entries": exported.entries.len(),
            "bytes": size,
        });
        println!("{payload}");
    } else {
        println!(
            "Exported {} {kind} entries to {} ({})",
            exported.entries.len(),
            output.display(),
            format_size(size)
        );
    }
    Ok(())
}

fn toggle(booth: &BoothSync, kind: KindArg, id: &str, enabled: bool, json: bool) -> Result<()> {
    let entry = booth.set_sync_enabled(kind.into(), id, enabled)?;

    if json {
        println!("{}", serde_json::to_string(&entry)?);
    } else if enabled {
        println!("Sync enabled for {}", entry.item_id);
    } else {
        println!("Sync disabled for {}", entry.item_id);
    }
    Ok(())
}

fn rebuild(booth: &BoothSync, kinds: &[ItemKind], json: bool) -> Result<()> {
    let mut counts = serde_json::Map::new();
    for &kind in kinds {
        let manifest = booth.rebuild_manifest(kind)?;
        if !json {
            println!("Rebuilt {kind} manifest: {} entries", manifest.len());
        }
        counts.insert(kind.to_string(), manifest.len().into());
    }
    if json {
        println!("{}", serde_json::Value::Object(counts));
    }
    Ok(())
}
