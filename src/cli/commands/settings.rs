//! Settings command implementations.
//!
//! Only keys in the syncable allow-list are visible here; everything else in
//! the settings file is left alone.

use crate::cli::SettingsCommands;
use crate::error::{Error, Result};
use crate::service::BoothSync;
use crate::settings::{SYNCABLE_SETTINGS, SettingDescriptor, SettingsStore, find_descriptor};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct SettingOutput {
    key: &'static str,
    category: &'static str,
    #[serde(rename = "type")]
    kind: String,
    value: serde_json::Value,
}

/// Execute settings commands.
///
/// # Errors
///
/// Returns an error for unknown keys, values that do not fit the key's type,
/// or an unreadable settings file.
pub fn execute(command: &SettingsCommands, home: Option<&Path>, json: bool) -> Result<()> {
    let booth = BoothSync::open(home, None)?;
    let mut store = booth.settings_store()?;

    match command {
        SettingsCommands::List => list(&store, json),
        SettingsCommands::Get { key } => get(&store, key, json),
        SettingsCommands::Set { key, value } => set(&mut store, key, value, json),
    }
}

fn descriptor(key: &str) -> Result<&'static SettingDescriptor> {
    find_descriptor(key).ok_or_else(|| Error::SettingNotFound { key: key.to_string() })
}

fn output(store: &SettingsStore, descriptor: &'static SettingDescriptor) -> Result<SettingOutput> {
    let value = store
        .read(descriptor)?
        .map_or(serde_json::Value::Null, |v| v.to_json());
    Ok(SettingOutput {
        key: descriptor.key,
        category: descriptor.category,
        kind: descriptor.kind.to_string(),
        value,
    })
}

fn print_setting(setting: &SettingOutput) {
    let value = if setting.value.is_null() {
        "(unset)".dimmed().to_string()
    } else {
        setting.value.to_string()
    };
    println!(
        "  {:<28} {:<12} {value}",
        setting.key.bold(),
        setting.category.dimmed()
    );
}

fn list(store: &SettingsStore, json: bool) -> Result<()> {
    let mut settings = Vec::with_capacity(SYNCABLE_SETTINGS.len());
    for descriptor in SYNCABLE_SETTINGS {
        match output(store, descriptor) {
            Ok(setting) => settings.push(setting),
            Err(e) => tracing::warn!(key = descriptor.key, error = %e, "Unreadable setting"),
        }
    }

    if json {
        println!("{}", serde_json::to_string(&settings)?);
        return Ok(());
    }

    println!("{}", "Syncable settings".bold().underline());
    for setting in &settings {
        print_setting(setting);
    }
    Ok(())
}

fn get(store: &SettingsStore, key: &str, json: bool) -> Result<()> {
    let setting = output(store, descriptor(key)?)?;
    if json {
        println!("{}", serde_json::to_string(&setting)?);
    } else {
        print_setting(&setting);
    }
    Ok(())
}

fn set(store: &mut SettingsStore, key: &str, text: &str, json: bool) -> Result<()> {
    let descriptor = descriptor(key)?;
    let value = descriptor.kind.parse_text(descriptor.key, text)?;
    store.set_and_save(descriptor.key, &value)?;

    let setting = output(store, descriptor)?;
    if json {
        println!("{}", serde_json::to_string(&setting)?);
    } else {
        println!("Set {} = {value}", descriptor.key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SettingValue;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> SettingsStore {
        SettingsStore::open(dir.path().join("settings.json")).unwrap()
    }

    #[test]
    fn test_set_parses_by_type() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = store(&temp_dir);

        set(&mut settings, "AutoPrint", "yes", true).unwrap();

        let auto_print = find_descriptor("AutoPrint").unwrap();
        assert_eq!(settings.read(auto_print).unwrap(), Some(SettingValue::Bool(true)));
    }

    #[test]
    fn test_set_rejects_bad_value_and_unknown_key() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = store(&temp_dir);

        let bad = set(&mut settings, "PrintCopies", "two", true);
        assert_eq!(bad.unwrap_err().error_code().as_str(), "INVALID_VALUE");

        let unknown = set(&mut settings, "AdminPin", "1234", true);
        assert!(matches!(unknown, Err(Error::SettingNotFound { .. })));
        assert!(settings.is_empty());
    }

    #[test]
    fn test_output_of_unset_nullable_is_null() {
        let temp_dir = TempDir::new().unwrap();
        let settings = store(&temp_dir);
        let printer = output(&settings, descriptor("PrinterName").unwrap()).unwrap();
        assert!(printer.value.is_null());
    }
}
