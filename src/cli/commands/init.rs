//! Initialize a boothsync home directory.
//!
//! Creates `config.json`, the manifest folder, the default template folder
//! and this installation's device id. Nothing is synced.

use crate::config::{SyncConfig, load_or_create_device_id, resolve_home};
use crate::error::{Error, Result};
use crate::sync::ConflictPolicy;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput {
    home: PathBuf,
    device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_dir: Option<PathBuf>,
    template_dir: PathBuf,
    settings_path: PathBuf,
}

/// Options taken from the command line.
#[derive(Debug, Default)]
pub struct InitOptions {
    pub remote_dir: Option<PathBuf>,
    pub template_dir: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
    pub policy: Option<ConflictPolicy>,
    pub force: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the home is already initialized (without `--force`)
/// or a directory or file cannot be created.
pub fn execute(home: Option<&Path>, options: InitOptions, json: bool) -> Result<()> {
    let home = resolve_home(home)?;
    let config_path = home.config_path();

    if config_path.exists() && !options.force {
        return Err(Error::AlreadyInitialized { path: config_path });
    }

    let config = SyncConfig {
        remote_dir: options.remote_dir,
        template_dir: options.template_dir,
        settings_path: options.settings_path,
        policy: options.policy.unwrap_or_default(),
        ..SyncConfig::default()
    };

    fs::create_dir_all(home.root().join("manifests"))?;
    let template_dir = config.template_dir(&home);
    fs::create_dir_all(&template_dir)?;
    config.save(&config_path)?;
    let device_id = load_or_create_device_id(&home)?;

    if json {
        let output = InitOutput {
            home: home.root().to_path_buf(),
            device_id,
            remote_dir: config.remote_dir.clone(),
            template_dir,
            settings_path: config.settings_path(&home),
        };
        let payload = serde_json::to_string(&output)?;
        println!("{payload}");
    } else {
        println!("Initialized boothsync in {}", home.root().display());
        println!("  Device:    {device_id}");
        println!("  Templates: {}", template_dir.display());
        println!("  Settings:  {}", config.settings_path(&home).display());
        match &config.remote_dir {
            Some(remote) => println!("  Remote:    {}", remote.display()),
            None => {
                println!();
                println!("No remote yet. Set \"remote_dir\" in config.json or pass --remote.");
            }
        }
    }

    Ok(())
}
