//! Device identity.
//!
//! Every installation gets a random identifier on first use. It tags the
//! manifests this device writes to the remote so their origin is visible.

use std::fs;

use tracing::info;
use uuid::Uuid;

use crate::config::BoothHome;
use crate::error::Result;
use crate::sync::file::atomic_write;

/// Read the device id, if one has been created.
///
/// # Errors
///
/// Returns an error if the id file exists but cannot be read.
pub fn load_device_id(home: &BoothHome) -> Result<Option<String>> {
    let path = home.device_id_path();
    if !path.exists() {
        return Ok(None);
    }
    let id = fs::read_to_string(&path)?.trim().to_string();
    Ok((!id.is_empty()).then_some(id))
}

/// Read the device id, creating it on first use.
///
/// # Errors
///
/// Returns an error if the id file cannot be read or written.
pub fn load_or_create_device_id(home: &BoothHome) -> Result<String> {
    if let Some(id) = load_device_id(home)? {
        return Ok(id);
    }
    let id = Uuid::new_v4().to_string();
    atomic_write(&home.device_id_path(), format!("{id}\n").as_bytes())?;
    info!(device_id = %id, "Generated device id");
    Ok(id)
}
