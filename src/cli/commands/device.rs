//! Device command implementation.

use crate::config::{load_device_id, resolve_home};
use crate::error::{Error, Result};
use std::path::Path;

/// Print this installation's device id.
///
/// # Errors
///
/// Returns [`Error::NotInitialized`] before `init` has created the id.
pub fn execute(home: Option<&Path>, json: bool) -> Result<()> {
    let home = resolve_home(home)?;
    let device_id = load_device_id(&home)?.ok_or(Error::NotInitialized)?;

    if json {
        let output = serde_json::json!({
            "device_id": device_id,
            "home": home.root(),
        });
        println!("{output}");
    } else {
        println!("{device_id}");
    }
    Ok(())
}
