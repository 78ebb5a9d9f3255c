//! Command implementations.

pub mod completions;
pub mod device;
pub mod init;
pub mod manifest;
pub mod settings;
pub mod status;
pub mod sync;
pub mod version;

use crate::error::{Error, Result};

/// Runtime for commands that drive the async sync core.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}
