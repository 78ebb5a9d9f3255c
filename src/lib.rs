//! boothsync - manifest-based sync for photobooth kiosks
//!
//! Kiosks running the same booth software keep their syncable settings and
//! template files consistent through a shared remote folder. Each side keeps a
//! manifest of content hashes; a sync compares manifests and moves only what
//! differs, settling conflicts by last writer wins.
//!
//! # Architecture
//!
//! - [`sync`] - Generic reconciliation core (hash, manifest, diff, resolve, apply)
//! - [`settings`] - Configuration item kind (typed allow-listed keys)
//! - [`templates`] - Template item kind (files under a folder)
//! - [`service`] - Wiring of config, item kinds and the remote
//! - [`config`] - Home directory and `config.json`
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod service;
pub mod settings;
pub mod sync;
pub mod templates;

pub use error::{Error, Result};
