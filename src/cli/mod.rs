//! CLI definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::sync::{ConflictPolicy, ItemKind};

pub mod commands;

/// boothsync - keep photobooth kiosks in step through a shared folder
#[derive(Parser, Debug)]
#[command(name = "boothsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Home directory (default: ~/.boothsync)
    #[arg(long, global = true, env = "BOOTHSYNC_HOME")]
    pub home: Option<PathBuf>,

    /// Remote directory, overriding config.json
    #[arg(long, global = true, env = "BOOTHSYNC_REMOTE")]
    pub remote: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the home directory
    Init {
        /// Shared directory to sync through
        #[arg(long)]
        remote_dir: Option<PathBuf>,

        /// Template folder (default: <home>/templates)
        #[arg(long)]
        template_dir: Option<PathBuf>,

        /// Live settings file (default: <home>/settings.json)
        #[arg(long)]
        settings_path: Option<PathBuf>,

        /// Conflict policy (newest, local, remote)
        #[arg(long)]
        policy: Option<ConflictPolicy>,

        /// Overwrite an existing config.json
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Show this installation's device id
    Device,

    /// Synchronize with the remote
    Sync {
        /// Item kind to sync (default: all)
        #[arg(value_enum)]
        kind: Option<KindArg>,
    },

    /// Show what the next sync would do
    Status {
        /// Item kind to check (default: all)
        #[arg(value_enum)]
        kind: Option<KindArg>,
    },

    /// Inspect and maintain local manifests
    Manifest {
        #[command(subcommand)]
        command: ManifestCommands,
    },

    /// Read and edit syncable settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Item kind on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    Settings,
    Templates,
}

impl From<KindArg> for ItemKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Settings => Self::Settings,
            KindArg::Templates => Self::Templates,
        }
    }
}

/// Kinds selected by an optional argument; all of them when absent.
#[must_use]
pub fn selected_kinds(kind: Option<KindArg>) -> Vec<ItemKind> {
    kind.map_or_else(|| ItemKind::ALL.to_vec(), |k| vec![k.into()])
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Manifest Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ManifestCommands {
    /// List manifest entries
    Show {
        #[arg(value_enum)]
        kind: KindArg,
    },

    /// Write the manifest, tagged with this device, to a file
    Export {
        #[arg(value_enum)]
        kind: KindArg,

        /// Destination file
        output: PathBuf,
    },

    /// Include an item in future syncs
    Enable {
        #[arg(value_enum)]
        kind: KindArg,

        /// Item id
        id: String,
    },

    /// Exclude an item from future uploads
    Disable {
        #[arg(value_enum)]
        kind: KindArg,

        /// Item id
        id: String,
    },

    /// Rescan local items and rewrite the manifest
    Rebuild {
        /// Item kind (default: all)
        #[arg(value_enum)]
        kind: Option<KindArg>,
    },
}

// ============================================================================
// Settings Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// List syncable settings and their current values
    List,

    /// Show one setting
    Get {
        /// Setting key
        key: String,
    },

    /// Change one setting
    Set {
        /// Setting key
        key: String,

        /// New value, parsed as the setting's type
        value: String,
    },
}
