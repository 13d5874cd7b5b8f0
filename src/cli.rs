//! Command-line interface definitions.
//!
//! Defines the argument parser and subcommands using clap's derive API.
//! Every subcommand reads editor state from a snapshot file: scanning for
//! missing references, proposing replacement types, salvaging the fields of
//! missing scripts, or listing what the project index sees.

use clap::{Args as ClapArgs, Parser, Subcommand};
use missing_refs::config::ScanOptions;
use std::path::PathBuf;

/// Detect missing references in serialized scene graphs and suggest replacement types.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Print additional diagnostics to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Event-call checks to switch off. All checks run by default.
#[derive(Debug, Clone, Copy, Default, ClapArgs)]
pub struct ScanSwitches {
    /// Do not flag persisted calls whose target is empty.
    #[arg(long)]
    pub skip_empty_events: bool,

    /// Do not flag persisted calls naming a method the target lacks.
    #[arg(long)]
    pub skip_missing_methods: bool,

    /// Do not flag persisted calls with a target but no method.
    #[arg(long)]
    pub skip_unset_methods: bool,
}

impl From<ScanSwitches> for ScanOptions {
    fn from(switches: ScanSwitches) -> Self {
        Self {
            include_empty_events: !switches.skip_empty_events,
            include_missing_methods: !switches.skip_missing_methods,
            include_unset_methods: !switches.skip_unset_methods,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan every open document and report missing references.
    Scan {
        /// Editor state snapshot (JSON).
        #[arg(short, long)]
        snapshot: PathBuf,

        #[command(flatten)]
        switches: ScanSwitches,

        /// Print the plain-text log instead of the tree.
        #[arg(long, conflicts_with = "json")]
        log: bool,

        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },

    /// Rank loaded types that could replace a vanished one.
    Candidates {
        /// Stored type descriptor, e.g. "Game.Health, Assembly-CSharp".
        descriptor: String,

        /// Editor state snapshot (JSON).
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Project directory searched for source assets.
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Search settings (JSON). Defaults apply to missing fields.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Additional assembly name patterns to skip (e.g., "ThirdParty.*").
        #[arg(long = "exclude-assembly")]
        exclude_assembly: Vec<String>,

        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },

    /// Recover the serialized fields of a component whose script is missing.
    Salvage {
        /// Editor state snapshot (JSON).
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Id of the component.
        #[arg(short, long)]
        object: i64,

        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },

    /// List objects carrying at least one missing script.
    MissingScripts {
        /// Editor state snapshot (JSON).
        #[arg(short, long)]
        snapshot: PathBuf,
    },

    /// Show the class identifier that would be recorded on an object.
    Stamp {
        /// Editor state snapshot (JSON).
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Id of the object to stamp.
        #[arg(short, long)]
        object: i64,
    },

    /// List source files the project index would see.
    Index {
        /// Project directory. Defaults to current directory.
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Glob patterns for directories/files to exclude (e.g., "Library", "*.Generated.cs").
        /// By default, entries starting with `.` or `_` are excluded.
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Disable default exclusion of `.` and `_` prefixed entries.
        #[arg(long)]
        no_default_excludes: bool,

        /// Source file extension, without the dot.
        #[arg(long, default_value = "cs")]
        extension: String,
    },
}
