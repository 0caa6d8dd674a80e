//! Command-line interface definition using clap.
//!
//! This module defines:
//! - [`Args`] - CLI argument structure (for use with clap)
//! - [`Command`] - the `convert` and `merge` subcommands
//! - [`IncomingOnly`] - handling of incoming files without a counterpart
//!
//! Each subcommand's arguments convert into the plain library
//! configuration types:
//!
//! ```rust
//! use clap::Parser;
//! use colloquy_logs::cli::{Args, Command};
//!
//! let args = Args::parse_from(["colloquy-logs", "merge", "logs", "laptop", "--no-backup"]);
//! let Command::Merge(merge) = args.command else { unreachable!() };
//!
//! assert!(!merge.to_config().backup);
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::{ConvertConfig, IncomingOnlyPolicy, MergeConfig, ParseMode, UnparsedPolicy};

/// Convert Colloquy chat transcripts to plain-text logs, and merge two
/// sets of logs without losing or duplicating messages.
#[derive(Parser, Debug, Clone)]
#[command(name = "colloquy-logs")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    colloquy-logs convert ~/Documents/Colloquy\\ Transcripts
    colloquy-logs merge ~/logs ~/laptop/converted
    colloquy-logs merge ~/logs ~/laptop/converted -o ~/merged
    colloquy-logs merge ~/logs ~/laptop/converted --incoming-only copy")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Show debug output on stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only report errors on stderr
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Args {
    /// Log level directive for the tracing subscriber.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Convert Colloquy transcripts into per-day text logs
    Convert(ConvertArgs),

    /// Merge an incoming log tree into a reference log tree
    Merge(MergeArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Folder holding *.colloquyTranscript files
    pub source: PathBuf,

    /// Sub-folder holding private conversations
    #[arg(long, default_value = "irc.freenode.net")]
    pub network: String,

    /// Century added to two-digit years in transcript names
    #[arg(long, default_value_t = 2000)]
    pub century: i32,

    /// Fail on the first unrecognized or incomplete transcript entry
    #[arg(long)]
    pub strict: bool,
}

impl ConvertArgs {
    pub fn to_config(&self) -> ConvertConfig {
        let mode = if self.strict {
            ParseMode::Strict
        } else {
            ParseMode::Lenient
        };
        ConvertConfig::new()
            .with_network(self.network.clone())
            .with_century_base(self.century)
            .with_parse_mode(mode)
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct MergeArgs {
    /// Log tree to merge into (replaced in place unless -o is given)
    pub reference: PathBuf,

    /// Log tree to merge from (never modified)
    pub incoming: PathBuf,

    /// Write merged logs under this folder instead of replacing reference files
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Do not keep a .bak copy of replaced reference files
    #[arg(long)]
    pub no_backup: bool,

    /// Abort when a line without a timestamp has to be ordered
    #[arg(long)]
    pub fail_on_unparsed: bool,

    /// What to do with incoming logs that have no reference counterpart
    #[arg(long, value_enum, default_value = "report")]
    pub incoming_only: IncomingOnly,

    /// Merge files on all CPU cores (needs the `parallel` feature)
    #[arg(long)]
    pub parallel: bool,
}

impl MergeArgs {
    pub fn to_config(&self) -> MergeConfig {
        let unparsed = if self.fail_on_unparsed {
            UnparsedPolicy::Fail
        } else {
            UnparsedPolicy::FlushEarly
        };
        let mut config = MergeConfig::new()
            .with_unparsed_policy(unparsed)
            .with_incoming_only(self.incoming_only.into())
            .with_backup(!self.no_backup)
            .with_parallel(self.parallel);
        if let Some(dir) = &self.output {
            config = config.with_output_dir(dir.clone());
        }
        config
    }
}

/// Handling of incoming logs without a reference counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomingOnly {
    /// Leave them out silently
    Ignore,

    /// List them in the summary (default)
    #[default]
    Report,

    /// Copy them into the target tree
    Copy,
}

impl std::fmt::Display for IncomingOnly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncomingOnly::Ignore => write!(f, "ignore"),
            IncomingOnly::Report => write!(f, "report"),
            IncomingOnly::Copy => write!(f, "copy"),
        }
    }
}

// Conversion to library policy type
impl From<IncomingOnly> for IncomingOnlyPolicy {
    fn from(policy: IncomingOnly) -> IncomingOnlyPolicy {
        match policy {
            IncomingOnly::Ignore => IncomingOnlyPolicy::Ignore,
            IncomingOnly::Report => IncomingOnlyPolicy::Report,
            IncomingOnly::Copy => IncomingOnlyPolicy::Copy,
        }
    }
}
