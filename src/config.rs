//! Configuration types for merging and conversion.
//!
//! This module provides plain configuration structs for library usage,
//! without any CLI framework dependencies.
//!
//! - [`MergeConfig`] - how two log trees are merged
//! - [`ConvertConfig`] - how Colloquy transcripts are converted
//!
//! # Example
//!
//! ```rust
//! use colloquy_logs::config::{IncomingOnlyPolicy, MergeConfig, UnparsedPolicy};
//!
//! let config = MergeConfig::new()
//!     .with_unparsed_policy(UnparsedPolicy::Fail)
//!     .with_incoming_only(IncomingOnlyPolicy::Copy)
//!     .with_backup(false);
//!
//! assert!(!config.backup);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the merge orders a line whose timestamp cannot be parsed.
///
/// Unparsed lines are either continuation lines without a bracketed prefix,
/// or lines whose bracketed prefix is not a valid date-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnparsedPolicy {
    /// Order unparsed lines before any parseable line so they are written
    /// immediately and the merge proceeds (default).
    #[default]
    FlushEarly,

    /// Abort the merge of the affected pair; the target is left untouched.
    Fail,
}

/// What to do with incoming files that have no reference counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncomingOnlyPolicy {
    /// Leave them alone silently.
    Ignore,

    /// Log and list them in the run report (default).
    #[default]
    Report,

    /// Copy them into the target tree.
    Copy,
}

/// Configuration for merging an incoming log tree into a reference tree.
///
/// By default merged files replace their reference counterparts atomically,
/// and the previous content is kept as a timestamped `.bak` file next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Ordering policy for lines without a usable timestamp.
    pub unparsed: UnparsedPolicy,

    /// Handling of incoming-only files (default: report).
    pub incoming_only: IncomingOnlyPolicy,

    /// Write merged files under this directory instead of replacing the
    /// reference files in place (default: `None`, in place).
    pub output_dir: Option<PathBuf>,

    /// Keep a timestamped copy of every reference file before replacing it
    /// (default: true). Ignored when `output_dir` is set.
    pub backup: bool,

    /// Merge independent file pairs in parallel (default: false).
    pub parallel: bool,

    /// Read buffer size per input file (default: 64KB)
    pub buffer_size: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            unparsed: UnparsedPolicy::default(),
            incoming_only: IncomingOnlyPolicy::default(),
            output_dir: None,
            backup: true,
            parallel: false,
            buffer_size: 64 * 1024, // 64KB
        }
    }
}

impl MergeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the policy for lines without a usable timestamp.
    #[must_use]
    pub fn with_unparsed_policy(mut self, policy: UnparsedPolicy) -> Self {
        self.unparsed = policy;
        self
    }

    /// Sets the policy for incoming-only files.
    #[must_use]
    pub fn with_incoming_only(mut self, policy: IncomingOnlyPolicy) -> Self {
        self.incoming_only = policy;
        self
    }

    /// Writes merged files into a separate tree rooted at `dir`.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Enables or disables backups of replaced reference files.
    #[must_use]
    pub fn with_backup(mut self, enabled: bool) -> Self {
        self.backup = enabled;
        self
    }

    /// Enables or disables parallel merging across file pairs.
    #[must_use]
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Sets the read buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Returns `true` when reference files are replaced in place.
    pub fn is_in_place(&self) -> bool {
        self.output_dir.is_none()
    }
}

/// Strictness of transcript parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Skip unrecognized or incomplete entries with a warning (default).
    #[default]
    Lenient,

    /// Fail the transcript on the first unrecognized or incomplete entry.
    Strict,
}

/// Configuration for converting Colloquy transcripts.
///
/// # Example
///
/// ```rust
/// use colloquy_logs::config::{ConvertConfig, ParseMode};
///
/// let config = ConvertConfig::new()
///     .with_network("irc.libera.chat")
///     .with_century_base(1900)
///     .with_parse_mode(ParseMode::Strict);
///
/// assert_eq!(config.century_base, 1900);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Sub-directory holding private conversations (default: `irc.freenode.net`)
    pub network: String,

    /// Added to two-digit years in transcript names (default: 2000)
    pub century_base: i32,

    /// Transcript parsing strictness (default: lenient)
    pub parse_mode: ParseMode,

    /// Name of the output directory created inside the source (default: `converted`)
    pub output_dir_name: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            network: "irc.freenode.net".to_string(),
            century_base: 2000,
            parse_mode: ParseMode::default(),
            output_dir_name: "converted".to_string(),
        }
    }
}

impl ConvertConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the network directory that holds private conversations.
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Sets the century added to two-digit years.
    #[must_use]
    pub fn with_century_base(mut self, base: i32) -> Self {
        self.century_base = base;
        self
    }

    /// Sets the transcript parsing strictness.
    #[must_use]
    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    /// Sets the output directory name.
    #[must_use]
    pub fn with_output_dir_name(mut self, name: impl Into<String>) -> Self {
        self.output_dir_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_config_default() {
        let config = MergeConfig::default();
        assert_eq!(config.unparsed, UnparsedPolicy::FlushEarly);
        assert_eq!(config.incoming_only, IncomingOnlyPolicy::Report);
        assert!(config.output_dir.is_none());
        assert!(config.backup);
        assert!(!config.parallel);
        assert_eq!(config.buffer_size, 64 * 1024);
        assert!(config.is_in_place());
    }

    #[test]
    fn test_merge_config_builder() {
        let config = MergeConfig::new()
            .with_unparsed_policy(UnparsedPolicy::Fail)
            .with_incoming_only(IncomingOnlyPolicy::Copy)
            .with_output_dir("/tmp/merged")
            .with_backup(false)
            .with_parallel(true)
            .with_buffer_size(1024);

        assert_eq!(config.unparsed, UnparsedPolicy::Fail);
        assert_eq!(config.incoming_only, IncomingOnlyPolicy::Copy);
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/merged")));
        assert!(!config.backup);
        assert!(config.parallel);
        assert_eq!(config.buffer_size, 1024);
        assert!(!config.is_in_place());
    }

    #[test]
    fn test_convert_config_default() {
        let config = ConvertConfig::default();
        assert_eq!(config.network, "irc.freenode.net");
        assert_eq!(config.century_base, 2000);
        assert_eq!(config.parse_mode, ParseMode::Lenient);
        assert_eq!(config.output_dir_name, "converted");
    }

    #[test]
    fn test_convert_config_builder() {
        let config = ConvertConfig::new()
            .with_network("irc.libera.chat")
            .with_century_base(1900)
            .with_parse_mode(ParseMode::Strict)
            .with_output_dir_name("textual");

        assert_eq!(config.network, "irc.libera.chat");
        assert_eq!(config.century_base, 1900);
        assert_eq!(config.parse_mode, ParseMode::Strict);
        assert_eq!(config.output_dir_name, "textual");
    }

    #[test]
    fn test_policy_serde() {
        let json = serde_json::to_string(&UnparsedPolicy::FlushEarly).unwrap();
        assert_eq!(json, "\"flush-early\"");

        let parsed: IncomingOnlyPolicy = serde_json::from_str("\"copy\"").unwrap();
        assert_eq!(parsed, IncomingOnlyPolicy::Copy);

        let parsed: ParseMode = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(parsed, ParseMode::Strict);
    }

    #[test]
    fn test_merge_config_serde_roundtrip() {
        let config = MergeConfig::new().with_output_dir("out").with_parallel(true);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: MergeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
