//! # colloquy-logs
//!
//! A Rust library for turning Colloquy IRC transcripts into plain-text logs
//! and merging two collections of such logs into one.
//!
//! ## Overview
//!
//! Colloquy keeps one XML transcript per conversation and day. Collected on
//! several machines, the same conversation ends up recorded twice with
//! slightly different timestamps. colloquy-logs:
//!
//! - **converts** every transcript into a normalized text log, one line per
//!   message or event, laid out as
//!   `<root>/<Channels|Queries>/<conversation>/<YYYY-MM-DD>.txt`
//! - **merges** an incoming log tree into a reference tree, file by file,
//!   keeping timestamp order, writing every distinct line once, and never
//!   leaving a half-written file behind.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use colloquy_logs::prelude::*;
//!
//! fn main() -> Result<()> {
//!     // Convert raw transcripts into <source>/converted/
//!     let converter = Converter::new(ConvertConfig::default());
//!     converter.run("Colloquy Transcripts".as_ref())?;
//!
//!     // Fold the laptop's logs into the main archive
//!     let report = merge_trees(
//!         "archive".as_ref(),
//!         "Colloquy Transcripts/converted".as_ref(),
//!         &MergeConfig::new(),
//!     )?;
//!     println!("{} lines added", report.totals().added());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Merging Two Files
//!
//! ```rust
//! use colloquy_logs::prelude::*;
//!
//! let engine = MergeEngine::new(UnparsedPolicy::FlushEarly);
//! let merged = engine.merge_lines(
//!     &["[01/15/2024 -:- 10:00:00 AM] alice: hi"],
//!     &["[01/15/2024 -:- 10:00:02 AM] alice: hi", "[01/15/2024 -:- 10:01:00 AM] bob: hey"],
//! )?;
//!
//! assert_eq!(merged.len(), 2);
//! # Ok::<(), colloquy_logs::LogError>(())
//! ```
//!
//! ## Module Structure
//!
//! - [`line`] - Log line parsing and rendering ([`LineParser`](line::LineParser), [`LogLine`](line::LogLine))
//! - [`merge`] - The merge itself
//!   - [`merge::cursor`] - [`LineReader`](merge::LineReader), [`DualCursor`](merge::DualCursor)
//!   - [`merge::engine`] - [`MergeEngine`](merge::MergeEngine), [`MergeStats`](merge::MergeStats)
//!   - [`merge::tree`] - [`merge_trees`](merge::merge_trees), [`MergeReport`](merge::MergeReport)
//! - [`locate`] - Pairing incoming files with reference files
//! - [`output`] - Atomic file replacement and backups
//! - `convert` - Colloquy transcript conversion (feature `convert`)
//! - [`config`] - [`MergeConfig`](config::MergeConfig), [`ConvertConfig`](config::ConvertConfig)
//! - `cli` - CLI types (feature `cli`)
//! - [`error`] - Unified error types ([`LogError`], [`Result`])
//! - [`prelude`] - Convenient re-exports

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
#[cfg(feature = "convert")]
pub mod convert;
pub mod error;
pub mod line;
pub mod locate;
pub mod merge;
pub mod output;

// Re-export the main types at the crate root for convenience
pub use error::{LogError, Result};

/// Convenient re-exports for common usage.
///
/// Import everything you need with a single line:
///
/// ```rust
/// use colloquy_logs::prelude::*;
/// ```
pub mod prelude {
    // Error types
    pub use crate::error::{LogError, Result};

    // Configuration
    pub use crate::config::{IncomingOnlyPolicy, MergeConfig, UnparsedPolicy};

    // Lines
    pub use crate::line::{LineParser, LogLine};

    // Merging
    pub use crate::locate::{FilePair, TranscriptLocator};
    pub use crate::merge::{MergeEngine, MergeReport, MergeStats, merge_trees};

    // Conversion
    #[cfg(feature = "convert")]
    pub use crate::config::{ConvertConfig, ParseMode};
    #[cfg(feature = "convert")]
    pub use crate::convert::{ConvertReport, Converter};
}
