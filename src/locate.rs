//! Pairing of incoming log files with their reference counterparts.
//!
//! Both trees share the layout produced by conversion:
//!
//! ```text
//! <root>/<Channels|Queries>/<conversation>/<YYYY-MM-DD>.txt
//! ```
//!
//! A file pairs with the file at the same relative path under the other
//! root. Only files exactly three levels below the incoming root are
//! considered.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{LogError, Result};

/// Depth of log files below a tree root.
pub const LOG_DEPTH: usize = 3;

/// Extension of converted log files.
pub const LOG_EXTENSION: &str = "txt";

/// One incoming file and where its reference counterpart lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePair {
    /// `<reference root>/<relative>`; may not exist for incoming-only files.
    pub reference: PathBuf,
    /// `<incoming root>/<relative>`
    pub incoming: PathBuf,
    /// `<kind>/<conversation>/<date>.txt`
    pub relative: PathBuf,
}

/// Result of [`TranscriptLocator::locate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Located {
    /// Incoming files whose reference counterpart exists.
    pub pairs: Vec<FilePair>,
    /// Incoming files without a reference counterpart.
    pub incoming_only: Vec<FilePair>,
}

/// Walks an incoming tree and pairs its files with a reference tree.
///
/// # Example
///
/// ```rust,no_run
/// use colloquy_logs::locate::TranscriptLocator;
///
/// let located = TranscriptLocator::new("logs", "laptop-logs").locate()?;
/// for pair in &located.pairs {
///     println!("{}", pair.relative.display());
/// }
/// # Ok::<(), colloquy_logs::error::LogError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TranscriptLocator {
    reference_root: PathBuf,
    incoming_root: PathBuf,
}

impl TranscriptLocator {
    pub fn new(reference_root: impl Into<PathBuf>, incoming_root: impl Into<PathBuf>) -> Self {
        Self {
            reference_root: reference_root.into(),
            incoming_root: incoming_root.into(),
        }
    }

    pub fn reference_root(&self) -> &Path {
        &self.reference_root
    }

    pub fn incoming_root(&self) -> &Path {
        &self.incoming_root
    }

    /// Path under the reference root that corresponds to `relative`.
    pub fn counterpart(&self, relative: &Path) -> PathBuf {
        self.reference_root.join(relative)
    }

    /// Lists every incoming log file, sorted by path, split by whether a
    /// reference counterpart exists.
    ///
    /// # Errors
    ///
    /// [`LogError::MissingDirectory`] if either root is not a directory,
    /// or a walk error if the incoming tree cannot be read.
    pub fn locate(&self) -> Result<Located> {
        for root in [&self.reference_root, &self.incoming_root] {
            if !root.is_dir() {
                return Err(LogError::missing_directory(root));
            }
        }

        let mut located = Located::default();
        let walker = WalkDir::new(&self.incoming_root)
            .min_depth(LOG_DEPTH)
            .max_depth(LOG_DEPTH)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || !has_log_extension(path) {
                trace!(path = %path.display(), "skipping non-log entry");
                continue;
            }

            let Ok(relative) = path.strip_prefix(&self.incoming_root) else {
                continue;
            };
            let pair = FilePair {
                reference: self.counterpart(relative),
                incoming: path.to_path_buf(),
                relative: relative.to_path_buf(),
            };

            if pair.reference.is_file() {
                located.pairs.push(pair);
            } else {
                located.incoming_only.push(pair);
            }
        }

        debug!(
            pairs = located.pairs.len(),
            incoming_only = located.incoming_only.len(),
            "located log files"
        );
        Ok(located)
    }
}

fn has_log_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == LOG_EXTENSION)
}
