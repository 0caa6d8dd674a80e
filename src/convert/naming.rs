//! Transcript file names and the paths of their converted logs.
//!
//! Colloquy names a transcript `<conversation> <MM-DD-YY>.colloquyTranscript`.
//! The converted log lives at
//! `<converted root>/<Channels|Queries>/<conversation>/<YYYY-MM-DD>.txt`.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};

/// Extension of raw Colloquy transcripts.
pub const TRANSCRIPT_EXTENSION: &str = "colloquyTranscript";

/// Whether a transcript records a channel or a private conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    Channel,
    Query,
}

impl TranscriptKind {
    /// Directory grouping this kind of conversation in a log tree.
    pub fn directory(self) -> &'static str {
        match self {
            TranscriptKind::Channel => "Channels",
            TranscriptKind::Query => "Queries",
        }
    }
}

impl fmt::Display for TranscriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptKind::Channel => write!(f, "channel"),
            TranscriptKind::Query => write!(f, "query"),
        }
    }
}

/// The conversation and day encoded in a transcript file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptName {
    pub conversation: String,
    pub date: NaiveDate,
}

impl TranscriptName {
    /// Parses a file stem such as `#rust 01-15-24`.
    ///
    /// The date is the last space-separated word, so conversation names may
    /// themselves contain spaces. Two-digit years are added to
    /// `century_base`; longer years are used as written.
    pub fn parse(stem: &str, century_base: i32) -> Result<Self> {
        let invalid = || LogError::transcript_name(stem);

        let (conversation, date) = stem.rsplit_once(' ').ok_or_else(invalid)?;
        let conversation = conversation.trim();
        if conversation.is_empty() {
            return Err(invalid());
        }

        let mut parts = date.split('-');
        let (Some(month), Some(day), Some(year), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let month: u32 = month.parse().map_err(|_| invalid())?;
        let day: u32 = day.parse().map_err(|_| invalid())?;
        let year = expand_year(year, century_base).ok_or_else(invalid)?;

        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
        Ok(Self {
            conversation: conversation.to_string(),
            date,
        })
    }

    /// `YYYY-MM-DD.txt`
    pub fn file_name(&self) -> String {
        format!("{}.txt", self.date.format("%Y-%m-%d"))
    }
}

fn expand_year(year: &str, century_base: i32) -> Option<i32> {
    if year.is_empty() || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i32 = year.parse().ok()?;
    if year.len() <= 2 {
        century_base.checked_add(value)
    } else {
        Some(value)
    }
}

/// Where the converted log of a transcript goes.
pub fn transcript_target(converted_root: &Path, kind: TranscriptKind, name: &TranscriptName) -> PathBuf {
    converted_root
        .join(kind.directory())
        .join(&name.conversation)
        .join(name.file_name())
}

/// Returns `true` for `*.colloquyTranscript` paths.
pub fn is_transcript(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TRANSCRIPT_EXTENSION)
}
