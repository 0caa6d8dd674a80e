//! Conversion of Colloquy transcripts into per-day text logs.
//!
//! A Colloquy transcript folder looks like:
//!
//! ```text
//! <source>/#rust 01-15-24.colloquyTranscript          channel
//! <source>/irc.freenode.net/bob 01-15-24.colloquyTranscript   query
//! ```
//!
//! [`Converter::run`] writes one normalized log per transcript under
//! `<source>/converted/`, laid out the way the merge expects:
//!
//! ```text
//! <source>/converted/Channels/#rust/2024-01-15.txt
//! <source>/converted/Queries/bob/2024-01-15.txt
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use colloquy_logs::config::ConvertConfig;
//! use colloquy_logs::convert::Converter;
//!
//! let report = Converter::new(ConvertConfig::default()).run("Colloquy Transcripts".as_ref())?;
//! println!("{} logs written", report.converted.len());
//! # Ok::<(), colloquy_logs::error::LogError>(())
//! ```

pub mod naming;
pub mod transcript;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{ConvertConfig, ParseMode};
use crate::error::{LogError, Result};
use crate::output::AtomicFile;

pub use naming::{TranscriptKind, TranscriptName, transcript_target};
pub use transcript::{Entry, Envelope, EnvelopeMessage, Event, Transcript, parse_transcript};

/// A transcript found by [`Converter::discover`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptFile {
    pub path: PathBuf,
    pub kind: TranscriptKind,
}

/// One converted transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedTranscript {
    pub source: PathBuf,
    pub target: PathBuf,
    pub kind: TranscriptKind,
    /// Lines written to `target`.
    pub lines: usize,
    /// Entries skipped in lenient mode.
    pub skipped: usize,
}

/// A transcript that could not be converted in lenient mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTranscript {
    pub source: PathBuf,
    pub reason: String,
}

/// Summary of a [`Converter::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvertReport {
    /// Root of the written tree.
    pub converted_root: PathBuf,
    pub converted: Vec<ConvertedTranscript>,
    pub failed: Vec<FailedTranscript>,
}

impl ConvertReport {
    pub fn total_lines(&self) -> usize {
        self.converted.iter().map(|c| c.lines).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.converted.iter().map(|c| c.skipped).sum()
    }
}

/// Converts a folder of Colloquy transcripts.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConvertConfig,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// `<source>/<output_dir_name>`
    pub fn converted_root(&self, source: &Path) -> PathBuf {
        source.join(&self.config.output_dir_name)
    }

    /// Lists channel transcripts directly in `source` and query transcripts
    /// in its network sub-directory, each group sorted by file name.
    pub fn discover(&self, source: &Path) -> Result<Vec<TranscriptFile>> {
        if !source.is_dir() {
            return Err(LogError::missing_directory(source));
        }

        let mut found: Vec<TranscriptFile> = list_transcripts(source)?
            .into_iter()
            .map(|path| TranscriptFile {
                path,
                kind: TranscriptKind::Channel,
            })
            .collect();

        let network = source.join(&self.config.network);
        if network.is_dir() {
            found.extend(list_transcripts(&network)?.into_iter().map(|path| TranscriptFile {
                path,
                kind: TranscriptKind::Query,
            }));
        } else {
            debug!(network = %network.display(), "no query transcripts");
        }

        Ok(found)
    }

    /// Converts one transcript into its log under `converted_root`,
    /// replacing any previous conversion.
    pub fn convert_file(
        &self,
        transcript: &Path,
        kind: TranscriptKind,
        converted_root: &Path,
    ) -> Result<ConvertedTranscript> {
        let stem = transcript
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = TranscriptName::parse(&stem, self.config.century_base)?;
        let target = transcript_target(converted_root, kind, &name);

        let xml = fs::read_to_string(transcript).map_err(|e| LogError::fs(transcript, e))?;
        let parsed = transcript::parse_transcript_at(&xml, self.config.parse_mode, transcript)?;
        let lines = parsed.lines();

        let mut out = AtomicFile::create(&target)?;
        for line in &lines {
            writeln!(out, "{line}").map_err(|e| LogError::fs(&target, e))?;
        }
        out.commit(None)?;

        debug!(
            source = %transcript.display(),
            target = %target.display(),
            lines = lines.len(),
            "converted transcript"
        );
        Ok(ConvertedTranscript {
            source: transcript.to_path_buf(),
            target,
            kind,
            lines: lines.len(),
            skipped: parsed.skipped,
        })
    }

    /// Converts every discovered transcript under `source`.
    ///
    /// Filesystem errors abort the run. In lenient mode a transcript with a
    /// bad name or malformed XML is reported in
    /// [`ConvertReport::failed`] and the run continues; in strict mode it
    /// aborts the run.
    pub fn run(&self, source: &Path) -> Result<ConvertReport> {
        let transcripts = self.discover(source)?;
        let converted_root = self.converted_root(source);
        fs::create_dir_all(&converted_root).map_err(|e| LogError::fs(&converted_root, e))?;
        info!(
            transcripts = transcripts.len(),
            target = %converted_root.display(),
            "converting transcripts"
        );

        let mut report = ConvertReport {
            converted_root: converted_root.clone(),
            ..ConvertReport::default()
        };

        for file in &transcripts {
            match self.convert_file(&file.path, file.kind, &converted_root) {
                Ok(converted) => report.converted.push(converted),
                Err(e) if e.is_filesystem() || self.config.parse_mode == ParseMode::Strict => {
                    return Err(e);
                }
                Err(e) => {
                    warn!(source = %file.path.display(), error = %e, "skipping transcript");
                    report.failed.push(FailedTranscript {
                        source: file.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

fn list_transcripts(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && naming::is_transcript(path) {
            paths.push(path.to_path_buf());
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CHANNEL: &str = r#"<log>
  <envelope>
    <sender>alice</sender>
    <message received="2024-01-15 10:30:45 -0800">hi all</message>
  </envelope>
</log>"#;

    #[test]
    fn test_discover_channels_and_queries() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("#rust 01-15-24.colloquyTranscript"), CHANNEL).unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir_all(dir.path().join("irc.freenode.net")).unwrap();
        fs::write(
            dir.path().join("irc.freenode.net/bob 01-15-24.colloquyTranscript"),
            CHANNEL,
        )
        .unwrap();

        let found = Converter::default().discover(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, TranscriptKind::Channel);
        assert_eq!(found[1].kind, TranscriptKind::Query);
    }

    #[test]
    fn test_convert_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("#rust 01-15-24.colloquyTranscript");
        fs::write(&source, CHANNEL).unwrap();

        let converter = Converter::new(ConvertConfig::default());
        let root = converter.converted_root(dir.path());
        let converted = converter
            .convert_file(&source, TranscriptKind::Channel, &root)
            .unwrap();

        assert_eq!(converted.target, root.join("Channels/#rust/2024-01-15.txt"));
        assert_eq!(converted.lines, 1);
        assert_eq!(
            fs::read_to_string(&converted.target).unwrap(),
            "[01/15/2024 -:- 10:30:45 AM] alice: hi all\n"
        );
    }

    #[test]
    fn test_run_lenient_reports_bad_names() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("#rust 01-15-24.colloquyTranscript"), CHANNEL).unwrap();
        fs::write(dir.path().join("undated.colloquyTranscript"), CHANNEL).unwrap();

        let report = Converter::default().run(dir.path()).unwrap();
        assert_eq!(report.converted.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.total_lines(), 1);
    }

    #[test]
    fn test_run_strict_fails_on_bad_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("undated.colloquyTranscript"), CHANNEL).unwrap();

        let converter = Converter::new(ConvertConfig::new().with_parse_mode(ParseMode::Strict));
        let err = converter.run(dir.path()).unwrap_err();
        assert!(matches!(err, LogError::TranscriptName { .. }));
    }

    #[test]
    fn test_run_missing_source() {
        let dir = tempdir().unwrap();
        let err = Converter::default().run(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, LogError::MissingDirectory { .. }));
    }
}
