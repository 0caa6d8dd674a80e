//! Streaming line sources and the two-sided cursor the merge walks.
//!
//! - [`LineReader`] reads a log file line by line through a [`BufRead`],
//!   numbering and classifying each line.
//! - [`Cursor`] holds at most one pending line pulled lazily from any line
//!   source, and notices timestamp regressions as lines go by.
//! - [`DualCursor`] pairs a reference cursor with an incoming cursor.
//!
//! Every source is consumed front to back exactly once.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::{LogError, Result};
use crate::line::{LineParser, LogLine};

/// Smallest read buffer [`LineReader::open`] will use.
pub const MIN_BUFFER_SIZE: usize = 1024;

/// Which input of a merge a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The file being replaced.
    Reference,
    /// The file being merged in.
    Incoming,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Reference => write!(f, "reference"),
            Side::Incoming => write!(f, "incoming"),
        }
    }
}

/// Iterator over the lines of one log, with progress tracking.
pub struct LineReader<R: BufRead> {
    reader: R,
    parser: LineParser,
    buffer: String,
    line_number: usize,
    bytes_read: u64,
    total_bytes: Option<u64>,
    path: Option<PathBuf>,
}

impl LineReader<BufReader<File>> {
    /// Opens `path` for reading with a buffer of `buffer_size` bytes,
    /// raised to [`MIN_BUFFER_SIZE`] when smaller.
    pub fn open(path: &Path, buffer_size: usize) -> Result<Self> {
        let file = File::open(path).map_err(|e| LogError::fs(path, e))?;
        let total_bytes = file.metadata().map_err(|e| LogError::fs(path, e))?.len();

        let capacity = buffer_size.max(MIN_BUFFER_SIZE);
        let mut reader = Self::new(BufReader::with_capacity(capacity, file));
        reader.total_bytes = Some(total_bytes);
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: LineParser::new(),
            buffer: String::with_capacity(512),
            line_number: 0,
            bytes_read: 0,
            total_bytes: None,
            path: None,
        }
    }

    /// The file being read, if opened from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns approximate progress as a percentage (0.0 to 100.0).
    pub fn progress(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) | None => None,
            Some(total) => Some((self.bytes_read as f64 / total as f64) * 100.0),
        }
    }

    pub fn bytes_processed(&self) -> u64 {
        self.bytes_read
    }

    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = Result<LogLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        match self.reader.read_line(&mut self.buffer) {
            Ok(0) => None,
            Ok(bytes) => {
                self.bytes_read += bytes as u64;
                self.line_number += 1;
                Some(Ok(self.parser.parse_line(&self.buffer, self.line_number)))
            }
            Err(e) => Some(Err(match &self.path {
                Some(path) => LogError::fs(path, e),
                None => LogError::Io(e),
            })),
        }
    }
}

/// One-line lookahead over a line source.
pub struct Cursor<I> {
    source: I,
    pending: Option<LogLine>,
    exhausted: bool,
    consumed: usize,
    unparsed: usize,
    regressions: usize,
    last_timestamp: Option<NaiveDateTime>,
}

impl<I> Cursor<I>
where
    I: Iterator<Item = Result<LogLine>>,
{
    pub fn new(source: I) -> Self {
        Self {
            source,
            pending: None,
            exhausted: false,
            consumed: 0,
            unparsed: 0,
            regressions: 0,
            last_timestamp: None,
        }
    }

    /// Pulls the next line into the pending slot if it is empty.
    fn fill(&mut self) -> Result<()> {
        if self.pending.is_some() || self.exhausted {
            return Ok(());
        }
        match self.source.next() {
            Some(line) => {
                let line = line?;
                self.observe(&line);
                self.pending = Some(line);
            }
            None => self.exhausted = true,
        }
        Ok(())
    }

    fn observe(&mut self, line: &LogLine) {
        let Some(timestamp) = line.timestamp() else {
            self.unparsed += 1;
            return;
        };
        if let Some(last) = self.last_timestamp {
            if timestamp < last {
                self.regressions += 1;
                debug!(
                    line = line.number(),
                    %timestamp,
                    previous = %last,
                    "timestamp goes backwards"
                );
            }
        }
        self.last_timestamp = Some(timestamp);
    }

    /// Returns the pending line, pulling one if needed; `None` at the end.
    pub fn peek(&mut self) -> Result<Option<&LogLine>> {
        self.fill()?;
        Ok(self.pending.as_ref())
    }

    /// Removes and returns the pending line.
    pub fn take(&mut self) -> Result<Option<LogLine>> {
        self.fill()?;
        let line = self.pending.take();
        if line.is_some() {
            self.consumed += 1;
        }
        Ok(line)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.pending.is_none()
    }

    /// Lines taken so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Lines seen without a usable timestamp.
    pub fn unparsed(&self) -> usize {
        self.unparsed
    }

    /// Times a stamped line was earlier than the stamped line before it.
    pub fn regressions(&self) -> usize {
        self.regressions
    }
}

/// Read cursors over the reference and incoming sequences of one merge.
pub struct DualCursor<A, B> {
    reference: Cursor<A>,
    incoming: Cursor<B>,
    reference_path: Option<PathBuf>,
    incoming_path: Option<PathBuf>,
}

impl<A, B> DualCursor<A, B>
where
    A: Iterator<Item = Result<LogLine>>,
    B: Iterator<Item = Result<LogLine>>,
{
    pub fn new(reference: A, incoming: B) -> Self {
        Self {
            reference: Cursor::new(reference),
            incoming: Cursor::new(incoming),
            reference_path: None,
            incoming_path: None,
        }
    }

    /// Records the file paths used in error messages.
    #[must_use]
    pub fn with_paths(mut self, reference: Option<PathBuf>, incoming: Option<PathBuf>) -> Self {
        self.reference_path = reference;
        self.incoming_path = incoming;
        self
    }

    /// Peeks both sides at once: `(reference, incoming)`.
    pub fn peek(&mut self) -> Result<(Option<&LogLine>, Option<&LogLine>)> {
        self.reference.fill()?;
        self.incoming.fill()?;
        Ok((self.reference.pending.as_ref(), self.incoming.pending.as_ref()))
    }

    pub fn take_reference(&mut self) -> Result<Option<LogLine>> {
        self.reference.take()
    }

    pub fn take_incoming(&mut self) -> Result<Option<LogLine>> {
        self.incoming.take()
    }

    pub fn take(&mut self, side: Side) -> Result<Option<LogLine>> {
        match side {
            Side::Reference => self.reference.take(),
            Side::Incoming => self.incoming.take(),
        }
    }

    /// Returns `true` once both sides are fully consumed.
    pub fn is_exhausted(&self) -> bool {
        self.reference.is_exhausted() && self.incoming.is_exhausted()
    }

    pub fn path(&self, side: Side) -> Option<&Path> {
        match side {
            Side::Reference => self.reference_path.as_deref(),
            Side::Incoming => self.incoming_path.as_deref(),
        }
    }

    pub fn reference(&self) -> &Cursor<A> {
        &self.reference
    }

    pub fn incoming(&self) -> &Cursor<B> {
        &self.incoming
    }
}

impl DualCursor<LineReader<BufReader<File>>, LineReader<BufReader<File>>> {
    /// Opens both files for a streaming merge.
    pub fn open(reference: &Path, incoming: &Path, buffer_size: usize) -> Result<Self> {
        Ok(Self::new(
            LineReader::open(reference, buffer_size)?,
            LineReader::open(incoming, buffer_size)?,
        )
        .with_paths(Some(reference.to_path_buf()), Some(incoming.to_path_buf())))
    }
}
