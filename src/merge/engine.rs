//! The two-pointer merge of a reference log and an incoming log.
//!
//! Both inputs are expected in non-decreasing timestamp order. The engine
//! repeatedly looks at the pending line of each side and decides:
//!
//! 1. Same body (timestamps ignored): write the reference copy once and
//!    advance both sides.
//! 2. Both timestamps parse: write the strictly earlier one; on a tie the
//!    incoming line goes first.
//! 3. Otherwise [`UnparsedPolicy`] decides: an unparsed line orders before
//!    any parseable one (reference first if both are unparsed), or the merge
//!    fails.
//!
//! Once one side is exhausted, every remaining line of the other side is
//! written in its original order, the pending one included.

use std::io::Write;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::UnparsedPolicy;
use crate::error::{LogError, Result};
use crate::line::{LineParser, LogLine};

use super::cursor::{DualCursor, Side};

/// Counters collected while merging one pair of files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Lines read from the reference side
    pub reference_lines: usize,
    /// Lines read from the incoming side
    pub incoming_lines: usize,
    /// Lines written to the output
    pub written: usize,
    /// Line pairs collapsed by the equality rule
    pub duplicates: usize,
    /// Lines without a usable timestamp, both sides combined
    pub unparsed: usize,
    /// Timestamp regressions seen in the reference file
    pub reference_out_of_order: usize,
    /// Timestamp regressions seen in the incoming file
    pub incoming_out_of_order: usize,
}

impl MergeStats {
    /// Lines the incoming side contributed that the reference lacked.
    pub fn added(&self) -> usize {
        self.written.saturating_sub(self.reference_lines)
    }

    /// Returns `true` when the output equals the reference line for line.
    pub fn is_unchanged(&self) -> bool {
        self.written == self.reference_lines
    }

    pub fn out_of_order(&self) -> usize {
        self.reference_out_of_order + self.incoming_out_of_order
    }

    /// Share of incoming lines that were already in the reference.
    pub fn duplicate_ratio(&self) -> f64 {
        if self.incoming_lines == 0 {
            0.0
        } else {
            (self.duplicates as f64 / self.incoming_lines as f64) * 100.0
        }
    }
}

impl AddAssign for MergeStats {
    fn add_assign(&mut self, other: Self) {
        self.reference_lines += other.reference_lines;
        self.incoming_lines += other.incoming_lines;
        self.written += other.written;
        self.duplicates += other.duplicates;
        self.unparsed += other.unparsed;
        self.reference_out_of_order += other.reference_out_of_order;
        self.incoming_out_of_order += other.incoming_out_of_order;
    }
}

/// What to consume next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Equal bodies: emit the reference copy, drop the incoming one.
    Both,
    Only(Side),
    /// An unparsed line under [`UnparsedPolicy::Fail`].
    Unorderable(Side),
}

/// Streaming merge of two time-ordered line sequences.
///
/// # Example
///
/// ```rust
/// use colloquy_logs::config::UnparsedPolicy;
/// use colloquy_logs::merge::MergeEngine;
///
/// let engine = MergeEngine::new(UnparsedPolicy::FlushEarly);
/// let merged = engine
///     .merge_lines(
///         &["[01/01/2024 -:- 10:00:00 AM] a: hi"],
///         &["[01/01/2024 -:- 09:00:00 AM] b: early", "[01/01/2024 -:- 10:00:05 AM] a: hi"],
///     )
///     .unwrap();
///
/// assert_eq!(
///     merged,
///     vec!["[01/01/2024 -:- 09:00:00 AM] b: early", "[01/01/2024 -:- 10:00:00 AM] a: hi"]
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeEngine {
    policy: UnparsedPolicy,
}

impl MergeEngine {
    pub fn new(policy: UnparsedPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnparsedPolicy {
        self.policy
    }

    /// Merges both sides of `dual` into `out`, one line per `\n`.
    ///
    /// Nothing is flushed here; callers own the writer's lifetime.
    pub fn merge<A, B, W>(&self, dual: &mut DualCursor<A, B>, out: &mut W) -> Result<MergeStats>
    where
        A: Iterator<Item = Result<LogLine>>,
        B: Iterator<Item = Result<LogLine>>,
        W: Write,
    {
        self.drive(dual, |line| {
            out.write_all(line.raw().as_bytes())?;
            out.write_all(b"\n")?;
            Ok(())
        })
    }

    /// Merges two in-memory sequences of lines.
    pub fn merge_lines(&self, reference: &[&str], incoming: &[&str]) -> Result<Vec<String>> {
        let parser = LineParser::new();
        let numbered = |lines: &[&str]| -> Vec<Result<LogLine>> {
            lines
                .iter()
                .enumerate()
                .map(|(i, line)| Ok(parser.parse_line(line, i + 1)))
                .collect()
        };

        let mut dual = DualCursor::new(numbered(reference).into_iter(), numbered(incoming).into_iter());
        let mut merged = Vec::with_capacity(reference.len() + incoming.len());
        self.drive(&mut dual, |line| {
            merged.push(line.into_raw());
            Ok(())
        })?;
        Ok(merged)
    }

    /// Streams `reference` and `incoming` from disk into `out`.
    ///
    /// Neither input is modified. `out` is flushed before returning.
    pub fn merge_files<W: Write>(
        &self,
        reference: &Path,
        incoming: &Path,
        out: &mut W,
        buffer_size: usize,
    ) -> Result<MergeStats> {
        let mut dual = DualCursor::open(reference, incoming, buffer_size)?;
        let stats = self.merge(&mut dual, out)?;
        out.flush()?;
        Ok(stats)
    }

    fn drive<A, B, F>(&self, dual: &mut DualCursor<A, B>, mut emit: F) -> Result<MergeStats>
    where
        A: Iterator<Item = Result<LogLine>>,
        B: Iterator<Item = Result<LogLine>>,
        F: FnMut(LogLine) -> Result<()>,
    {
        let mut stats = MergeStats::default();

        loop {
            let step = match dual.peek()? {
                (None, None) => break,
                (Some(_), None) => Step::Only(Side::Reference),
                (None, Some(_)) => Step::Only(Side::Incoming),
                (Some(reference), Some(incoming)) => self.decide(reference, incoming),
            };

            match step {
                Step::Both => {
                    if let Some(line) = dual.take_reference()? {
                        emit(line)?;
                        stats.written += 1;
                    }
                    dual.take_incoming()?;
                    stats.duplicates += 1;
                }
                Step::Only(side) => {
                    if let Some(line) = dual.take(side)? {
                        emit(line)?;
                        stats.written += 1;
                    }
                }
                Step::Unorderable(side) => return Err(unorderable(dual, side)?),
            }
        }

        stats.reference_lines = dual.reference().consumed();
        stats.incoming_lines = dual.incoming().consumed();
        stats.unparsed = dual.reference().unparsed() + dual.incoming().unparsed();
        stats.reference_out_of_order = dual.reference().regressions();
        stats.incoming_out_of_order = dual.incoming().regressions();

        debug!(
            written = stats.written,
            duplicates = stats.duplicates,
            unparsed = stats.unparsed,
            "merge finished"
        );
        Ok(stats)
    }

    fn decide(&self, reference: &LogLine, incoming: &LogLine) -> Step {
        if reference.same_body(incoming) {
            return Step::Both;
        }

        match (reference.timestamp(), incoming.timestamp()) {
            (Some(r), Some(i)) if r < i => Step::Only(Side::Reference),
            (Some(_), Some(_)) => Step::Only(Side::Incoming),
            (r, _) => {
                let side = if r.is_none() {
                    Side::Reference
                } else {
                    Side::Incoming
                };
                match self.policy {
                    UnparsedPolicy::FlushEarly => Step::Only(side),
                    UnparsedPolicy::Fail => Step::Unorderable(side),
                }
            }
        }
    }
}

fn unorderable<A, B>(dual: &mut DualCursor<A, B>, side: Side) -> Result<LogError>
where
    A: Iterator<Item = Result<LogLine>>,
    B: Iterator<Item = Result<LogLine>>,
{
    let path: Option<PathBuf> = dual.path(side).map(Path::to_path_buf);
    let (line_number, line) = match dual.take(side)? {
        Some(line) => (line.number(), line.into_raw()),
        None => (0, String::new()),
    };
    Ok(LogError::UnorderableLine {
        path,
        line_number,
        line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const A1: &str = "[01/01/2024 -:- 10:00:00 AM] alice: one";
    const A2: &str = "[01/01/2024 -:- 10:05:00 AM] alice: two";
    const B1: &str = "[01/01/2024 -:- 10:02:00 AM] bob: three";
    const B2: &str = "[01/01/2024 -:- 10:07:00 AM] bob: four";

    fn flush_early() -> MergeEngine {
        MergeEngine::new(UnparsedPolicy::FlushEarly)
    }

    #[test]
    fn test_interleaves_by_timestamp() {
        let merged = flush_early().merge_lines(&[A1, A2], &[B1, B2]).unwrap();
        assert_eq!(merged, vec![A1, B1, A2, B2]);
    }

    #[test]
    fn test_equal_bodies_collapse_to_reference_copy() {
        let shifted = "[01/01/2024 -:- 10:00:03 AM] alice: one";
        let merged = flush_early().merge_lines(&[A1], &[shifted]).unwrap();
        assert_eq!(merged, vec![A1]);
    }

    #[test]
    fn test_tie_puts_incoming_first() {
        let other = "[01/01/2024 -:- 10:00:00 AM] bob: same second";
        let merged = flush_early().merge_lines(&[A1], &[other]).unwrap();
        assert_eq!(merged, vec![other, A1]);
    }

    #[test]
    fn test_drains_remaining_side_including_pending_line() {
        let merged = flush_early().merge_lines(&[A1], &[B1, A2, B2]).unwrap();
        assert_eq!(merged, vec![A1, B1, A2, B2]);

        let merged = flush_early().merge_lines(&[A1, B1, A2, B2], &[A1]).unwrap();
        assert_eq!(merged, vec![A1, B1, A2, B2]);
    }

    #[test]
    fn test_empty_sides() {
        assert_eq!(flush_early().merge_lines(&[], &[A1]).unwrap(), vec![A1]);
        assert_eq!(flush_early().merge_lines(&[A1], &[]).unwrap(), vec![A1]);
        assert!(flush_early().merge_lines(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_flush_early_orders_unparsed_first() {
        let merged = flush_early()
            .merge_lines(&[A1], &["continued from above"])
            .unwrap();
        assert_eq!(merged, vec!["continued from above", A1]);

        let merged = flush_early().merge_lines(&["ref bare"], &["inc bare"]).unwrap();
        assert_eq!(merged, vec!["ref bare", "inc bare"]);
    }

    #[test]
    fn test_bare_line_never_matches_stamped_line() {
        let stamped = "[01/01/2024 -:- 10:00:00 AM] alice: hi";
        let merged = flush_early().merge_lines(&[stamped], &["alice: hi"]).unwrap();
        assert_eq!(merged, vec!["alice: hi", stamped]);

        let merged = flush_early().merge_lines(&["alice: hi"], &[stamped]).unwrap();
        assert_eq!(merged, vec!["alice: hi", stamped]);
    }

    #[test]
    fn test_identical_bare_lines_collapse() {
        let merged = flush_early()
            .merge_lines(&["same note", A1], &["same note", A1])
            .unwrap();
        assert_eq!(merged, vec!["same note", A1]);
    }

    #[test]
    fn test_malformed_prefix_is_unparsed() {
        let bad = "[13/45/2024 -:- 99:00:00 AM] x: broken";
        let merged = flush_early().merge_lines(&[A1], &[bad]).unwrap();
        assert_eq!(merged, vec![bad, A1]);
    }

    #[test]
    fn test_fail_policy_reports_line() {
        let engine = MergeEngine::new(UnparsedPolicy::Fail);
        let err = engine.merge_lines(&[A1, B2], &[A2, "orphan"]).unwrap_err();
        match err {
            LogError::UnorderableLine {
                line_number, line, ..
            } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "orphan");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fail_policy_accepts_unparsed_tail() {
        let engine = MergeEngine::new(UnparsedPolicy::Fail);
        let merged = engine.merge_lines(&[A1], &[A1, "trailing note"]).unwrap();
        assert_eq!(merged, vec![A1, "trailing note"]);
    }

    #[test]
    fn test_stats() {
        let engine = flush_early();
        let mut dual = DualCursor::new(
            [A1, A2]
                .iter()
                .enumerate()
                .map(|(i, l)| Ok::<_, LogError>(LineParser::new().parse_line(l, i + 1))),
            [A1, B1, "bare"]
                .iter()
                .enumerate()
                .map(|(i, l)| Ok::<_, LogError>(LineParser::new().parse_line(l, i + 1))),
        );
        let mut out = Vec::new();
        let stats = engine.merge(&mut dual, &mut out).unwrap();

        assert_eq!(stats.reference_lines, 2);
        assert_eq!(stats.incoming_lines, 3);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.written, 4);
        assert_eq!(stats.added(), 2);
        assert_eq!(stats.unparsed, 1);
        assert!(!stats.is_unchanged());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{A1}\n{B1}\nbare\n{A2}\n")
        );
    }

    #[test]
    fn test_out_of_order_counted_not_fatal() {
        let merged = flush_early().merge_lines(&[A2, A1], &[B1]).unwrap();
        assert_eq!(merged.len(), 3);

        let mut totals = MergeStats::default();
        totals += MergeStats {
            reference_out_of_order: 1,
            written: 3,
            ..MergeStats::default()
        };
        totals += MergeStats {
            incoming_out_of_order: 2,
            written: 1,
            ..MergeStats::default()
        };
        assert_eq!(totals.out_of_order(), 3);
        assert_eq!(totals.written, 4);
    }

    #[test]
    fn test_duplicate_ratio() {
        let stats = MergeStats {
            incoming_lines: 4,
            duplicates: 3,
            ..MergeStats::default()
        };
        assert!((stats.duplicate_ratio() - 75.0).abs() < 0.01);
        assert!(MergeStats::default().duplicate_ratio().abs() < f64::EPSILON);
    }
}
