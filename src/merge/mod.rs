//! Deduplicating, order-preserving merge of log files.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`cursor`] | Streaming line readers and the two-sided cursor |
//! | [`engine`] | The per-file merge algorithm and its counters |
//! | [`tree`] | Merging every matching file of two log trees |

pub mod cursor;
pub mod engine;
pub mod tree;

pub use cursor::{Cursor, DualCursor, LineReader, Side};
pub use engine::{MergeEngine, MergeStats};
pub use tree::{MergeReport, PairOutcome, merge_trees};
