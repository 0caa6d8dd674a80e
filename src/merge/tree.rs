//! Merging a whole incoming tree into a reference tree.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{IncomingOnlyPolicy, MergeConfig};
use crate::error::Result;
use crate::locate::{FilePair, TranscriptLocator};
use crate::output::{AtomicFile, backup_path, backup_stamp, copy_atomically};

use super::engine::{MergeEngine, MergeStats};

/// What happened to one located pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairOutcome {
    pub pair: FilePair,
    /// Where the merged content went.
    pub target: PathBuf,
    /// The copy of the previous target content, if one was made.
    pub backup: Option<PathBuf>,
    /// `false` when the target already held every incoming line and was
    /// left alone.
    pub written: bool,
    pub stats: MergeStats,
}

/// Summary of a [`merge_trees`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub merged: Vec<PairOutcome>,
    /// Incoming files without a reference counterpart.
    pub incoming_only: Vec<FilePair>,
    /// Targets created for incoming-only files under [`IncomingOnlyPolicy::Copy`].
    pub copied: Vec<PathBuf>,
}

impl MergeReport {
    /// Stats of every pair added together.
    pub fn totals(&self) -> MergeStats {
        let mut totals = MergeStats::default();
        for outcome in &self.merged {
            totals += outcome.stats;
        }
        totals
    }

    /// Number of targets that received new content.
    pub fn files_written(&self) -> usize {
        self.merged.iter().filter(|o| o.written).count()
    }
}

/// Merges every incoming log into its reference counterpart.
///
/// Pairs are located under both roots, merged one file at a time (or on a
/// rayon pool when `config.parallel` is set), and written atomically either
/// over the reference file or under `config.output_dir`.
///
/// The first failing pair aborts the run. Targets already committed stay
/// committed; the failing target is left untouched.
pub fn merge_trees(
    reference_root: &Path,
    incoming_root: &Path,
    config: &MergeConfig,
) -> Result<MergeReport> {
    let located = TranscriptLocator::new(reference_root, incoming_root).locate()?;
    info!(
        pairs = located.pairs.len(),
        incoming_only = located.incoming_only.len(),
        "merging log trees"
    );

    let engine = MergeEngine::new(config.unparsed);
    let stamp = backup_stamp(Local::now());

    let merged = merge_pairs(&located.pairs, engine, config, &stamp)?;
    let copied = handle_incoming_only(&located.incoming_only, config)?;

    Ok(MergeReport {
        merged,
        incoming_only: located.incoming_only,
        copied,
    })
}

fn merge_pairs(
    pairs: &[FilePair],
    engine: MergeEngine,
    config: &MergeConfig,
    stamp: &str,
) -> Result<Vec<PairOutcome>> {
    #[cfg(feature = "parallel")]
    if config.parallel {
        use rayon::prelude::*;

        return pairs
            .par_iter()
            .map(|pair| merge_pair(pair, engine, config, stamp))
            .collect();
    }

    #[cfg(not(feature = "parallel"))]
    if config.parallel {
        warn!("built without the `parallel` feature; merging pairs one at a time");
    }

    pairs
        .iter()
        .map(|pair| merge_pair(pair, engine, config, stamp))
        .collect()
}

fn merge_pair(
    pair: &FilePair,
    engine: MergeEngine,
    config: &MergeConfig,
    stamp: &str,
) -> Result<PairOutcome> {
    let target = target_for(&pair.reference, &pair.relative, config);
    debug!(file = %pair.relative.display(), target = %target.display(), "merging pair");

    let mut out = AtomicFile::create(&target)?;
    let stats = engine.merge_files(&pair.reference, &pair.incoming, &mut out, config.buffer_size)?;

    if stats.out_of_order() > 0 {
        warn!(
            file = %pair.relative.display(),
            reference = stats.reference_out_of_order,
            incoming = stats.incoming_out_of_order,
            "timestamps go backwards; merged order may be imperfect"
        );
    }

    // In place, an unchanged merge would only rewrite the same lines.
    if config.is_in_place() && stats.is_unchanged() {
        out.discard();
        return Ok(PairOutcome {
            pair: pair.clone(),
            target,
            backup: None,
            written: false,
            stats,
        });
    }

    let backup = (config.is_in_place() && config.backup).then(|| backup_path(&target, stamp));
    let backup = out.commit(backup.as_deref())?;
    debug!(file = %pair.relative.display(), added = stats.added(), "pair merged");

    Ok(PairOutcome {
        pair: pair.clone(),
        target,
        backup,
        written: true,
        stats,
    })
}

fn target_for(reference: &Path, relative: &Path, config: &MergeConfig) -> PathBuf {
    match &config.output_dir {
        Some(dir) => dir.join(relative),
        None => reference.to_path_buf(),
    }
}

fn handle_incoming_only(unpaired: &[FilePair], config: &MergeConfig) -> Result<Vec<PathBuf>> {
    match config.incoming_only {
        IncomingOnlyPolicy::Ignore => Ok(Vec::new()),
        IncomingOnlyPolicy::Report => {
            for file in unpaired {
                info!(file = %file.relative.display(), "no reference counterpart");
            }
            Ok(Vec::new())
        }
        IncomingOnlyPolicy::Copy => unpaired
            .iter()
            .map(|file| {
                let target = target_for(&file.reference, &file.relative, config);
                copy_atomically(&file.incoming, &target)?;
                info!(file = %file.relative.display(), "copied incoming-only file");
                Ok(target)
            })
            .collect(),
    }
}
