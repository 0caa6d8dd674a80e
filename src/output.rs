//! Crash-safe file replacement.
//!
//! [`AtomicFile`] writes into a temporary file in the target's directory and
//! renames it over the target on [`commit`](AtomicFile::commit). A reader of
//! the target sees either the old content or the complete new content,
//! never a partial write. Dropping an uncommitted `AtomicFile` removes the
//! temporary file and leaves the target untouched.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{LogError, Result};

/// Timestamp pattern embedded in backup file names.
const BACKUP_STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A pending replacement of `target`.
pub struct AtomicFile {
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

impl AtomicFile {
    /// Starts a replacement of `target`, creating its parent directories.
    pub fn create(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| LogError::fs(&dir, e))?;

        let temp = tempfile::Builder::new()
            .prefix(".colloquy-logs-")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| LogError::fs(&dir, e))?;

        Ok(Self {
            target,
            writer: BufWriter::new(temp),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flushes, syncs and renames the new content over the target.
    ///
    /// With `backup` set and an existing target, the old content is copied
    /// there first. An existing backup is never overwritten: the copy goes to
    /// the first free `<name>.<n>.bak` instead. Returns where the backup
    /// landed.
    pub fn commit(self, backup: Option<&Path>) -> Result<Option<PathBuf>> {
        let target = self.target;
        let temp = self
            .writer
            .into_inner()
            .map_err(|e| LogError::fs(&target, e.into_error()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| LogError::fs(temp.path(), e))?;

        let mut kept = None;
        if let Ok(metadata) = fs::metadata(&target) {
            fs::set_permissions(temp.path(), metadata.permissions())
                .map_err(|e| LogError::fs(temp.path(), e))?;

            if let Some(backup) = backup {
                let path = write_backup(&target, backup)?;
                debug!(backup = %path.display(), "kept previous content");
                kept = Some(path);
            }
        }

        temp.persist(&target)
            .map_err(|e| LogError::fs(&target, e.error))?;
        sync_parent_dir(&target);
        Ok(kept)
    }

    /// Drops the new content; the target is left as it was.
    pub fn discard(self) {
        debug!(file = %self.target.display(), "discarding unchanged output");
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Copies `target` to `preferred`, or to the first unused numbered variant.
fn write_backup(target: &Path, preferred: &Path) -> Result<PathBuf> {
    let mut input = fs::File::open(target).map_err(|e| LogError::fs(target, e))?;

    let mut attempt = 0u32;
    let (path, mut file) = loop {
        let path = if attempt == 0 {
            preferred.to_path_buf()
        } else {
            numbered(preferred, attempt)
        };
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => break (path, file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(LogError::fs(&path, e)),
        }
    };

    io::copy(&mut input, &mut file).map_err(|e| LogError::fs(&path, e))?;
    file.sync_all().map_err(|e| LogError::fs(&path, e))?;
    Ok(path)
}

/// `log.txt.<stamp>.bak` becomes `log.txt.<stamp>.<n>.bak`.
fn numbered(backup: &Path, n: u32) -> PathBuf {
    let name = backup
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".bak").unwrap_or(&name);
    backup.with_file_name(format!("{stem}.{n}.bak"))
}

/// Syncs the directory holding a renamed file; failures are ignored.
#[cfg(unix)]
fn sync_parent_dir(target: &Path) {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_target: &Path) {}

/// Formats the moment a run started for use in backup names.
pub fn backup_stamp(now: DateTime<Local>) -> String {
    now.format(BACKUP_STAMP_FORMAT).to_string()
}

/// `<dir>/<file name>.<stamp>.bak` next to `target`.
pub fn backup_path(target: &Path, stamp: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!("{name}.{stamp}.bak"))
}

/// Copies `source` to `target` through an [`AtomicFile`].
pub fn copy_atomically(source: &Path, target: &Path) -> Result<u64> {
    let mut input = fs::File::open(source).map_err(|e| LogError::fs(source, e))?;
    let mut out = AtomicFile::create(target)?;
    let bytes = io::copy(&mut input, &mut out).map_err(|e| LogError::fs(source, e))?;
    out.commit(None)?;
    Ok(bytes)
}
