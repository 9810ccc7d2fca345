//! Append-only metrics log
//!
//! Every record goes to disk as soon as it is produced, so an interrupted run
//! still leaves the records of the targets it finished. The sink is opened
//! once per run and closed explicitly; dropping it syncs whatever was written.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::record::MetricsRecord;

/// Single writer over a JSON Lines metrics file
#[derive(Debug)]
pub struct MetricsSink {
    path: PathBuf,
    file: Option<File>,
    written: usize,
}

impl MetricsSink {
    /// Open `path` for appending, creating it and its parent directory
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create metrics directory: {}", parent.display())
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open metrics log: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended through this sink
    pub fn written(&self) -> usize {
        self.written
    }

    /// Write one record as a line and flush it.
    ///
    /// The exclusive lock keeps lines whole if another process appends to
    /// the same log.
    pub fn append(&mut self, record: &MetricsRecord) -> Result<()> {
        let line = serde_json::to_string(record).context("Failed to serialize metrics record")?;
        let file = self
            .file
            .as_mut()
            .with_context(|| format!("Metrics log already closed: {}", self.path.display()))?;

        file.lock_exclusive().with_context(|| {
            format!("Failed to acquire exclusive lock: {}", self.path.display())
        })?;
        let written = writeln!(file, "{line}").and_then(|_| file.flush());
        let _ = FileExt::unlock(&*file);
        written.with_context(|| format!("Failed to append metrics record: {}", self.path.display()))?;

        self.written += 1;
        Ok(())
    }

    /// Sync the log to disk and release it
    pub fn close(mut self) -> Result<()> {
        match self.file.take() {
            Some(file) => file
                .sync_all()
                .with_context(|| format!("Failed to sync metrics log: {}", self.path.display())),
            None => Ok(()),
        }
    }
}

impl Drop for MetricsSink {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.sync_all();
        }
    }
}

/// Read every valid record from a metrics log.
///
/// Blank lines and lines that do not parse as a record are skipped. A missing
/// file is an error.
pub fn read_records(path: &Path) -> Result<Vec<MetricsRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read metrics log: {}", path.display()))?;

    let mut skipped = 0usize;
    let records: Vec<MetricsRecord> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(_) => {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "ignored unreadable metrics lines");
    }
    Ok(records)
}
