//! Merge-dedupe-cap persistence for stream tables.
//!
//! Each stream owns one CSV file under the store's root directory. Every
//! write is a read-modify-write of the whole table:
//!
//! 1. read the existing rows (absent file = empty table)
//! 2. append the new batch after the existing rows
//! 3. collapse rows sharing a dedup key, keeping the later occurrence
//! 4. stable-sort by the stream's sort key, most recent first
//! 5. keep the first `cap` rows
//! 6. write to a sibling temp file and rename it over the table
//!
//! A table that cannot be parsed, or whose header shares no column with the
//! stream schema, is replaced by the new batch; the caller learns about it
//! through [`MergeOutcome::corrupt_reason`].
//!
//! The store is the only writer of its tables. Merges are not commutative,
//! so callers must not run two merges on the same stream concurrently.

use crate::record::{DedupKey, TableRecord};
use crate::stream::Stream;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures reading or writing a table.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The table exists but its content does not match the stream schema.
    #[error("table {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn from_csv(path: &Path, err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(source) => Self::io(path, source),
                other => Self::Corrupt {
                    path: path.to_path_buf(),
                    reason: format!("{other:?}"),
                },
            }
        } else {
            Self::Corrupt {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        }
    }
}

/// What a single [`TableStore::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub stream: Stream,
    pub path: PathBuf,
    /// Rows in the incoming batch
    pub batch_rows: usize,
    /// Rows read from the existing table (0 if absent or corrupt)
    pub existing_rows: usize,
    /// Rows removed as duplicates of a later row
    pub duplicates_collapsed: usize,
    /// Rows dropped by the retention cap
    pub evicted: usize,
    /// Rows in the table once the call returns; for an empty batch, the
    /// rows already on disk
    pub rows_written: usize,
    /// True if the table did not exist before
    pub created: bool,
    /// Why the existing table was unreadable, if it was; its history is lost
    pub corrupt_reason: Option<String>,
}

impl MergeOutcome {
    /// True if the existing table was rebuilt from the batch alone.
    #[must_use]
    pub fn degraded(&self) -> bool {
        self.corrupt_reason.is_some()
    }

    /// Formats a one-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {} new, {} existing, {} duplicates, {} evicted, {} rows{}",
            self.stream,
            self.batch_rows,
            self.existing_rows,
            self.duplicates_collapsed,
            self.evicted,
            self.rows_written,
            if self.degraded() { " (history rebuilt)" } else { "" }
        )
    }
}

/// Collapses rows sharing a dedup key, keeping the last occurrence.
///
/// Surviving rows keep the relative order of their last occurrence.
#[must_use]
pub fn dedupe_keep_last<R: TableRecord>(rows: Vec<R>) -> Vec<R> {
    let keys: Vec<DedupKey> = rows.iter().map(TableRecord::dedup_key).collect();

    let mut last_index: HashMap<&DedupKey, usize> = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        last_index.insert(key, i);
    }

    rows.into_iter()
        .enumerate()
        .filter(|(i, _)| last_index.get(&keys[*i]) == Some(i))
        .map(|(_, row)| row)
        .collect()
}

/// Stable sort, most recent first. Rows without any sort value go last.
pub fn sort_most_recent_first<R: TableRecord>(rows: &mut [R]) {
    rows.sort_by_key(|row| std::cmp::Reverse(row.effective_sort_key()));
}

/// Rows produced by [`merge_dedupe_cap`] and what was dropped on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged<R> {
    pub rows: Vec<R>,
    /// Rows removed as duplicates of a later row
    pub duplicates_collapsed: usize,
    /// Rows dropped by the cap
    pub evicted: usize,
}

/// `existing ++ batch`, dedupe (later wins), sort, cap.
#[must_use]
pub fn merge_dedupe_cap<R: TableRecord>(existing: Vec<R>, batch: Vec<R>, cap: usize) -> Merged<R> {
    let mut combined = existing;
    combined.extend(batch);
    let total = combined.len();

    let mut rows = dedupe_keep_last(combined);
    let duplicates_collapsed = total - rows.len();

    sort_most_recent_first(&mut rows);
    let evicted = rows.len().saturating_sub(cap);
    rows.truncate(cap);

    Merged {
        rows,
        duplicates_collapsed,
        evicted,
    }
}

/// Reads every row of the table at `path`, or `None` if it does not exist.
///
/// # Errors
/// [`StoreError::Corrupt`] if the header shares no column with the stream
/// schema or any row fails to deserialize, [`StoreError::Io`] if the file
/// cannot be read.
pub fn read_table<R: TableRecord>(path: &Path) -> Result<Option<Vec<R>>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }

    let file = fs::File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| StoreError::from_csv(path, e))?;
    if !headers.iter().any(|h| R::COLUMNS.contains(&h)) {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!(
                "header [{}] has none of the {} columns",
                headers.iter().collect::<Vec<_>>().join(","),
                R::STREAM
            ),
        });
    }

    let rows = reader
        .deserialize::<R>()
        .collect::<Result<Vec<R>, csv::Error>>()
        .map_err(|e| StoreError::from_csv(path, e))?;

    Ok(Some(rows))
}

/// Directory of stream tables.
#[derive(Debug, Clone)]
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a stream's table.
    #[must_use]
    pub fn path_for(&self, stream: Stream) -> PathBuf {
        self.root.join(stream.file_name())
    }

    /// Returns true if the stream's table exists on disk.
    #[must_use]
    pub fn exists(&self, stream: Stream) -> bool {
        self.path_for(stream).is_file()
    }

    /// Reads a stream's table.
    ///
    /// Returns `Ok(None)` if the table does not exist yet.
    ///
    /// # Errors
    /// See [`read_table`].
    pub fn read<R: TableRecord>(&self) -> Result<Option<Vec<R>>, StoreError> {
        read_table(&self.path_for(R::STREAM))
    }

    /// Merges `batch` into the stream's table and rewrites it.
    ///
    /// An empty batch leaves the table untouched; the outcome then reports
    /// the rows already on disk.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the existing table cannot be opened or
    /// the new table cannot be written. A corrupt table is not an error.
    pub fn apply<R: TableRecord>(&self, batch: Vec<R>, cap: usize) -> Result<MergeOutcome, StoreError> {
        let stream = R::STREAM;
        let path = self.path_for(stream);

        if batch.is_empty() {
            let on_disk = match self.read::<R>() {
                Ok(rows) => rows.map_or(0, |r| r.len()),
                Err(StoreError::Corrupt { .. }) => 0,
                Err(e) => return Err(e),
            };
            tracing::debug!(%stream, rows = on_disk, "Empty batch, table left untouched");
            return Ok(MergeOutcome {
                stream,
                path,
                batch_rows: 0,
                existing_rows: on_disk,
                duplicates_collapsed: 0,
                evicted: 0,
                rows_written: on_disk,
                created: false,
                corrupt_reason: None,
            });
        }

        let (existing, created, corrupt_reason) = match self.read::<R>() {
            Ok(Some(rows)) => (rows, false, None),
            Ok(None) => (Vec::new(), true, None),
            Err(StoreError::Corrupt { reason, .. }) => {
                tracing::warn!(
                    %stream,
                    path = %path.display(),
                    %reason,
                    "Existing table unreadable, rebuilding from current batch (history lost)"
                );
                (Vec::new(), false, Some(reason))
            }
            Err(e) => return Err(e),
        };

        let batch_rows = batch.len();
        let existing_rows = existing.len();
        let merged = merge_dedupe_cap(existing, batch, cap);

        self.write(&path, &merged.rows)?;

        let outcome = MergeOutcome {
            stream,
            path,
            batch_rows,
            existing_rows,
            duplicates_collapsed: merged.duplicates_collapsed,
            evicted: merged.evicted,
            rows_written: merged.rows.len(),
            created,
            corrupt_reason,
        };
        tracing::info!("{}", outcome.summary());

        Ok(outcome)
    }

    /// Writes rows to a temp file next to `path`, then renames it over `path`.
    /// The temp file is removed if any step fails.
    fn write<R: TableRecord>(&self, path: &Path, rows: &[R]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let tmp = path.with_extension("csv.tmp");
        let result = write_rows(&tmp, rows)
            .and_then(|()| fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e)));

        if result.is_err() && tmp.is_file() {
            if let Err(e) = fs::remove_file(&tmp) {
                tracing::warn!(path = %tmp.display(), error = %e, "Could not remove temp file");
            }
        }
        result
    }
}

fn write_rows<R: TableRecord>(path: &Path, rows: &[R]) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| StoreError::from_csv(path, e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| StoreError::from_csv(path, e))?;
    }
    writer.flush().map_err(|e| StoreError::io(path, e))
}
