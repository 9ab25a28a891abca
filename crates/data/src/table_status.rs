//! Read-only health report for a stream table.

use crate::models::{
    FundingRateRecord, MarketRecord, OrderBookSnapshotRecord, TradingStatsRecord, TvlRecord,
};
use crate::record::TableRecord;
use crate::stream::Stream;
use crate::table_store::{read_table, StoreError, TableStore};
use crate::timestamp;
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// What a table on disk looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    pub stream: Stream,
    pub path: PathBuf,
    pub exists: bool,
    /// File size in bytes
    pub size_bytes: u64,
    /// Columns in the header row
    pub columns: usize,
    pub rows: usize,
    /// Oldest sort value present
    pub earliest: Option<DateTime<Utc>>,
    /// Newest sort value present
    pub latest: Option<DateTime<Utc>>,
    /// Parse failure, if the table is unreadable
    pub error: Option<String>,
}

impl TableStatus {
    /// Inspects the table for `stream` stored at `path`.
    ///
    /// Never fails: an unreadable table is reported through `error`.
    #[must_use]
    pub fn inspect(stream: Stream, path: &Path) -> Self {
        let mut status = Self {
            stream,
            path: path.to_path_buf(),
            exists: path.is_file(),
            size_bytes: 0,
            columns: 0,
            rows: 0,
            earliest: None,
            latest: None,
            error: None,
        };

        if !status.exists {
            return status;
        }

        status.size_bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        status.columns = csv::Reader::from_path(path)
            .and_then(|mut r| r.headers().map(csv::StringRecord::len))
            .unwrap_or(0);

        let result = match stream {
            Stream::Markets => status.fill::<MarketRecord>(path),
            Stream::TradingStats => status.fill::<TradingStatsRecord>(path),
            Stream::Funding => status.fill::<FundingRateRecord>(path),
            Stream::OrderBook => status.fill::<OrderBookSnapshotRecord>(path),
            Stream::Tvl => status.fill::<TvlRecord>(path),
        };
        if let Err(e) = result {
            status.error = Some(e.to_string());
        }

        status
    }

    /// Inspects every stream of a store.
    #[must_use]
    pub fn inspect_store(store: &TableStore) -> Vec<Self> {
        Stream::ALL
            .iter()
            .map(|&stream| Self::inspect(stream, &store.path_for(stream)))
            .collect()
    }

    fn fill<R: TableRecord>(&mut self, path: &Path) -> Result<(), StoreError> {
        let rows: Vec<R> = read_table(path)?.unwrap_or_default();
        let keys: Vec<_> = rows.iter().filter_map(TableRecord::effective_sort_key).collect();

        self.rows = rows.len();
        self.earliest = keys.iter().min().copied();
        self.latest = keys.iter().max().copied();
        Ok(())
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.exists && self.error.is_none()
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.stream.table_name(), self.path.display())?;
        if !self.exists {
            return write!(f, "  missing");
        }
        writeln!(f, "  size:    {} bytes", self.size_bytes)?;
        writeln!(f, "  columns: {}", self.columns)?;
        write!(f, "  rows:    {}", self.rows)?;
        if let (Some(first), Some(last)) = (self.earliest, self.latest) {
            write!(
                f,
                "\n  range:   {} .. {}",
                timestamp::format(&first),
                timestamp::format(&last)
            )?;
        }
        if let Some(err) = &self.error {
            write!(f, "\n  error:   {err}")?;
        }
        Ok(())
    }
}
