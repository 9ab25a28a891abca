//! Total value locked record, one row per chain label per day.

use crate::record::{DedupKey, TableRecord};
use crate::stream::Stream;
use crate::timestamp;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Chain label of the aggregate row.
pub const TOTAL_CHAIN_LABEL: &str = "total";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvlRecord {
    #[serde(alias = "fetched_at", with = "crate::timestamp")]
    pub collected_at: DateTime<Utc>,
    /// UTC day of `collected_at`; missing in the oldest tables
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Lower-cased chain label, or "total" for the aggregate
    pub chain: String,
    pub tvl_usd: f64,
}

impl TvlRecord {
    pub fn new(collected_at: DateTime<Utc>, chain: impl Into<String>, tvl_usd: f64) -> Self {
        Self {
            collected_at,
            date: Some(collected_at.date_naive()),
            chain: chain.into().to_lowercase(),
            tvl_usd,
        }
    }

    /// The day the row describes, derived from `collected_at` when absent.
    #[must_use]
    pub fn effective_date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| self.collected_at.date_naive())
    }

    #[must_use]
    pub fn is_total(&self) -> bool {
        self.chain == TOTAL_CHAIN_LABEL
    }
}

impl TableRecord for TvlRecord {
    const STREAM: Stream = Stream::Tvl;
    const COLUMNS: &'static [&'static str] = &["collected_at", "date", "chain", "tvl_usd"];

    fn dedup_key(&self) -> DedupKey {
        DedupKey::new([self.effective_date().to_string(), self.chain.clone()])
    }

    fn sort_key(&self) -> Option<DateTime<Utc>> {
        Some(self.collected_at)
    }

    fn fallback_sort_key(&self) -> Option<DateTime<Utc>> {
        self.date.map(timestamp::start_of_day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_derives_date_and_lowercases() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 0).unwrap();
        let record = TvlRecord::new(ts, "Starknet", 1_000.0);

        assert_eq!(record.chain, "starknet");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert!(!record.is_total());
    }

    #[test]
    fn test_same_day_same_key() {
        let morning = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap();

        assert_eq!(
            TvlRecord::new(morning, TOTAL_CHAIN_LABEL, 1.0).dedup_key(),
            TvlRecord::new(evening, TOTAL_CHAIN_LABEL, 2.0).dedup_key()
        );
    }

    #[test]
    fn test_reads_schema_without_date() {
        let data = "fetched_at,chain,tvl_usd\n2025-03-01T10:00:00.000000Z,total,123.4\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<TvlRecord> = reader.deserialize().collect::<Result<_, _>>().unwrap();

        assert!(rows[0].date.is_none());
        assert_eq!(rows[0].effective_date(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert!(rows[0].is_total());
    }
}
