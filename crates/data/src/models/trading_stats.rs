//! Daily trading statistics record, one row per (date, chain).

use crate::record::{DedupKey, TableRecord};
use crate::stream::Stream;
use crate::timestamp;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated trading activity for one calendar day on one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingStatsRecord {
    /// Calendar day the statistics cover (UTC)
    pub date: NaiveDate,
    pub chain: String,
    /// Sum of reported trading volume
    pub daily_volume: f64,
    /// Number of trade entries reported for the day
    pub trades_count: u64,
    /// Distinct trader identifiers among the entries
    #[serde(default)]
    pub unique_traders: u64,
    /// daily_volume / trades_count, zero when there were no trades
    #[serde(default)]
    pub avg_trade_size: f64,
    /// When the collector fetched the day; absent in the oldest tables
    #[serde(default, alias = "timestamp", with = "crate::timestamp::option")]
    pub collected_at: Option<DateTime<Utc>>,
}

impl TradingStatsRecord {
    /// Creates a record, deriving the average trade size.
    #[must_use]
    pub fn new(
        date: NaiveDate,
        chain: impl Into<String>,
        daily_volume: f64,
        trades_count: u64,
        unique_traders: u64,
        collected_at: DateTime<Utc>,
    ) -> Self {
        let avg_trade_size = if trades_count == 0 {
            0.0
        } else {
            daily_volume / trades_count as f64
        };

        Self {
            date,
            chain: chain.into(),
            daily_volume,
            trades_count,
            unique_traders,
            avg_trade_size,
            collected_at: Some(collected_at),
        }
    }

    /// A zero row: the endpoint answered but reported no trades.
    #[must_use]
    pub fn empty(date: NaiveDate, chain: impl Into<String>, collected_at: DateTime<Utc>) -> Self {
        Self::new(date, chain, 0.0, 0, 0, collected_at)
    }
}

impl TableRecord for TradingStatsRecord {
    const STREAM: Stream = Stream::TradingStats;
    const COLUMNS: &'static [&'static str] = &[
        "date",
        "chain",
        "daily_volume",
        "trades_count",
        "unique_traders",
        "avg_trade_size",
        "collected_at",
    ];

    fn dedup_key(&self) -> DedupKey {
        DedupKey::new([self.date.to_string(), self.chain.clone()])
    }

    fn sort_key(&self) -> Option<DateTime<Utc>> {
        Some(timestamp::start_of_day(self.date))
    }

    fn fallback_sort_key(&self) -> Option<DateTime<Utc>> {
        self.collected_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn test_new_computes_average() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let record = TradingStatsRecord::new(day(1), "ethereum", 300.0, 3, 2, now);
        assert_eq!(record.avg_trade_size, 100.0);
        assert_eq!(record.collected_at, Some(now));
    }

    #[test]
    fn test_empty_has_zero_average() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let record = TradingStatsRecord::empty(day(1), "starknet", now);
        assert_eq!(record.trades_count, 0);
        assert_eq!(record.avg_trade_size, 0.0);
    }

    #[test]
    fn test_dedup_key_is_date_and_chain() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let a = TradingStatsRecord::new(day(1), "ethereum", 100.0, 1, 1, now);
        let b = TradingStatsRecord::new(day(1), "ethereum", 150.0, 2, 2, now);
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_eq!(a.dedup_key(), DedupKey::new(["2025-01-01", "ethereum"]));
    }

    #[test]
    fn test_reads_oldest_schema_without_timestamp() {
        let data = "date,chain,daily_volume,trades_count\n2025-01-01,ethereum,100.5,4\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<TradingStatsRecord> =
            reader.deserialize().collect::<Result<_, _>>().unwrap();

        assert_eq!(rows[0].daily_volume, 100.5);
        assert_eq!(rows[0].unique_traders, 0);
        assert!(rows[0].collected_at.is_none());
        assert_eq!(
            rows[0].effective_sort_key(),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_reads_legacy_timestamp_column() {
        let data = "date,chain,daily_volume,trades_count,timestamp\n\
                    2025-01-01,ethereum,1,1,2025-01-02T08:00:00.000001Z\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<TradingStatsRecord> =
            reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert!(rows[0].collected_at.is_some());
    }
}
