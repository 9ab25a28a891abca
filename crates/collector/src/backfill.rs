//! Trading-stats backfill planning.
//!
//! Each run re-fetches the last `lookback_days` calendar days (today
//! included) for every chain that already existed on that day. Re-fetching
//! recent days lets late corrections overwrite earlier rows through the
//! (date, chain) dedup key.

use chrono::{Duration, NaiveDate};
use extended_core::{AppConfig, ChainConfig};

/// One (date, chain) pair to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillTask {
    pub date: NaiveDate,
    pub chain: String,
}

/// Deterministic enumeration of backfill tasks.
#[derive(Debug, Clone)]
pub struct BackfillScheduler {
    lookback_days: u32,
    chains: Vec<ChainConfig>,
}

impl BackfillScheduler {
    pub fn new(lookback_days: u32, chains: &[ChainConfig]) -> Self {
        Self {
            lookback_days,
            chains: chains.to_vec(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.collector.lookback_days, &config.chains)
    }

    #[must_use]
    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    /// Tasks for a run anchored at `today`, newest day first, chains in
    /// configuration order within a day.
    ///
    /// Days before a chain's activation date are never emitted.
    #[must_use]
    pub fn plan(&self, today: NaiveDate) -> Vec<BackfillTask> {
        let mut tasks = Vec::new();

        for days_back in 0..self.lookback_days {
            let Some(date) = today.checked_sub_signed(Duration::days(i64::from(days_back))) else {
                break;
            };
            tasks.extend(
                self.chains
                    .iter()
                    .filter(|c| c.is_active_on(date))
                    .map(|c| BackfillTask {
                        date,
                        chain: c.name.clone(),
                    }),
            );
        }

        tasks
    }
}
