//! End-to-end collection run.
//!
//! A run walks the streams in a fixed order (markets, funding, order book,
//! trading stats, TVL). Every fetch, normalization and merge failure is
//! contained to the stream it belongs to; the run itself never fails and
//! reports what happened through [`RunSummary`].

use crate::backfill::BackfillScheduler;
use crate::client::FetchClient;
use crate::error::CollectorError;
use crate::normalize;
use chrono::{DateTime, NaiveDate, Utc};
use extended_core::{AppConfig, ChainConfig};
use extended_data::{
    FundingRateRecord, MarketRecord, OrderBookSnapshotRecord, Stream, TableRecord, TableStore,
};
use std::fmt;
use std::fs;

/// How a stream ended up after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Records were fetched and merged into the table
    Updated,
    /// Nothing was fetched; the table was left untouched
    Skipped,
    /// Records were fetched but the table could not be written
    Failed,
}

impl StreamStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// Per-stream result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub stream: Stream,
    pub status: StreamStatus,
    /// Records produced by normalization
    pub records_fetched: usize,
    /// Rows in the table after the merge
    pub rows_written: usize,
    /// Requests that failed after retries, or whose payload was unusable
    pub failed_requests: u32,
    /// Existing table was unreadable and has been rebuilt from this batch
    pub degraded: bool,
    /// Persist error, or why the previous table was discarded
    pub error: Option<String>,
}

impl StreamOutcome {
    fn skipped(stream: Stream, failed_requests: u32) -> Self {
        Self {
            stream,
            status: StreamStatus::Skipped,
            records_fetched: 0,
            rows_written: 0,
            failed_requests,
            degraded: false,
            error: None,
        }
    }
}

impl fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<14} {:<8} fetched={:<6} rows={:<7} failed_requests={}",
            self.stream.as_str(),
            self.status.as_str(),
            self.records_fetched,
            self.rows_written,
            self.failed_requests
        )?;
        if self.degraded {
            write!(f, " (history rebuilt)")?;
        }
        if let Some(err) = &self.error {
            write!(f, " error: {err}")?;
        }
        Ok(())
    }
}

/// Result of one collection run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<StreamOutcome>,
}

impl RunSummary {
    /// True when no stream obtained any records.
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.outcomes.iter().all(|o| o.records_fetched == 0)
    }

    #[must_use]
    pub fn outcome(&self, stream: Stream) -> Option<&StreamOutcome> {
        self.outcomes.iter().find(|o| o.stream == stream)
    }

    #[must_use]
    pub fn records_fetched(&self) -> usize {
        self.outcomes.iter().map(|o| o.records_fetched).sum()
    }

    #[must_use]
    pub fn failed_requests(&self) -> u32 {
        self.outcomes.iter().map(|o| o.failed_requests).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        writeln!(
            f,
            "Collection run finished in {:.1}s: {} records, {} failed requests",
            elapsed.num_milliseconds() as f64 / 1000.0,
            self.records_fetched(),
            self.failed_requests()
        )?;
        for outcome in &self.outcomes {
            writeln!(f, "  {outcome}")?;
        }
        Ok(())
    }
}

/// Records for one stream plus the number of requests that yielded nothing.
struct Fetched<R> {
    records: Vec<R>,
    failed_requests: u32,
}

impl<R> Default for Fetched<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failed_requests: 0,
        }
    }
}

impl<R> Fetched<R> {
    fn absorb(&mut self, result: Result<Vec<R>, CollectorError>, stream: Stream, chain: &str) {
        match result {
            Ok(records) => self.records.extend(records),
            Err(e) => {
                self.failed_requests += 1;
                report(stream, chain, &e);
            }
        }
    }
}

fn report(stream: Stream, chain: &str, err: &CollectorError) {
    if err.is_expected() {
        tracing::warn!(%stream, chain, "Skipping: {}", err);
    } else {
        tracing::error!(%stream, chain, error = ?err, "Unexpected collection failure");
    }
}

/// Drives fetch -> normalize -> merge for every configured stream.
pub struct Collector {
    config: AppConfig,
    client: FetchClient,
    store: TableStore,
    scheduler: BackfillScheduler,
}

impl Collector {
    /// Builds a collector from validated configuration.
    ///
    /// # Errors
    /// [`CollectorError::Configuration`] if the configuration is invalid.
    pub fn new(config: AppConfig) -> Result<Self, CollectorError> {
        config
            .validate()
            .map_err(|e| CollectorError::Configuration(e.to_string()))?;

        let client = FetchClient::new(&config.http)?;
        let store = TableStore::new(config.collector.output_dir.clone());
        let scheduler = BackfillScheduler::from_config(&config);

        Ok(Self {
            config,
            client,
            store,
            scheduler,
        })
    }

    #[must_use]
    pub fn store(&self) -> &TableStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Row cap of a stream's table.
    #[must_use]
    pub fn retention_cap(&self, stream: Stream) -> usize {
        let r = &self.config.retention;
        match stream {
            Stream::Markets => r.markets,
            Stream::TradingStats => r.trading_stats,
            Stream::Funding => r.funding,
            Stream::OrderBook => r.orderbook,
            Stream::Tvl => r.tvl,
        }
    }

    /// Runs one collection pass with `today` as the backfill anchor.
    pub async fn run(&self, today: NaiveDate) -> RunSummary {
        let started_at = Utc::now();
        tracing::info!(
            chains = self.config.chains.len(),
            output_dir = %self.store.root().display(),
            %today,
            "Starting collection run"
        );

        if let Err(e) = fs::create_dir_all(self.store.root()) {
            tracing::warn!(error = %e, "Could not create output directory");
        }

        let collected_at = Utc::now();
        let mut markets = Fetched::<MarketRecord>::default();
        let mut funding = Fetched::<FundingRateRecord>::default();
        let mut orderbook = Fetched::<OrderBookSnapshotRecord>::default();

        for chain in &self.config.chains {
            let top = match self.fetch_markets(chain, collected_at).await {
                Ok(records) => {
                    let top = self.top_markets(&records);
                    markets.records.extend(records);
                    top
                }
                Err(e) => {
                    markets.failed_requests += 1;
                    report(Stream::Markets, &chain.name, &e);
                    continue;
                }
            };
            if top.is_empty() {
                continue;
            }

            if self.config.collector.collect_funding {
                if let Some(url) = &chain.funding_url {
                    for market in &top {
                        let result = self
                            .fetch_per_market(url, market)
                            .await
                            .and_then(|p| normalize::funding(&chain.name, market, &p, collected_at));
                        funding.absorb(result, Stream::Funding, &chain.name);
                    }
                }
            }

            if self.config.collector.collect_orderbook {
                if let Some(url) = &chain.orderbook_url {
                    for market in &top {
                        let result = self
                            .fetch_per_market(url, market)
                            .await
                            .and_then(|p| normalize::orderbook(&chain.name, market, &p, collected_at))
                            .map(|book| vec![book]);
                        orderbook.absorb(result, Stream::OrderBook, &chain.name);
                    }
                }
            }
        }

        let mut outcomes = vec![
            self.persist(markets),
            self.persist(funding),
            self.persist(orderbook),
        ];
        outcomes.push(self.collect_trading_stats(today).await);
        outcomes.push(self.collect_tvl().await);

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        if summary.is_total_failure() {
            tracing::error!("Collection run obtained no records from any stream");
        }
        summary
    }

    async fn fetch_markets(
        &self,
        chain: &ChainConfig,
        collected_at: DateTime<Utc>,
    ) -> Result<Vec<MarketRecord>, CollectorError> {
        let payload = self.client.fetch(&chain.markets_url, &[]).await?;
        let records = normalize::markets(&chain.name, &payload, collected_at)?;
        tracing::info!(chain = %chain.name, markets = records.len(), "Fetched markets");
        Ok(records)
    }

    async fn fetch_per_market(
        &self,
        url: &str,
        market: &str,
    ) -> Result<serde_json::Value, CollectorError> {
        self.client.fetch(url, &[("market", market)]).await
    }

    /// Market names ranked by daily volume, limited for per-market requests.
    fn top_markets(&self, records: &[MarketRecord]) -> Vec<String> {
        let mut ranked: Vec<&MarketRecord> = records.iter().collect();
        ranked.sort_by(|a, b| b.daily_volume.total_cmp(&a.daily_volume));
        ranked
            .into_iter()
            .take(self.config.collector.orderbook_market_limit)
            .map(|r| r.market.clone())
            .collect()
    }

    async fn collect_trading_stats(&self, today: NaiveDate) -> StreamOutcome {
        let tasks = self.scheduler.plan(today);
        tracing::info!(tasks = tasks.len(), "Fetching trading stats");

        let collected_at = Utc::now();
        let mut fetched = Fetched::default();

        for task in tasks {
            let Some(chain) = self.config.chain(&task.chain) else {
                continue;
            };
            let date = task.date.to_string();
            let result = self
                .client
                .fetch(&chain.trading_url, &[("fromDate", date.as_str()), ("toDate", date.as_str())])
                .await
                .and_then(|p| normalize::trading_stats(task.date, &chain.name, &p, collected_at))
                .map(|record| vec![record]);
            fetched.absorb(result, Stream::TradingStats, &chain.name);
        }

        self.persist(fetched)
    }

    async fn collect_tvl(&self) -> StreamOutcome {
        let collected_at = Utc::now();
        let result = self
            .client
            .fetch(&self.config.tvl_url, &[])
            .await
            .and_then(|p| normalize::tvl(&p, collected_at));

        let mut fetched = Fetched::default();
        fetched.absorb(result, Stream::Tvl, "all");
        self.persist(fetched)
    }

    fn persist<R: TableRecord>(&self, fetched: Fetched<R>) -> StreamOutcome {
        let stream = R::STREAM;
        let records_fetched = fetched.records.len();

        if records_fetched == 0 {
            let outcome = StreamOutcome::skipped(stream, fetched.failed_requests);
            if outcome.failed_requests > 0 {
                tracing::warn!("{}", outcome);
            } else {
                tracing::info!("{}", outcome);
            }
            return outcome;
        }

        let outcome = match self.store.apply(fetched.records, self.retention_cap(stream)) {
            Ok(merge) => {
                let degraded = merge.degraded();
                let error = merge.corrupt_reason.map(|reason| {
                    CollectorError::StorageCorruption {
                        path: merge.path,
                        reason,
                    }
                    .to_string()
                });
                StreamOutcome {
                    stream,
                    status: StreamStatus::Updated,
                    records_fetched,
                    rows_written: merge.rows_written,
                    failed_requests: fetched.failed_requests,
                    degraded,
                    error,
                }
            }
            Err(e) => {
                let err = CollectorError::from(e);
                tracing::error!(%stream, error = %err, "Failed to persist stream");
                StreamOutcome {
                    stream,
                    status: StreamStatus::Failed,
                    records_fetched,
                    rows_written: 0,
                    failed_requests: fetched.failed_requests,
                    degraded: false,
                    error: Some(err.to_string()),
                }
            }
        };

        tracing::info!("{}", outcome);
        outcome
    }
}
