//! Full collection runs against mocked upstream APIs.

use chrono::NaiveDate;
use extended_collector::{Collector, StreamStatus};
use extended_core::{AppConfig, ChainConfig};
use extended_data::{
    FundingRateRecord, MarketRecord, OrderBookSnapshotRecord, Stream, TradingStatsRecord,
    TvlRecord,
};
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()
}

fn chain(server: &MockServer, name: &str, activation: NaiveDate) -> ChainConfig {
    ChainConfig {
        name: name.to_string(),
        markets_url: format!("{}/{name}/markets", server.uri()),
        trading_url: format!("{}/{name}/trading", server.uri()),
        funding_url: Some(format!("{}/{name}/funding", server.uri())),
        orderbook_url: Some(format!("{}/{name}/orderbook", server.uri())),
        activation_date: activation,
    }
}

fn test_config(server: &MockServer, dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.collector.output_dir = dir.path().join("uploads");
    config.collector.lookback_days = 3;
    config.collector.orderbook_market_limit = 1;
    config.http.timeout_secs = 5;
    config.http.max_attempts = 2;
    config.http.base_delay_ms = 1;
    config.http.max_delay_ms = 5;
    config.http.requests_per_second = 1_000;
    config.chains = vec![
        chain(server, "ethereum", NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()),
        chain(server, "starknet", today()),
    ];
    config.tvl_url = format!("{}/tvl", server.uri());
    config
}

async fn mount_markets(server: &MockServer, chain: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{chain}/markets")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "data": [
                {"name": "BTC-USD", "marketStats": {
                    "lastPrice": "101", "bidPrice": "100", "askPrice": "102", "dailyVolume": "5000"
                }},
                {"name": "ETH-USD", "marketStats": {
                    "lastPrice": "3000", "bidPrice": "2999", "askPrice": "3001", "dailyVolume": "100"
                }}
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_per_market(server: &MockServer, chain: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{chain}/funding")))
        .and(query_param("market", "BTC-USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"m": "BTC-USD", "f": "0.0001", "T": 1_735_862_400_000i64}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/{chain}/orderbook")))
        .and(query_param("market", "BTC-USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"market": "BTC-USD", "bid": [["100", "1"]], "ask": [["102", "2"]]}
        })))
        .mount(server)
        .await;
}

async fn mount_trading(server: &MockServer, chain: &str, volume: f64) {
    Mock::given(method("GET"))
        .and(path(format!("/{chain}/trading")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"tradingVolume": volume, "trader": "a"}]
        })))
        .mount(server)
        .await;
}

async fn mount_tvl(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/tvl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tvl": [{"date": 1, "totalLiquidityUSD": 1000.0}],
            "currentChainTvls": {"Ethereum": 700.0, "Starknet": 300.0}
        })))
        .mount(server)
        .await;
}

fn read<R: extended_data::TableRecord>(collector: &Collector) -> Vec<R> {
    collector.store().read::<R>().unwrap().unwrap_or_default()
}

#[tokio::test]
async fn test_full_run_writes_every_stream() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    for chain in ["ethereum", "starknet"] {
        mount_markets(&server, chain).await;
        mount_per_market(&server, chain).await;
        mount_trading(&server, chain, 100.0).await;
    }
    mount_tvl(&server).await;

    let collector = Collector::new(test_config(&server, &dir)).unwrap();
    let summary = collector.run(today()).await;

    assert!(!summary.is_total_failure());
    assert_eq!(summary.failed_requests(), 0);
    for stream in Stream::ALL {
        assert_eq!(summary.outcome(stream).unwrap().status, StreamStatus::Updated, "{stream}");
    }

    let markets: Vec<MarketRecord> = read(&collector);
    assert_eq!(markets.len(), 4);
    assert!(markets.iter().all(|m| m.collected_at == markets[0].collected_at));

    // one market per chain with the limit at 1, highest volume first
    let funding: Vec<FundingRateRecord> = read(&collector);
    assert_eq!(funding.len(), 2);
    assert!(funding.iter().all(|f| f.market == "BTC-USD"));

    let books: Vec<OrderBookSnapshotRecord> = read(&collector);
    assert_eq!(books.len(), 2);
    assert_eq!(books[0].mid_price, 101.0);

    // ethereum: 3 days, starknet: activation day only
    let stats: Vec<TradingStatsRecord> = read(&collector);
    assert_eq!(stats.len(), 4);
    assert_eq!(stats.iter().filter(|s| s.chain == "starknet").count(), 1);
    assert_eq!(stats[0].date, today());

    let tvl: Vec<TvlRecord> = read(&collector);
    assert_eq!(tvl.len(), 3);
    assert!(tvl.iter().any(|t| t.is_total() && t.tvl_usd == 1000.0));
}

#[tokio::test]
async fn test_rerun_overwrites_trading_day() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_tvl(&server).await;
    Mock::given(method("GET"))
        .and(path("/ethereum/trading"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"tradingVolume": 100.0}]
        })))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    mount_trading(&server, "ethereum", 150.0).await;

    let mut config = test_config(&server, &dir);
    config.chains.truncate(1);
    let collector = Collector::new(config).unwrap();

    collector.run(today()).await;
    collector.run(today()).await;

    let stats: Vec<TradingStatsRecord> = read(&collector);
    assert_eq!(stats.len(), 3);
    assert!(stats.iter().all(|s| s.daily_volume == 150.0));
}

#[tokio::test]
async fn test_retry_exhaustion_skips_only_that_stream() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    for chain in ["ethereum", "starknet"] {
        Mock::given(method("GET"))
            .and(path(format!("/{chain}/markets")))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;
        mount_trading(&server, chain, 10.0).await;
    }
    mount_tvl(&server).await;

    let collector = Collector::new(test_config(&server, &dir)).unwrap();
    let summary = collector.run(today()).await;

    let markets = summary.outcome(Stream::Markets).unwrap();
    assert_eq!(markets.status, StreamStatus::Skipped);
    assert_eq!(markets.failed_requests, 2);
    assert!(!collector.store().exists(Stream::Markets));

    // no markets means no per-market requests
    assert_eq!(summary.outcome(Stream::Funding).unwrap().status, StreamStatus::Skipped);
    assert_eq!(summary.outcome(Stream::Funding).unwrap().failed_requests, 0);

    assert_eq!(summary.outcome(Stream::TradingStats).unwrap().status, StreamStatus::Updated);
    assert_eq!(summary.outcome(Stream::Tvl).unwrap().status, StreamStatus::Updated);
    assert!(!summary.is_total_failure());
}

#[tokio::test]
async fn test_all_endpoints_down_is_total_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let collector = Collector::new(test_config(&server, &dir)).unwrap();
    let summary = collector.run(today()).await;

    assert!(summary.is_total_failure());
    assert!(summary.outcomes.iter().all(|o| o.status == StreamStatus::Skipped));
    // 2 markets + 4 trading days + 1 tvl
    assert_eq!(summary.failed_requests(), 7);
}

#[tokio::test]
async fn test_failed_trading_fetch_keeps_existing_row() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_tvl(&server).await;
    mount_trading(&server, "ethereum", 100.0).await;

    let mut config = test_config(&server, &dir);
    config.chains.truncate(1);
    let collector = Collector::new(config.clone()).unwrap();
    collector.run(today()).await;

    let server_down = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server_down)
        .await;
    config.chains[0].trading_url = format!("{}/ethereum/trading", server_down.uri());
    let collector = Collector::new(config).unwrap();
    let summary = collector.run(today()).await;

    assert_eq!(summary.outcome(Stream::TradingStats).unwrap().status, StreamStatus::Skipped);
    let stats: Vec<TradingStatsRecord> = read(&collector);
    assert_eq!(stats.len(), 3);
    assert!(stats.iter().all(|s| s.daily_volume == 100.0));
}

#[tokio::test]
async fn test_malformed_existing_table_is_rebuilt() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_tvl(&server).await;

    let config = test_config(&server, &dir);
    let tvl_path = config.collector.output_dir.join(Stream::Tvl.file_name());
    fs::create_dir_all(&config.collector.output_dir).unwrap();
    fs::write(&tvl_path, "garbage\n\"unterminated,,,\n").unwrap();

    let collector = Collector::new(config).unwrap();
    let summary = collector.run(today()).await;

    let tvl = summary.outcome(Stream::Tvl).unwrap();
    assert_eq!(tvl.status, StreamStatus::Updated);
    assert!(tvl.degraded);
    assert!(tvl.error.as_deref().unwrap().contains("unreadable"));
    assert_eq!(tvl.rows_written, 3);

    let rows: Vec<TvlRecord> = read(&collector);
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_trading_stats_query_parameters() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/starknet/trading"))
        .and(query_param("fromDate", "2025-01-03"))
        .and(query_param("toDate", "2025-01-03"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let collector = Collector::new(test_config(&server, &dir)).unwrap();
    let summary = collector.run(today()).await;

    let stats: Vec<TradingStatsRecord> = read(&collector);
    let starknet: Vec<_> = stats.iter().filter(|s| s.chain == "starknet").collect();
    assert_eq!(starknet.len(), 1);
    assert_eq!(starknet[0].trades_count, 0);
    assert_eq!(summary.outcome(Stream::TradingStats).unwrap().records_fetched, 1);
}
