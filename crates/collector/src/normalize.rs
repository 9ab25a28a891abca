//! Source JSON -> stream records.
//!
//! Every function takes the batch's shared `collected_at` so all records of
//! one pass carry the same collection timestamp. Entries that cannot be read
//! are skipped and logged at debug; only a payload with no recognisable
//! shape at all is an error.

use crate::error::CollectorError;
use crate::payload::{
    envelope_entries, first_i64, first_number, first_string, latest_liquidity, levels, number,
    MarketEntry,
};
use chrono::{DateTime, NaiveDate, Utc};
use extended_data::models::spread_pct;
use extended_data::{
    timestamp, FundingRateRecord, MarketRecord, OrderBookSnapshotRecord, Stream,
    TradingStatsRecord, TvlRecord, TOTAL_CHAIN_LABEL,
};
use serde_json::Value;
use std::collections::HashSet;

const VOLUME_KEYS: &[&str] = &["tradingVolume", "volume", "value"];
const TRADER_KEYS: &[&str] = &["trader", "accountId", "account", "address"];

fn entries(stream: Stream, payload: &Value) -> Result<Vec<&Value>, CollectorError> {
    envelope_entries(payload).ok_or_else(|| {
        CollectorError::malformed(stream, "expected a list or an object with a `data` field")
    })
}

/// Normalizes a markets response for one chain.
///
/// # Errors
/// [`CollectorError::MalformedResponse`] if the payload has no entry list.
pub fn markets(
    chain: &str,
    payload: &Value,
    collected_at: DateTime<Utc>,
) -> Result<Vec<MarketRecord>, CollectorError> {
    let entries = entries(Stream::Markets, payload)?;
    let mut records = Vec::with_capacity(entries.len());

    for entry in entries {
        let market: MarketEntry = match serde_json::from_value(entry.clone()) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(chain, error = %e, "Skipping unreadable market entry");
                continue;
            }
        };
        let s = &market.stats;

        records.push(MarketRecord {
            collected_at,
            chain: chain.to_string(),
            market: market.name.clone(),
            last_price: s.last_price,
            bid_price: s.bid_price,
            ask_price: s.ask_price,
            mark_price: s.mark_price,
            index_price: s.index_price,
            daily_volume: s.daily_volume,
            daily_volume_base: s.daily_volume_base,
            open_interest: s.open_interest,
            funding_rate: s.funding_rate,
            price_change_24h: s.price_change(),
            spread_pct: spread_pct(s.bid_price, s.ask_price, s.last_price),
        });
    }

    Ok(records)
}

/// Aggregates the trade entries reported for one (date, chain).
///
/// An empty list produces a zero row.
///
/// # Errors
/// [`CollectorError::MalformedResponse`] if the payload has no entry list.
pub fn trading_stats(
    date: NaiveDate,
    chain: &str,
    payload: &Value,
    collected_at: DateTime<Utc>,
) -> Result<TradingStatsRecord, CollectorError> {
    let entries = entries(Stream::TradingStats, payload)?;

    let mut volume = 0.0;
    let mut count = 0u64;
    let mut traders = HashSet::new();

    for entry in entries {
        let Some(obj) = entry.as_object() else {
            tracing::debug!(chain, %date, "Skipping non-object trading entry");
            continue;
        };
        volume += first_number(obj, VOLUME_KEYS).unwrap_or(0.0);
        count += 1;
        if let Some(id) = first_string(obj, TRADER_KEYS) {
            traders.insert(id);
        }
    }

    Ok(TradingStatsRecord::new(
        date,
        chain,
        volume,
        count,
        traders.len() as u64,
        collected_at,
    ))
}

/// Normalizes a funding history response for one market.
///
/// Entries without a rate are skipped. An entry without a market name is
/// attributed to `market`.
///
/// # Errors
/// [`CollectorError::MalformedResponse`] if the payload has no entry list.
pub fn funding(
    chain: &str,
    market: &str,
    payload: &Value,
    collected_at: DateTime<Utc>,
) -> Result<Vec<FundingRateRecord>, CollectorError> {
    let entries = entries(Stream::Funding, payload)?;

    let records = entries
        .into_iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let rate = first_number(obj, &["f", "fundingRate"])?;
            let name = first_string(obj, &["m", "market"]).unwrap_or_else(|| market.to_string());
            let funding_time = first_i64(obj, &["T", "fundingTime"]).and_then(timestamp::from_millis);
            Some(FundingRateRecord::new(collected_at, chain, name, rate, funding_time))
        })
        .collect();

    Ok(records)
}

/// Builds an order book snapshot for one market.
///
/// # Errors
/// [`CollectorError::MalformedResponse`] if no book object is present.
pub fn orderbook(
    chain: &str,
    market: &str,
    payload: &Value,
    collected_at: DateTime<Utc>,
) -> Result<OrderBookSnapshotRecord, CollectorError> {
    let book = entries(Stream::OrderBook, payload)?
        .into_iter()
        .find_map(Value::as_object)
        .ok_or_else(|| CollectorError::malformed(Stream::OrderBook, "no order book object"))?;

    let bids = levels(book, &["bid", "bids"]);
    let asks = levels(book, &["ask", "asks"]);
    let name = first_string(book, &["market", "m"]).unwrap_or_else(|| market.to_string());

    Ok(OrderBookSnapshotRecord::new(collected_at, chain, name, &bids, &asks))
}

/// Normalizes the DeFiLlama protocol response: one aggregate row plus one
/// row per reported chain.
///
/// # Errors
/// [`CollectorError::MalformedResponse`] if the payload is not an object.
pub fn tvl(payload: &Value, collected_at: DateTime<Utc>) -> Result<Vec<TvlRecord>, CollectorError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| CollectorError::malformed(Stream::Tvl, "expected an object"))?;

    let total = obj.get("tvl").and_then(latest_liquidity).unwrap_or(0.0);
    let mut records = vec![TvlRecord::new(collected_at, TOTAL_CHAIN_LABEL, total)];

    let per_chain = obj
        .get("currentChainTvls")
        .and_then(Value::as_object)
        .filter(|m| !m.is_empty())
        .map(|m| (m, false))
        .or_else(|| obj.get("chainTvls").and_then(Value::as_object).map(|m| (m, true)));

    if let Some((chains, nested)) = per_chain {
        for (label, value) in chains {
            let amount = if nested { latest_liquidity(value) } else { number(value) };
            match amount {
                Some(amount) => records.push(TvlRecord::new(collected_at, label, amount)),
                None => tracing::debug!(chain = %label, "Skipping unreadable chain TVL"),
            }
        }
    }

    Ok(records)
}
