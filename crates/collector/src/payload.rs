//! Lenient models of the source API payloads.
//!
//! Upstream responses drift between versions: numbers arrive as JSON
//! numbers, numeric strings or `null`, field names vary, and the payload may
//! be a bare list or wrapped in `{"data": ...}`. Everything here tolerates
//! that and falls back to explicit defaults instead of failing.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Reads a JSON number or numeric string. Anything else is `None`.
#[must_use]
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Reads the first of `keys` present in `obj` as a number.
#[must_use]
pub fn first_number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(number))
}

/// Reads the first of `keys` present in `obj` as a non-empty string.
///
/// Numeric identifiers are accepted and rendered as strings.
#[must_use]
pub fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Reads the first of `keys` present in `obj` as an integer.
#[must_use]
pub fn first_i64(obj: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// serde adapter: number, numeric string, `null` or garbage -> f64 (0 default).
pub fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value).unwrap_or(0.0))
}

/// serde adapter keeping absence distinguishable from zero.
pub fn lenient_opt_f64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value))
}

/// The list of entries carried by a response.
///
/// Accepts a bare array, or an object whose `data` is an array, a single
/// object, or `null` (empty). Returns `None` for any other shape.
#[must_use]
pub fn envelope_entries(value: &Value) -> Option<Vec<&Value>> {
    match value {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Object(obj) => match obj.get("data")? {
            Value::Array(items) => Some(items.iter().collect()),
            data @ Value::Object(_) => Some(vec![data]),
            Value::Null => Some(Vec::new()),
            _ => None,
        },
        _ => None,
    }
}

/// One entry of the markets endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketEntry {
    #[serde(default = "unknown_market", deserialize_with = "market_name")]
    pub name: String,
    #[serde(default, rename = "marketStats", deserialize_with = "null_as_default")]
    pub stats: MarketStats,
}

fn unknown_market() -> String {
    "UNKNOWN".to_string()
}

/// serde adapter: `null`, blank or non-string names read as `UNKNOWN`.
fn market_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => unknown_market(),
    })
}

/// serde adapter: `null` reads as `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `marketStats` block of a market entry. Missing values read as zero.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bid_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ask_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mark_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub index_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub daily_volume: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub daily_volume_base: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open_interest: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub funding_rate: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub daily_price_change_percentage: Option<f64>,
    #[serde(default, rename = "priceChange24h", deserialize_with = "lenient_opt_f64")]
    pub price_change_24h: Option<f64>,
}

impl MarketStats {
    /// 24h price change, preferring the newer field name.
    #[must_use]
    pub fn price_change(&self) -> f64 {
        self.daily_price_change_percentage
            .or(self.price_change_24h)
            .unwrap_or(0.0)
    }
}

/// One order book level: `{price, qty}` (or `p`/`q`, `size`) or `[price, qty]`.
#[must_use]
pub fn level(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Array(pair) => {
            let price = number(pair.first()?)?;
            let qty = pair.get(1).and_then(number).unwrap_or(0.0);
            Some((price, qty))
        }
        Value::Object(obj) => {
            let price = first_number(obj, &["price", "p"])?;
            let qty = first_number(obj, &["qty", "quantity", "size", "q"]).unwrap_or(0.0);
            Some((price, qty))
        }
        _ => None,
    }
}

/// All readable levels of a book side, in payload order.
#[must_use]
pub fn levels(obj: &Map<String, Value>, keys: &[&str]) -> Vec<(f64, f64)> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
        .map(|side| side.iter().filter_map(level).collect())
        .unwrap_or_default()
}

/// Latest `totalLiquidityUSD` of a DeFiLlama series, or a bare number.
#[must_use]
pub fn latest_liquidity(value: &Value) -> Option<f64> {
    match value {
        Value::Array(series) => series
            .iter()
            .rev()
            .find_map(|point| point.get("totalLiquidityUSD").and_then(number)),
        Value::Object(obj) => obj.get("tvl").and_then(latest_liquidity),
        other => number(other),
    }
}
