//! The contract every persisted stream record fulfils.

use crate::stream::Stream;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Values that jointly identify "the same observation" within a stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey(Vec<String>);

impl DedupKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// A row of one stream's table.
///
/// The store relies on three things per stream: the dedup key, the primary
/// sort value, and a secondary timestamp used when the primary is missing
/// (older files may lack the primary column entirely).
pub trait TableRecord: Serialize + DeserializeOwned + Clone {
    /// Stream this record type belongs to.
    const STREAM: Stream;

    /// Header written for this stream, in column order.
    const COLUMNS: &'static [&'static str];

    fn dedup_key(&self) -> DedupKey;

    /// Primary sort value (descending order in the table).
    fn sort_key(&self) -> Option<DateTime<Utc>>;

    /// Secondary sort value, consulted only when [`Self::sort_key`] is `None`.
    fn fallback_sort_key(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// The value the table is actually ordered by.
    fn effective_sort_key(&self) -> Option<DateTime<Utc>> {
        self.sort_key().or_else(|| self.fallback_sort_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_equality() {
        let a = DedupKey::new(["2025-01-01", "ethereum"]);
        let b = DedupKey::new(vec!["2025-01-01".to_string(), "ethereum".to_string()]);
        let c = DedupKey::new(["2025-01-01", "starknet"]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_dedup_key_order_matters() {
        let a = DedupKey::new(["a", "b"]);
        let b = DedupKey::new(["b", "a"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_dedup_key_display() {
        let key = DedupKey::new(["2025-01-01", "ethereum"]);
        assert_eq!(key.to_string(), "(2025-01-01, ethereum)");
    }
}
