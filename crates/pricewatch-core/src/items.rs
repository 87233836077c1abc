//! Catalog items and the price quotes merged into them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire keys a quote contributes to an enriched item.
pub const QUOTE_KEYS: [&str; 5] = ["highPrice", "highTime", "lowPrice", "lowTime", "profit_margin"];

/// One record from the upstream catalog.
///
/// Only `id` is interpreted. Every other source field, `name` included, is
/// kept in `extra` and re-emitted verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ItemRecord {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            extra: Map::new(),
        }
        .with_field("name", Value::String(name.into()))
    }

    /// The source `name`, when present and a string.
    pub fn name(&self) -> Option<&str> {
        self.extra.get("name").and_then(Value::as_str)
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Live high/low trade prices for one item.
///
/// Only constructed when both prices are present, so `profit_margin` is
/// always defined.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub high_price: i64,
    pub high_time: Option<i64>,
    pub low_price: i64,
    pub low_time: Option<i64>,
    #[serde(rename = "profit_margin")]
    pub profit_margin: i64,
}

impl PriceQuote {
    pub fn new(high_price: i64, high_time: Option<i64>, low_price: i64, low_time: Option<i64>) -> Self {
        Self {
            high_price,
            high_time,
            low_price,
            low_time,
            profit_margin: high_price.saturating_sub(low_price),
        }
    }

    /// Build a quote from possibly-missing upstream fields.
    ///
    /// Returns `None` unless both prices are present.
    pub fn from_parts(
        high: Option<i64>,
        high_time: Option<i64>,
        low: Option<i64>,
        low_time: Option<i64>,
    ) -> Option<Self> {
        match (high, low) {
            (Some(high), Some(low)) => Some(Self::new(high, high_time, low, low_time)),
            _ => None,
        }
    }
}

/// A catalog item with its quote fields merged in, when one was available.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnrichedItem {
    #[serde(flatten)]
    pub item: ItemRecord,
    #[serde(flatten)]
    pub quote: Option<PriceQuote>,
}

impl EnrichedItem {
    /// Merge a quote into an item. Quote fields win over same-named source metadata.
    pub fn merge(mut item: ItemRecord, quote: Option<PriceQuote>) -> Self {
        if quote.is_some() {
            for key in QUOTE_KEYS {
                item.extra.remove(key);
            }
        }
        Self { item, quote }
    }

    pub fn id(&self) -> u64 {
        self.item.id
    }
}

/// A request for one page of priced items. Page numbers are 1-based and
/// clamped into range by the pagination engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page_number: 1 }
    }
}
