//! In-memory sources for deterministic tests without an upstream.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pricewatch_core::errors::UpstreamError;
use pricewatch_core::items::{ItemRecord, PriceQuote};
use pricewatch_core::source::{CatalogSource, PriceSource};

/// Catalog that always returns the same items, or always fails.
pub struct StaticCatalog {
    items: Vec<ItemRecord>,
    fail: bool,
    call_count: AtomicUsize,
}

impl StaticCatalog {
    pub fn new(items: Vec<ItemRecord>) -> Self {
        Self {
            items,
            fail: false,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Catalog with ids `1..=n`, named `item-<id>`.
    pub fn numbered(n: u64) -> Self {
        Self::new((1..=n).map(|id| ItemRecord::new(id, format!("item-{id}"))).collect())
    }

    pub fn failing() -> Self {
        Self {
            items: Vec::new(),
            fail: true,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn all_items(&self) -> Result<Vec<ItemRecord>, UpstreamError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(UpstreamError::Connection {
                url: "mock://catalog".into(),
                reason: "scripted failure".into(),
            });
        }
        Ok(self.items.clone())
    }
}

/// Price source with per-id scripted quotes, failures and delays.
/// Ids without a scripted quote have no price data.
#[derive(Default)]
pub struct ScriptedPrices {
    quotes: HashMap<u64, PriceQuote>,
    failures: HashSet<u64>,
    delays: HashMap<u64, Duration>,
    call_count: AtomicUsize,
}

impl ScriptedPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quote(mut self, id: u64, high: i64, low: i64) -> Self {
        self.quotes.insert(id, PriceQuote::new(high, Some(0), low, Some(0)));
        self
    }

    pub fn fail(mut self, id: u64) -> Self {
        self.failures.insert(id);
        self
    }

    pub fn delay(mut self, id: u64, delay: Duration) -> Self {
        self.delays.insert(id, delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PriceSource for ScriptedPrices {
    async fn price(&self, id: u64) -> Result<Option<PriceQuote>, UpstreamError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failures.contains(&id) {
            return Err(UpstreamError::Connection {
                url: format!("mock://latest?id={id}"),
                reason: "scripted failure".into(),
            });
        }
        Ok(self.quotes.get(&id).cloned())
    }
}
