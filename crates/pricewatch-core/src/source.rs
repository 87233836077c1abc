use async_trait::async_trait;

use crate::errors::UpstreamError;
use crate::items::{ItemRecord, PriceQuote};

/// Supplies the full item catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch one consistent snapshot of the catalog.
    async fn all_items(&self) -> Result<Vec<ItemRecord>, UpstreamError>;
}

/// Supplies a live quote for one item.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// `Ok(None)` means no price data is available for `id`.
    async fn price(&self, id: u64) -> Result<Option<PriceQuote>, UpstreamError>;
}
