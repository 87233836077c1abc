//! Page slicing and price enrichment.

use std::ops::Range;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use pricewatch_core::config::PaginationSettings;
use pricewatch_core::errors::UpstreamError;
use pricewatch_core::items::{EnrichedItem, PageRequest};
use pricewatch_core::source::{CatalogSource, PriceSource};

/// Number of pages needed for `total_items`. Zero for an empty catalog.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}

/// Slice range for the requested page after clamping into `[1, total_pages]`.
///
/// Returns `None` when there are no pages at all.
pub fn page_bounds(total_items: usize, page_size: usize, requested: i64) -> Option<Range<usize>> {
    let pages = total_pages(total_items, page_size);
    if pages == 0 {
        return None;
    }
    let last = i64::try_from(pages).unwrap_or(i64::MAX);
    let page = requested.clamp(1, last) as usize;
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);
    Some(start..end)
}

/// Builds pages of priced items from one catalog snapshot per call.
pub struct PaginationEngine {
    catalog: Arc<dyn CatalogSource>,
    prices: Arc<dyn PriceSource>,
    page_size: usize,
    concurrency: usize,
}

impl PaginationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        prices: Arc<dyn PriceSource>,
        settings: &PaginationSettings,
    ) -> Self {
        Self {
            catalog,
            prices,
            page_size: settings.page_size.max(1),
            concurrency: settings.effective_concurrency(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Priced items for one page, in catalog order.
    ///
    /// Items without price data are dropped. The first transport failure
    /// aborts the whole page; no partial result is returned.
    pub async fn get_page_with_prices(
        &self,
        request: PageRequest,
    ) -> Result<Vec<EnrichedItem>, UpstreamError> {
        let items = self.catalog.all_items().await?;
        let total_items = items.len();

        let Some(range) = page_bounds(total_items, self.page_size, request.page_number) else {
            tracing::debug!(page = request.page_number, "Empty catalog, empty page");
            return Ok(Vec::new());
        };
        let slice_len = range.len();

        let prices = &self.prices;
        let priced: Vec<_> = futures::stream::iter(items.into_iter().skip(range.start).take(slice_len))
            .map(|item| async move {
                let quote = prices.price(item.id).await?;
                Ok::<_, UpstreamError>((item, quote))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let page: Vec<EnrichedItem> = priced
            .into_iter()
            .filter_map(|(item, quote)| quote.map(|q| EnrichedItem::merge(item, Some(q))))
            .collect();

        tracing::info!(
            requested = request.page_number,
            start = range.start,
            slice_len,
            priced = page.len(),
            total_pages = total_pages(total_items, self.page_size),
            "Built price page"
        );
        Ok(page)
    }
}
