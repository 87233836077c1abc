use std::sync::Arc;

use async_trait::async_trait;
use pricewatch_core::config::UpstreamSettings;
use pricewatch_core::errors::UpstreamError;
use pricewatch_core::items::ItemRecord;
use pricewatch_core::source::CatalogSource;
use serde_json::Value;

use crate::gateway::RequestGateway;

/// Fetches the full item catalog from the mapping endpoint.
pub struct CatalogClient {
    gateway: Arc<RequestGateway>,
    url: String,
}

impl CatalogClient {
    pub fn new(gateway: Arc<RequestGateway>, settings: &UpstreamSettings) -> Self {
        Self {
            gateway,
            url: settings.catalog_url(),
        }
    }

    /// One catalog snapshot. An unavailable or malformed catalog is empty;
    /// a transport failure propagates.
    pub async fn get_all_items(&self) -> Result<Vec<ItemRecord>, UpstreamError> {
        let outcome = self.gateway.fetch(&self.url, Value::Array(Vec::new())).await?;
        let Some(body) = outcome.into_value() else {
            return Ok(Vec::new());
        };

        match serde_json::from_value::<Vec<ItemRecord>>(body) {
            Ok(items) => {
                tracing::debug!(count = items.len(), "Fetched catalog");
                Ok(items)
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Catalog body is not a list of items");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn all_items(&self) -> Result<Vec<ItemRecord>, UpstreamError> {
        self.get_all_items().await
    }
}
