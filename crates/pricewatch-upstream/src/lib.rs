pub mod catalog;
pub mod gateway;
pub mod pagination;
pub mod prices;

pub mod mock;

use std::sync::Arc;

use pricewatch_core::config::UpstreamSettings;
use pricewatch_core::errors::ConfigError;

pub use catalog::CatalogClient;
pub use gateway::{Outcome, RequestGateway};
pub use pagination::PaginationEngine;
pub use prices::PriceFetcher;

/// HTTP-backed catalog and price clients sharing one gateway.
pub struct UpstreamClients {
    pub catalog: Arc<CatalogClient>,
    pub prices: Arc<PriceFetcher>,
}

impl UpstreamClients {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, ConfigError> {
        let gateway = Arc::new(RequestGateway::new(settings)?);
        Ok(Self {
            catalog: Arc::new(CatalogClient::new(Arc::clone(&gateway), settings)),
            prices: Arc::new(PriceFetcher::new(gateway, settings)),
        })
    }
}
