use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pricewatch_core::config::UpstreamSettings;
use pricewatch_core::errors::UpstreamError;
use pricewatch_core::items::PriceQuote;
use pricewatch_core::source::PriceSource;
use serde::Deserialize;
use serde_json::Value;

use crate::gateway::RequestGateway;

/// Body of the per-id latest-price endpoint: `{"data": {"<id>": {...}}}`.
#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    data: HashMap<String, LatestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestEntry {
    high: Option<i64>,
    high_time: Option<i64>,
    low: Option<i64>,
    low_time: Option<i64>,
}

/// Fetches live quotes one item at a time.
pub struct PriceFetcher {
    gateway: Arc<RequestGateway>,
    settings: UpstreamSettings,
}

impl PriceFetcher {
    pub fn new(gateway: Arc<RequestGateway>, settings: &UpstreamSettings) -> Self {
        Self {
            gateway,
            settings: settings.clone(),
        }
    }

    /// Quote for `id`, or `None` when the upstream has no usable price data.
    pub async fn get_price(&self, id: u64) -> Result<Option<PriceQuote>, UpstreamError> {
        let url = self.settings.price_url(id);
        let outcome = self.gateway.fetch(&url, Value::Object(Default::default())).await?;
        let Some(body) = outcome.into_value() else {
            return Ok(None);
        };

        let response: LatestResponse = match serde_json::from_value(body) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(item_id = id, error = %e, "Malformed price response");
                return Ok(None);
            }
        };

        let Some(entry) = response.data.get(&id.to_string()) else {
            tracing::debug!(item_id = id, "No price data for item");
            return Ok(None);
        };

        let quote = PriceQuote::from_parts(entry.high, entry.high_time, entry.low, entry.low_time);
        if quote.is_none() {
            tracing::warn!(
                item_id = id,
                has_high = entry.high.is_some(),
                has_low = entry.low.is_some(),
                "Price entry missing high or low, treating as unavailable"
            );
        }
        Ok(quote)
    }
}

#[async_trait]
impl PriceSource for PriceFetcher {
    async fn price(&self, id: u64) -> Result<Option<PriceQuote>, UpstreamError> {
        self.get_price(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn fetcher_for(server: &MockServer) -> PriceFetcher {
        let settings = UpstreamSettings {
            base_url: server.uri(),
            ..Default::default()
        };
        let gateway = Arc::new(RequestGateway::new(&settings).unwrap());
        PriceFetcher::new(gateway, &settings)
    }

    async fn mount_latest(server: &MockServer, id: u64, body: Value) {
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("id", id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn builds_quote_with_profit_margin() {
        let server = MockServer::start().await;
        mount_latest(
            &server,
            5,
            json!({"data": {"5": {"high": 100, "highTime": 1700000000, "low": 80, "lowTime": 1700000060}}}),
        )
        .await;

        let quote = fetcher_for(&server).await.get_price(5).await.unwrap().unwrap();
        assert_eq!(quote.high_price, 100);
        assert_eq!(quote.low_price, 80);
        assert_eq!(quote.high_time, Some(1_700_000_000));
        assert_eq!(quote.low_time, Some(1_700_000_060));
        assert_eq!(quote.profit_margin, 20);
    }

    #[tokio::test]
    async fn empty_data_map_is_absent() {
        let server = MockServer::start().await;
        mount_latest(&server, 7, json!({"data": {}})).await;

        assert!(fetcher_for(&server).await.get_price(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_key_is_absent() {
        let server = MockServer::start().await;
        mount_latest(&server, 7, json!({"data": {"8": {"high": 1, "low": 1}}})).await;

        assert!(fetcher_for(&server).await.get_price(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn asymmetric_prices_are_absent() {
        let server = MockServer::start().await;
        mount_latest(&server, 3, json!({"data": {"3": {"high": 12, "highTime": 1, "low": null}}})).await;

        assert!(fetcher_for(&server).await.get_price(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(fetcher_for(&server).await.get_price(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unexpected_shape_is_absent() {
        let server = MockServer::start().await;
        mount_latest(&server, 2, json!({"data": [1, 2, 3]})).await;

        assert!(fetcher_for(&server).await.price(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn connection_error_propagates() {
        let settings = UpstreamSettings {
            base_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        };
        let gateway = Arc::new(RequestGateway::new(&settings).unwrap());
        let fetcher = PriceFetcher::new(gateway, &settings);
        let err = fetcher.get_price(1).await.unwrap_err();
        assert_eq!(err.error_kind(), "connection");
    }
}
