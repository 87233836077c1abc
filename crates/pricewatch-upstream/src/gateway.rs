use std::time::{Duration, Instant};

use pricewatch_core::config::UpstreamSettings;
use pricewatch_core::errors::{ConfigError, UpstreamError};
use reqwest::header::{HeaderMap, HeaderValue, FROM, USER_AGENT};
use reqwest::Client;
use serde_json::Value;

/// Classified result of one upstream GET.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// 2xx with a non-empty JSON body.
    Data(Value),
    /// 2xx with an empty or falsy body; carries the caller's fallback.
    Default(Value),
    /// Non-2xx status or an undecodable body. No data, not an error.
    Failure,
}

impl Outcome {
    /// The body or fallback, if any.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Data(v) | Self::Default(v) => Some(v),
            Self::Failure => None,
        }
    }
}

/// Performs single-attempt GETs against the price API with fixed identification headers.
pub struct RequestGateway {
    client: Client,
    timeout: Duration,
}

impl RequestGateway {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("userAgent", &settings.user_agent)?);
        headers.insert(FROM, header_value("from", &settings.from)?);

        let timeout = settings.request_timeout();
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(settings.connect_timeout())
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    /// Issue one GET and classify the response.
    ///
    /// Only transport failures (DNS, refused, reset, timeout) are errors.
    /// Logs exactly one line per call.
    pub async fn fetch(&self, url: &str, default: Value) -> Result<Outcome, UpstreamError> {
        let started = Instant::now();

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return Err(self.transport_error(url, e, started)),
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                url,
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Upstream request failed"
            );
            return Ok(Outcome::Failure);
        }

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return Err(self.transport_error(url, e, started)),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if body.is_empty() {
            tracing::info!(url, status = status.as_u16(), elapsed_ms, "Upstream request returned empty body");
            return Ok(Outcome::Default(default));
        }

        match serde_json::from_slice::<Value>(&body) {
            Ok(value) if is_falsy(&value) => {
                tracing::info!(url, status = status.as_u16(), elapsed_ms, "Upstream request returned empty body");
                Ok(Outcome::Default(default))
            }
            Ok(value) => {
                tracing::info!(url, status = status.as_u16(), elapsed_ms, "Successful upstream request");
                Ok(Outcome::Data(value))
            }
            Err(e) => {
                tracing::warn!(
                    url,
                    status = status.as_u16(),
                    elapsed_ms,
                    error = %e,
                    "Upstream returned malformed body"
                );
                Ok(Outcome::Failure)
            }
        }
    }

    fn transport_error(&self, url: &str, e: reqwest::Error, started: Instant) -> UpstreamError {
        let err = if e.is_timeout() {
            UpstreamError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            UpstreamError::Connection {
                url: url.to_string(),
                reason: e.to_string(),
            }
        };
        tracing::error!(
            url,
            error_kind = err.error_kind(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            error = %e,
            "Connection error reaching upstream"
        );
        err
    }
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value)
        .map_err(|_| ConfigError::InvalidValue(format!("{field} is not a valid header value")))
}

/// JSON values treated as "no data": null, false, 0, "", [] and {}.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway() -> RequestGateway {
        RequestGateway::new(&UpstreamSettings::default()).unwrap()
    }

    #[test]
    fn falsy_values() {
        for v in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert!(is_falsy(&v), "{v} should be falsy");
        }
        for v in [json!(true), json!(1), json!("x"), json!([0]), json!({"a": null})] {
            assert!(!is_falsy(&v), "{v} should not be falsy");
        }
    }

    #[test]
    fn rejects_invalid_header_values() {
        let settings = UpstreamSettings {
            from: "bad\nvalue".into(),
            ..Default::default()
        };
        assert!(RequestGateway::new(&settings).is_err());
    }

    #[tokio::test]
    async fn success_with_body_is_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mapping"))
            .and(header("user-agent", "Mozilla/5.0"))
            .and(header("from", "pricewatch@localhost"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = gateway()
            .fetch(&format!("{}/mapping", server.uri()), json!([]))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Data(json!([{"id": 1}])));
    }

    #[tokio::test]
    async fn success_with_empty_body_is_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/falsy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let gw = gateway();
        let empty = gw.fetch(&format!("{}/empty", server.uri()), json!([])).await.unwrap();
        assert_eq!(empty, Outcome::Default(json!([])));

        let falsy = gw
            .fetch(&format!("{}/falsy", server.uri()), json!({"data": {}}))
            .await
            .unwrap();
        assert_eq!(falsy, Outcome::Default(json!({"data": {}})));
    }

    #[tokio::test]
    async fn non_success_status_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let outcome = gateway()
            .fetch(&format!("{}/latest?id=1", server.uri()), json!([]))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Failure);
        assert_eq!(outcome.into_value(), None);
    }

    #[tokio::test]
    async fn undecodable_body_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let outcome = gateway().fetch(&server.uri(), json!([])).await.unwrap();
        assert_eq!(outcome, Outcome::Failure);
    }

    #[tokio::test]
    async fn refused_connection_is_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = gateway()
            .fetch(&format!("http://127.0.0.1:{port}/mapping"), json!([]))
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "connection");
        assert!(err.url().ends_with("/mapping"));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": 1}]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let settings = UpstreamSettings {
            request_timeout_ms: 100,
            ..Default::default()
        };
        let gw = RequestGateway::new(&settings).unwrap();
        let err = gw.fetch(&server.uri(), json!([])).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout { .. }), "got {err:?}");
    }
}
