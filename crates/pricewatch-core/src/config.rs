//! Process configuration.
//!
//! Loaded once at startup, in priority order:
//! 1. Compiled defaults ([`Settings::default()`])
//! 2. An optional JSON file, deep-merged over the defaults
//! 3. `PRICEWATCH_*` environment variables
//!
//! The result is immutable and shared behind an `Arc`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::ConfigError;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
    pub pagination: PaginationSettings,
}

/// Session transport settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Route that upgrades to a WebSocket session.
    pub path: String,
    pub ping_interval_ms: u64,
    /// Close a session when nothing has been heard from the client for this long.
    pub pong_timeout_ms: u64,
    pub max_send_queue: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8888,
            path: "/websocket/".to_string(),
            ping_interval_ms: 10_000,
            pong_timeout_ms: 30_000,
            max_send_queue: 64,
        }
    }
}

impl ServerSettings {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_millis(self.pong_timeout_ms)
    }
}

/// Remote price API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub catalog_path: String,
    pub price_path: String,
    pub user_agent: String,
    /// Contact sent in the `From` header.
    pub from: String,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: "https://prices.runescape.wiki/api/v1/osrs/".to_string(),
            catalog_path: "mapping".to_string(),
            price_path: "latest".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            from: "pricewatch@localhost".to_string(),
            request_timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
        }
    }
}

impl UpstreamSettings {
    pub fn catalog_url(&self) -> String {
        join_url(&self.base_url, &self.catalog_path)
    }

    pub fn price_url(&self, id: u64) -> String {
        format!("{}?id={id}", join_url(&self.base_url, &self.price_path))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationSettings {
    pub page_size: usize,
    /// Upper bound on concurrent price fetches within one page.
    pub price_concurrency: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            price_concurrency: 10,
        }
    }
}

impl PaginationSettings {
    /// Concurrency actually used: at least 1, never more than a page.
    pub fn effective_concurrency(&self) -> usize {
        self.price_concurrency.clamp(1, self.page_size.max(1))
    }
}

impl Settings {
    /// Defaults plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        apply_env_overrides(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults, deep-merged with the JSON file at `path`, plus environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let defaults = serde_json::to_value(Self::default())?;

        let merged = if path.exists() {
            debug!(?path, "loading settings from file");
            let content = std::fs::read_to_string(path)?;
            let user: Value = serde_json::from_str(&content)?;
            deep_merge(defaults, user)
        } else {
            debug!(?path, "settings file not found, using defaults");
            defaults
        };

        let mut settings: Self = serde_json::from_value(merged)?;
        apply_env_overrides(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.page_size == 0 {
            return Err(ConfigError::InvalidValue("pageSize must be at least 1".into()));
        }
        if !self.server.path.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "server path must start with '/', got {:?}",
                self.server.path
            )));
        }
        if !(self.upstream.base_url.starts_with("http://")
            || self.upstream.base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue(format!(
                "baseUrl must be an absolute http(s) URL, got {:?}",
                self.upstream.base_url
            )));
        }
        Ok(())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key, everything else is replaced. Nulls in `source` are skipped.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `PRICEWATCH_*` overrides. Invalid values are ignored with a warning.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Some(v) = read_env_string("PRICEWATCH_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("PRICEWATCH_PORT", 0, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("PRICEWATCH_BASE_URL") {
        settings.upstream.base_url = v;
    }
    if let Some(v) = read_env_string("PRICEWATCH_USER_AGENT") {
        settings.upstream.user_agent = v;
    }
    if let Some(v) = read_env_string("PRICEWATCH_FROM") {
        settings.upstream.from = v;
    }
    if let Some(v) = read_env_u64("PRICEWATCH_REQUEST_TIMEOUT_MS", 100, 600_000) {
        settings.upstream.request_timeout_ms = v;
    }
    if let Some(v) = read_env_usize("PRICEWATCH_PAGE_SIZE", 1, 1_000) {
        settings.pagination.page_size = v;
    }
    if let Some(v) = read_env_usize("PRICEWATCH_PRICE_CONCURRENCY", 1, 1_000) {
        settings.pagination.price_concurrency = v;
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid integer env var, ignoring");
    }
    result
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    read_env_u64(name, u64::from(min), u64::from(max)).and_then(|v| u16::try_from(v).ok())
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    read_env_u64(name, min as u64, max as u64).and_then(|v| usize::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.server.port, 8888);
        assert_eq!(s.server.path, "/websocket/");
        assert_eq!(s.pagination.page_size, 10);
        assert_eq!(s.upstream.user_agent, "Mozilla/5.0");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn urls_join_with_single_slash() {
        let mut up = UpstreamSettings::default();
        assert_eq!(
            up.catalog_url(),
            "https://prices.runescape.wiki/api/v1/osrs/mapping"
        );
        assert_eq!(
            up.price_url(4151),
            "https://prices.runescape.wiki/api/v1/osrs/latest?id=4151"
        );

        up.base_url = "http://127.0.0.1:9000".into();
        up.price_path = "/latest".into();
        assert_eq!(up.price_url(2), "http://127.0.0.1:9000/latest?id=2");
    }

    #[test]
    fn effective_concurrency_is_bounded_by_page() {
        let mut p = PaginationSettings::default();
        p.price_concurrency = 64;
        assert_eq!(p.effective_concurrency(), 10);
        p.price_concurrency = 0;
        assert_eq!(p.effective_concurrency(), 1);
        p.price_concurrency = 4;
        assert_eq!(p.effective_concurrency(), 4);
    }

    #[test]
    fn deep_merge_objects_and_nulls() {
        let target = json!({"a": {"x": 1, "y": 2}, "b": [1, 2]});
        let source = json!({"a": {"y": 3}, "b": [9], "c": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged, json!({"a": {"x": 1, "y": 3}, "b": [9]}));
    }

    #[test]
    fn load_from_file_merges_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"port": 9100}}, "pagination": {{"pageSize": 25}}}}"#
        )
        .unwrap();

        let s = Settings::load_from_path(file.path()).unwrap();
        assert_eq!(s.server.port, 9100);
        assert_eq!(s.server.path, "/websocket/");
        assert_eq!(s.pagination.page_size, 25);
        assert_eq!(s.upstream.catalog_path, "mapping");
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let s = Settings::load_from_path(Path::new("/nonexistent/pricewatch.json")).unwrap();
        assert_eq!(s.pagination.page_size, 10);
    }

    #[test]
    fn load_from_invalid_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = Settings::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut s = Settings::default();
        s.pagination.page_size = 0;
        assert!(matches!(s.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn validate_rejects_relative_base_url() {
        let mut s = Settings::default();
        s.upstream.base_url = "prices.example/api".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("10", 1, 100), Some(10));
        assert_eq!(parse_u64_range(" 7 ", 1, 100), Some(7));
        assert_eq!(parse_u64_range("0", 1, 100), None);
        assert_eq!(parse_u64_range("101", 1, 100), None);
        assert_eq!(parse_u64_range("abc", 1, 100), None);
    }
}
