//! Rate sources and their response parsers.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use kurs_common::{Anchor, RateTable};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{FxError, FxResult};

/// Name of the RUB-anchored source in logs and errors.
pub const CBR_SOURCE: &str = "cbr";

/// Name of the USD-anchored source in logs and errors.
pub const OPEN_ER_SOURCE: &str = "open-er";

/// Codes the RUB-anchored source must mostly cover.
pub const CBR_REQUIRED: &[&str] = &["USD", "EUR", "GBP", "CNY"];

/// Codes the USD-anchored source must mostly cover.
pub const OPEN_ER_REQUIRED: &[&str] = &["USD", "EUR", "RUB", "GBP", "JPY", "CNY", "TRY"];

/// Minimum number of required codes a response must contain.
pub const MIN_COVERAGE: usize = 3;

const USER_AGENT_VALUE: &str = concat!("kurs/", env!("CARGO_PKG_VERSION"));

/// A source of one anchored rate table.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &'static str;

    /// Anchor of the tables this source produces.
    fn anchor(&self) -> Anchor;

    /// Codes used for the coverage check.
    fn required_codes(&self) -> &'static [&'static str] {
        match self.anchor() {
            Anchor::Rub => CBR_REQUIRED,
            Anchor::Usd => OPEN_ER_REQUIRED,
        }
    }

    /// Fetch and parse a table without judging its coverage.
    async fn fetch_table(&self) -> FxResult<RateTable>;

    /// Fetch a table and reject it when coverage is insufficient.
    async fn fetch_checked(&self) -> FxResult<RateTable> {
        let table = self.fetch_table().await?;
        check_coverage(self.name(), &table, self.required_codes())?;
        Ok(table)
    }
}

/// Build the HTTP client shared by both sources. Requests bypass caches.
pub fn http_client(request_timeout: Duration) -> FxResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(request_timeout)
        .build()
        .map_err(|e| FxError::network("http-client", format!("failed to create HTTP client: {e}")))
}

/// Reject a table that holds fewer than [`MIN_COVERAGE`] of `required`.
pub fn check_coverage(source_name: &'static str, table: &RateTable, required: &[&str]) -> FxResult<()> {
    let found = table.coverage(required);
    if found < MIN_COVERAGE {
        return Err(FxError::InsufficientData {
            source_name,
            anchor: table.anchor(),
            found,
            required: MIN_COVERAGE,
        });
    }
    Ok(())
}

async fn get_body(client: &reqwest::Client, url: &str, source_name: &'static str) -> FxResult<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FxError::network(source_name, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FxError::network(source_name, format!("HTTP status {status}")));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| FxError::network(source_name, e.to_string()))?;

    Ok(body.to_vec())
}

/// The CBR daily JSON document. Only `Valute` is used.
#[derive(Debug, Deserialize)]
struct CbrResponse {
    #[serde(rename = "Valute")]
    valute: HashMap<String, Value>,
}

/// Parse a CBR response into a RUB-anchored table.
///
/// Each entry contributes `Value / Nominal`. Entries with a missing or
/// non-numeric field, or a zero nominal, are skipped.
pub fn parse_cbr_body(body: &[u8]) -> FxResult<RateTable> {
    let response: CbrResponse =
        serde_json::from_slice(body).map_err(|e| FxError::parse(CBR_SOURCE, e.to_string()))?;

    let mut table = RateTable::new(Anchor::Rub);
    for (code, entry) in &response.valute {
        let value = entry.get("Value").and_then(Value::as_f64);
        let nominal = entry.get("Nominal").and_then(Value::as_u64);

        match (value, nominal) {
            (Some(value), Some(nominal)) if nominal > 0 => {
                table.insert(code.as_str(), value / nominal as f64);
            }
            _ => debug!(code = %code, "Skipping malformed CBR entry"),
        }
    }

    Ok(table)
}

#[derive(Debug, Deserialize)]
struct OpenErResponse {
    rates: HashMap<String, f64>,
}

/// Parse an open exchange-rate response into a USD-anchored table.
pub fn parse_open_er_body(body: &[u8]) -> FxResult<RateTable> {
    let response: OpenErResponse =
        serde_json::from_slice(body).map_err(|e| FxError::parse(OPEN_ER_SOURCE, e.to_string()))?;

    Ok(RateTable::from_rates(Anchor::Usd, response.rates))
}

/// RUB-anchored source backed by the CBR daily JSON feed.
pub struct CbrSource {
    client: reqwest::Client,
    url: String,
}

impl CbrSource {
    /// Create a new CBR source.
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl RateSource for CbrSource {
    fn name(&self) -> &'static str {
        CBR_SOURCE
    }

    fn anchor(&self) -> Anchor {
        Anchor::Rub
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_table(&self) -> FxResult<RateTable> {
        let body = get_body(&self.client, &self.url, CBR_SOURCE).await?;
        parse_cbr_body(&body)
    }
}

/// USD-anchored source backed by the open exchange-rate API.
pub struct OpenErSource {
    client: reqwest::Client,
    url: String,
}

impl OpenErSource {
    /// Create a new open exchange-rate source.
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl RateSource for OpenErSource {
    fn name(&self) -> &'static str {
        OPEN_ER_SOURCE
    }

    fn anchor(&self) -> Anchor {
        Anchor::Usd
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_table(&self) -> FxResult<RateTable> {
        let body = get_body(&self.client, &self.url, OPEN_ER_SOURCE).await?;
        parse_open_er_body(&body)
    }
}

/// How a [`MockRateSource`] answers.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Answer immediately with the table.
    Respond(RateTable),
    /// Answer with the table after a delay.
    Delayed(Duration, RateTable),
    /// Fail with a network error.
    NetworkDown,
    /// Fail with a parse error.
    Garbage,
    /// Never answer.
    Hang,
}

/// Mock rate source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateSource {
    name: &'static str,
    anchor: Anchor,
    behavior: parking_lot::Mutex<MockBehavior>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateSource {
    /// Create a new mock source.
    pub fn new(name: &'static str, anchor: Anchor, behavior: MockBehavior) -> Self {
        Self {
            name,
            anchor,
            behavior: parking_lot::Mutex::new(behavior),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Mock RUB-anchored source answering with `rates`.
    pub fn rub(rates: &[(&str, f64)]) -> Self {
        Self::new(
            CBR_SOURCE,
            Anchor::Rub,
            MockBehavior::Respond(RateTable::from_rates(Anchor::Rub, rates.iter().copied())),
        )
    }

    /// Mock USD-anchored source answering with `rates`.
    pub fn usd(rates: &[(&str, f64)]) -> Self {
        Self::new(
            OPEN_ER_SOURCE,
            Anchor::Usd,
            MockBehavior::Respond(RateTable::from_rates(Anchor::Usd, rates.iter().copied())),
        )
    }

    /// Change how the source answers.
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Number of fetches started.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateSource for MockRateSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn anchor(&self) -> Anchor {
        self.anchor
    }

    async fn fetch_table(&self) -> FxResult<RateTable> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let behavior = self.behavior.lock().clone();

        match behavior {
            MockBehavior::Respond(table) => Ok(table),
            MockBehavior::Delayed(delay, table) => {
                tokio::time::sleep(delay).await;
                Ok(table)
            }
            MockBehavior::NetworkDown => Err(FxError::network(self.name, "connection refused")),
            MockBehavior::Garbage => Err(FxError::parse(self.name, "expected value at line 1")),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxErrorKind;

    const CBR_BODY: &str = r#"{
        "Date": "2024-03-01T11:30:00+03:00",
        "Valute": {
            "USD": {"CharCode": "USD", "Nominal": 1, "Value": 91.5},
            "EUR": {"CharCode": "EUR", "Nominal": 1, "Value": 99.0},
            "JPY": {"CharCode": "JPY", "Nominal": 100, "Value": 61.0},
            "CNY": {"CharCode": "CNY", "Nominal": 1, "Value": 12.7},
            "BAD": {"CharCode": "BAD", "Nominal": 0, "Value": 5.0},
            "XXX": {"CharCode": "XXX", "Value": 5.0}
        }
    }"#;

    #[test]
    fn test_parse_cbr_applies_nominal() {
        let table = parse_cbr_body(CBR_BODY.as_bytes()).unwrap();

        assert_eq!(table.anchor(), Anchor::Rub);
        assert_eq!(table.get("RUB"), Some(1.0));
        assert_eq!(table.get("USD"), Some(91.5));
        assert!((table.get("JPY").unwrap() - 0.61).abs() < 1e-12);
        assert!(!table.contains("BAD"));
        assert!(!table.contains("XXX"));
        assert_eq!(table.coverage(CBR_REQUIRED), 3);
    }

    #[test]
    fn test_parse_cbr_rejects_missing_valute() {
        let err = parse_cbr_body(br#"{"Date": "2024-03-01"}"#).unwrap_err();
        assert_eq!(err.kind(), FxErrorKind::ParseFailure);

        let err = parse_cbr_body(b"<html>").unwrap_err();
        assert_eq!(err.kind(), FxErrorKind::ParseFailure);
    }

    #[test]
    fn test_parse_open_er() {
        let body = br#"{"result": "success", "base_code": "USD", "rates": {"USD": 1, "EUR": 0.92, "RUB": 90.1, "BAD": -1}}"#;
        let table = parse_open_er_body(body).unwrap();

        assert_eq!(table.anchor(), Anchor::Usd);
        assert_eq!(table.get("USD"), Some(1.0));
        assert_eq!(table.get("RUB"), Some(90.1));
        assert!(!table.contains("BAD"));
    }

    #[test]
    fn test_coverage_threshold() {
        let table = RateTable::from_rates(Anchor::Rub, [("USD", 90.0), ("EUR", 98.0)]);
        let err = check_coverage(CBR_SOURCE, &table, CBR_REQUIRED).unwrap_err();
        assert!(matches!(err, FxError::InsufficientData { found: 2, .. }));

        let table = RateTable::from_rates(Anchor::Rub, [("USD", 90.0), ("EUR", 98.0), ("GBP", 115.0)]);
        assert!(check_coverage(CBR_SOURCE, &table, CBR_REQUIRED).is_ok());
    }

    #[tokio::test]
    async fn test_mock_fetch_checked() {
        let source = MockRateSource::rub(&[("USD", 90.0), ("EUR", 98.0)]);
        let err = source.fetch_checked().await.unwrap_err();
        assert_eq!(err.kind(), FxErrorKind::InsufficientData);
        assert_eq!(source.calls(), 1);

        source.set_behavior(MockBehavior::NetworkDown);
        let err = source.fetch_checked().await.unwrap_err();
        assert_eq!(err.kind(), FxErrorKind::NetworkFailure);
    }

    #[test]
    fn test_http_client_builds() {
        assert!(http_client(Duration::from_secs(7)).is_ok());
    }
}
