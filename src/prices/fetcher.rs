//! Price service client
//!
//! One GET per call against `{base_url}/api/prices`, with the window bounds as
//! ISO-8601 UTC strings. No retries; every failure is surfaced to the caller as
//! transport, upstream, malformed or cancelled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use reqwest::header::ACCEPT;
use tokio::sync::watch;

use crate::config::ApiConfig;
use crate::error::{ElprisError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::prices::range::RangeBuilder;
use crate::prices::types::{FetchRange, RawPricePoint};

/// Fixed identifying parameters of every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub base_url: String,
    pub product_id: String,
    pub supplier_id: String,
    pub lean: bool,
    pub include_forecast: bool,
    pub aggregation: String,
    pub aggregation_method: String,
}

impl From<&ApiConfig> for PriceQuery {
    fn from(cfg: &ApiConfig) -> Self {
        Self {
            base_url: cfg.base_url.clone(),
            product_id: cfg.product_id.clone(),
            supplier_id: cfg.supplier_id.clone(),
            lean: cfg.lean,
            include_forecast: cfg.include_forecast,
            aggregation: cfg.aggregation.clone(),
            aggregation_method: cfg.aggregation_method.clone(),
        }
    }
}

/// `2025-10-29T13:00:00.000Z`
pub fn iso_utc(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Full request URL for `range`
pub fn build_request_url(query: &PriceQuery, range: &FetchRange) -> Result<Url> {
    let endpoint = format!("{}/api/prices", query.base_url.trim_end_matches('/'));
    let mut url = Url::parse(&endpoint)
        .map_err(|e| ElprisError::config(format!("Invalid base URL '{}': {}", query.base_url, e)))?;
    url.query_pairs_mut()
        .append_pair("from", &iso_utc(range.from))
        .append_pair("to", &iso_utc(range.to))
        .append_pair("productId", &query.product_id)
        .append_pair("supplierId", &query.supplier_id)
        .append_pair("lean", bool_str(query.lean))
        .append_pair("forecast", bool_str(query.include_forecast))
        .append_pair("aggregation", &query.aggregation)
        .append_pair("aggregationMethod", &query.aggregation_method);
    Ok(url)
}

fn bool_str(v: bool) -> &'static str {
    if v { "true" } else { "false" }
}

/// Decode a response body; anything but a list of price points is malformed
pub fn parse_points(body: &[u8]) -> Result<Vec<RawPricePoint>> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ElprisError::malformed(format!("invalid JSON: {}", e)))?;
    let serde_json::Value::Array(items) = value else {
        return Err(ElprisError::malformed(format!(
            "expected a JSON array, got {}",
            json_kind(&value)
        )));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .map_err(|e| ElprisError::malformed(format!("point {}: {}", i, e)))
        })
        .collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request/response transport; errors mean the request never completed
#[async_trait]
pub trait PriceTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<TransportResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// `timeout_secs == 0` leaves requests unbounded
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("elpris/", env!("CARGO_PKG_VERSION")));
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl PriceTransport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<TransportResponse> {
        let resp = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Ok(TransportResponse {
                status,
                body: Vec::new(),
            });
        }
        let body = resp.bytes().await?.to_vec();
        Ok(TransportResponse { status, body })
    }
}

/// Cooperative cancellation flag shared between a run and whoever may abort it
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|c| *c).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches raw price points for a window
pub struct PriceFetcher {
    transport: Arc<dyn PriceTransport>,
    query: PriceQuery,
    ranges: RangeBuilder,
    logger: StructuredLogger,
}

impl PriceFetcher {
    pub fn new(transport: Arc<dyn PriceTransport>, query: PriceQuery, ranges: RangeBuilder) -> Self {
        Self {
            transport,
            query,
            ranges,
            logger: get_logger("fetcher"),
        }
    }

    pub fn request_url(&self, range: &FetchRange) -> Result<Url> {
        build_request_url(&self.query, range)
    }

    /// Fetch `[current local hour, + lookahead_hours)`
    pub async fn fetch_ahead(
        &self,
        lookahead_hours: u32,
        cancel: Option<&CancelToken>,
    ) -> Result<(FetchRange, Vec<RawPricePoint>)> {
        let range = self.ranges.build_range(lookahead_hours)?;
        let points = self.fetch(&range, cancel).await?;
        Ok((range, points))
    }

    /// Fetch the points of `range` in source order
    pub async fn fetch(
        &self,
        range: &FetchRange,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<RawPricePoint>> {
        let url = self.request_url(range)?;
        self.logger.debug(&format!("GET {}", url));

        let response = match cancel {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(ElprisError::Cancelled);
                }
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        self.logger.info("Price request cancelled");
                        return Err(ElprisError::Cancelled);
                    }
                    res = self.transport.get(&url) => res?,
                }
            }
            None => self.transport.get(&url).await?,
        };

        if !response.is_success() {
            self.logger
                .warn(&format!("Price API returned HTTP {}", response.status));
            return Err(ElprisError::upstream(response.status));
        }

        let points = parse_points(&response.body)?;
        self.logger.debug(&format!(
            "Received {} price points for {}h from {}",
            points.len(),
            range.span().num_hours(),
            iso_utc(range.from)
        ));
        Ok(points)
    }
}
