use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use core_types::Kline;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

pub mod error;

/// The generic, abstract interface for a historical market-data source.
///
/// The walk-forward harness depends on this trait rather than on a concrete
/// exchange client, so tests can substitute a deterministic stub.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetches historical kline data for the given period. The returned
    /// series covers `[start_time, end_time)` in chronological order.
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Vec<Kline>, ApiError>;
}

/// A concrete implementation of `MarketDataSource` for the Binance spot API.
///
/// Only the public klines endpoint is used; no credentials are required.
#[derive(Clone)]
pub struct BinanceClient {
    client: reqwest::Client,
    base_url: String,
}

const KLINES_PAGE_LIMIT: usize = 1000;

impl BinanceClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.binance.com".to_string(),
        }
    }

    /// Overrides the endpoint; used by integration tests against a local
    /// mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

// Intermediate struct for deserializing klines from the Binance API, which
// returns each bar as a positional JSON array.
#[derive(Deserialize)]
struct RawKline(
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    serde_json::Value,
    serde_json::Value,
    serde_json::Value,
    serde_json::Value,
    serde_json::Value,
);

impl RawKline {
    fn into_kline(self, interval: &str) -> Result<Kline, ApiError> {
        let parse = |s: &str| {
            Decimal::from_str(s).map_err(|e| ApiError::Deserialization(e.to_string()))
        };
        Ok(Kline {
            open_time: Utc
                .timestamp_millis_opt(self.0)
                .single()
                .ok_or_else(|| ApiError::InvalidData(format!("Invalid open_time: {}", self.0)))?,
            open: parse(&self.1)?,
            high: parse(&self.2)?,
            low: parse(&self.3)?,
            close: parse(&self.4)?,
            volume: parse(&self.5)?,
            close_time: Utc
                .timestamp_millis_opt(self.6)
                .single()
                .ok_or_else(|| ApiError::InvalidData(format!("Invalid close_time: {}", self.6)))?,
            interval: interval.to_string(),
        })
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Vec<Kline>, ApiError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let mut klines = Vec::new();
        let mut cursor = start_time.timestamp_millis();
        let end_ms = end_time.timestamp_millis();

        // The endpoint caps each response at 1000 bars; page forward until
        // the requested period is covered.
        while cursor < end_ms {
            let page = self
                .client
                .get(&url)
                .query(&[
                    ("symbol", symbol),
                    ("interval", interval),
                    ("startTime", &cursor.to_string()),
                    ("endTime", &end_ms.to_string()),
                    ("limit", &KLINES_PAGE_LIMIT.to_string()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<RawKline>>()
                .await?;

            if page.is_empty() {
                break;
            }

            let page_len = page.len();
            let last_close = page.last().map(|raw| raw.6).unwrap_or(end_ms);
            for raw in page {
                klines.push(raw.into_kline(interval)?);
            }
            tracing::debug!(symbol, interval, bars = page_len, "fetched kline page");

            if page_len < KLINES_PAGE_LIMIT {
                break;
            }
            // Resume one millisecond after the last bar closed.
            cursor = last_close + 1;
        }

        Ok(klines)
    }
}
