use crate::config::OracleConfig;
use crate::error::SplitzyError;
use crate::models::UnitPrice;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::sleep;

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Current USD price of one unit of `asset_id`. Never cached.
    async fn fetch_unit_price(&self, asset_id: &str) -> Result<UnitPrice, SplitzyError>;
}

/// CoinGecko-style `simple/price` endpoint:
/// `GET {base}/simple/price?ids=ethereum&vs_currencies=usd` →
/// `{"ethereum": {"usd": 2000.12}}`.
pub struct CoinGeckoOracle {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl CoinGeckoOracle {
    pub fn new(config: &OracleConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        })
    }

    async fn fetch_once(&self, asset_id: &str) -> Result<UnitPrice, SplitzyError> {
        let response = self
            .client
            .get(format!("{}/simple/price", self.base_url))
            .query(&[("ids", asset_id), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(|e| SplitzyError::price_fetch(format!("request failed: {}", e), true))?;

        let status = response.status();
        if !status.is_success() {
            let transient = status.is_server_error() || status.as_u16() == 429;
            return Err(SplitzyError::price_fetch(format!("HTTP {}", status), transient));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SplitzyError::price_fetch(format!("reading body failed: {}", e), true))?;

        parse_price(&body, asset_id).map(UnitPrice)
    }
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
    async fn fetch_unit_price(&self, asset_id: &str) -> Result<UnitPrice, SplitzyError> {
        let mut attempt = 0;

        loop {
            match self.fetch_once(asset_id).await {
                Ok(price) => {
                    tracing::info!("{} price: {} (attempt {})", asset_id, price, attempt + 1);
                    return Ok(price);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Price fetch for {} failed: {}; retry {}/{} in {}ms",
                        asset_id,
                        e,
                        attempt,
                        self.max_retries,
                        self.retry_delay.as_millis()
                    );
                    sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

type PriceTable = HashMap<String, Box<RawValue>>;

/// Reads `body[asset_id]["usd"]` from the literal JSON text. The number is
/// taken as a raw token, so it never passes through `f64`.
fn parse_price(body: &str, asset_id: &str) -> Result<Decimal, SplitzyError> {
    let schema = |detail: String| SplitzyError::price_fetch(detail, false);

    let assets: PriceTable =
        serde_json::from_str(body).map_err(|e| schema(format!("invalid JSON body: {}", e)))?;
    let quotes: PriceTable = assets
        .get(asset_id)
        .map(|raw| serde_json::from_str(raw.get()))
        .transpose()
        .map_err(|e| schema(format!("invalid {} entry: {}", asset_id, e)))?
        .ok_or_else(|| schema(format!("response has no {} entry", asset_id)))?;

    let text = quotes
        .get("usd")
        .map(|raw| raw.get().trim())
        .filter(|t| t.starts_with(|c: char| c.is_ascii_digit() || c == '-'))
        .ok_or_else(|| schema(format!("response has no numeric {}.usd field", asset_id)))?;

    let parsed = if text.contains(['e', 'E']) {
        Decimal::from_scientific(text)
    } else {
        Decimal::from_str(text)
    };
    let price = parsed.map_err(|e| schema(format!("unreadable price {}: {}", text, e)))?;

    if price <= Decimal::ZERO {
        return Err(schema(format!("non-positive price {}", text)));
    }

    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nested_usd_field() {
        let body = r#"{"ethereum": {"usd": 2000.12}}"#;
        assert_eq!(parse_price(body, "ethereum").unwrap(), Decimal::from_str("2000.12").unwrap());
    }

    #[test]
    fn integer_price() {
        let body = r#"{"ethereum": {"usd": 3100, "usd_24h_change": -1.5}}"#;
        assert_eq!(parse_price(body, "ethereum").unwrap(), Decimal::from(3100));
    }

    #[test]
    fn keeps_every_digit_of_the_literal() {
        let body = r#"{"ethereum":{"usd":2000.123456789012345678}}"#;
        assert_eq!(
            parse_price(body, "ethereum").unwrap(),
            Decimal::from_str("2000.123456789012345678").unwrap()
        );
    }

    #[test]
    fn scientific_notation() {
        let body = r#"{"ethereum":{"usd":2.5e3}}"#;
        assert_eq!(parse_price(body, "ethereum").unwrap(), Decimal::from(2500));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        for body in [r#"{"ethereum":{"usd":0}}"#, r#"{"ethereum":{"usd":-12.5}}"#] {
            let err = parse_price(body, "ethereum").unwrap_err();
            assert!(matches!(err, SplitzyError::PriceFetchFailure { transient: false, .. }), "{}", body);
        }
    }

    #[test]
    fn missing_asset_is_not_retryable() {
        let err = parse_price("{}", "ethereum").unwrap_err();
        assert!(matches!(err, SplitzyError::PriceFetchFailure { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn string_price_is_schema_deviation() {
        assert!(parse_price(r#"{"ethereum": {"usd": "2000.12"}}"#, "ethereum").is_err());
        assert!(parse_price(r#"{"ethereum": null}"#, "ethereum").is_err());
        assert!(parse_price("not json", "ethereum").is_err());
    }
}
