use mockito::Matcher;
use rust_decimal::Decimal;
use splitzy::config::OracleConfig;
use splitzy::error::SplitzyError;
use splitzy::services::{CoinGeckoOracle, PriceOracle};
use std::str::FromStr;
use std::time::Duration;
use tokio_test::assert_err;

fn oracle(base_url: String, max_retries: u32) -> CoinGeckoOracle {
    CoinGeckoOracle::new(&OracleConfig {
        base_url,
        max_retries,
        retry_delay: Duration::from_millis(5),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn price_query() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("ids".into(), "ethereum".into()),
        Matcher::UrlEncoded("vs_currencies".into(), "usd".into()),
    ])
}

#[tokio::test]
async fn fetches_price_for_asset() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(price_query())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ethereum":{"usd":3456.78}}"#)
        .expect(1)
        .create_async()
        .await;

    let price = oracle(server.url(), 2).fetch_unit_price("ethereum").await.unwrap();

    assert_eq!(price.value(), Decimal::from_str("3456.78").unwrap());
    mock.assert_async().await;
}

#[tokio::test]
async fn recovers_after_transient_failure() {
    let mut server = mockito::Server::new_async().await;
    let unavailable = server
        .mock("GET", "/simple/price")
        .match_query(price_query())
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let available = server
        .mock("GET", "/simple/price")
        .match_query(price_query())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ethereum":{"usd":2500.5}}"#)
        .expect(1)
        .create_async()
        .await;

    let price = oracle(server.url(), 2).fetch_unit_price("ethereum").await.unwrap();

    assert_eq!(price.value(), Decimal::from_str("2500.5").unwrap());
    unavailable.assert_async().await;
    available.assert_async().await;
}

#[tokio::test]
async fn zero_price_is_a_fetch_failure() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ethereum":{"usd":0}}"#)
        .expect(1)
        .create_async()
        .await;

    let err = assert_err!(oracle(server.url(), 2).fetch_unit_price("ethereum").await);

    assert!(matches!(err, SplitzyError::PriceFetchFailure { transient: false, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn zero_retries_aborts_on_first_failure() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(Matcher::Any)
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let err = assert_err!(oracle(server.url(), 0).fetch_unit_price("ethereum").await);

    assert!(matches!(err, SplitzyError::PriceFetchFailure { .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(Matcher::Any)
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let err = assert_err!(oracle(server.url(), 2).fetch_unit_price("ethereum").await);

    assert!(!err.is_retryable());
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_field_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"bitcoin":{"usd":65000}}"#)
        .expect(1)
        .create_async()
        .await;

    let err = assert_err!(oracle(server.url(), 2).fetch_unit_price("ethereum").await);

    assert!(matches!(err, SplitzyError::PriceFetchFailure { transient: false, .. }));
    mock.assert_async().await;
}
