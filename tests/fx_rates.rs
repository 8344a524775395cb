//! FX rate provider tests
//!
//! Exercise the HTTP rate provider against a local mock server; no
//! database or network required.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fincore::domain::CurrencyCode;
use fincore::fx::{CurrencyConverter, FxError, HttpRateProvider, RateProvider};

async fn mock_rates_server(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_http_provider_parses_rate_table() {
    let server = mock_rates_server(serde_json::json!({
        "base": "USD",
        "rates": { "USD": 1.0, "EUR": 0.92, "NGN": 1500.0 }
    }))
    .await;

    let provider = HttpRateProvider::new(format!("{}/rates", server.uri()));
    let rates = provider.fetch_rates().await.expect("fetch failed");

    assert_eq!(rates["EUR"].round_dp(8), dec!(0.92));
    assert_eq!(rates["NGN"].round_dp(8), dec!(1500));
}

#[tokio::test]
async fn test_http_provider_rejects_empty_table() {
    let server = mock_rates_server(serde_json::json!({ "rates": {} })).await;

    let provider = HttpRateProvider::new(format!("{}/rates", server.uri()));
    let result = provider.fetch_rates().await;

    assert!(matches!(result, Err(FxError::Malformed(_))));
}

#[tokio::test]
async fn test_converter_end_to_end_over_http() {
    let server = mock_rates_server(serde_json::json!({
        "rates": { "USD": 1.0, "EUR": 0.92 }
    }))
    .await;

    let converter = CurrencyConverter::new(
        Arc::new(HttpRateProvider::new(format!("{}/rates", server.uri()))),
        Duration::from_secs(3600),
    );

    let usd = CurrencyCode::usd();
    let eur = CurrencyCode::new("EUR").unwrap();

    let converted = converter.convert(dec!(100), &usd, &eur).await.unwrap();
    assert_eq!(converted, dec!(92));

    // Crypto fallback is merged into the fetched table
    let btc = CurrencyCode::new("BTC").unwrap();
    let rate = converter.get_exchange_rate(&btc, &usd).await.unwrap();
    assert!(rate > dec!(1000));
}

#[tokio::test]
async fn test_converter_serves_stale_table_when_upstream_dies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rates": { "USD": 1.0, "EUR": 0.92 }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rates"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    // TTL of zero: every lookup re-fetches
    let converter = CurrencyConverter::new(
        Arc::new(HttpRateProvider::new(format!("{}/rates", server.uri()))),
        Duration::from_secs(0),
    );

    let usd = CurrencyCode::usd();
    let eur = CurrencyCode::new("EUR").unwrap();

    // First lookup populates the cache from the one good response
    let rate = converter.get_exchange_rate(&usd, &eur).await.unwrap();
    assert_eq!(rate.round_dp(8), dec!(0.92));

    // Upstream now failing: the last good table keeps serving
    let rate = converter.get_exchange_rate(&usd, &eur).await.unwrap();
    assert_eq!(rate.round_dp(8), dec!(0.92));
}
