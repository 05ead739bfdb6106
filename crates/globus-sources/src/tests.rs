//! Client tests against a throwaway local axum server.

use std::time::Duration;

use axum::{Json, Router, http::StatusCode, routing::get};
use globus_core::source::CountrySource;
use serde_json::json;
use tokio::net::TcpListener;

use crate::{Error, HttpSource, SourceConfig};

async fn serve(app: Router) -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  format!("http://{addr}")
}

fn upstream() -> Router {
  Router::new()
    .route(
      "/countries",
      get(|| async {
        Json(json!([
          {
            "name": "Nigeria",
            "capital": "Abuja",
            "region": "Africa",
            "population": 206139589,
            "flag": "https://flagcdn.com/ng.svg",
            "currencies": [{ "code": "NGN", "name": "Nigerian naira", "symbol": "₦" }],
            "independent": false
          },
          { "name": "Antarctica", "region": "Polar", "population": 1000 },
          { "capital": "Nowhere" }
        ]))
      }),
    )
    .route(
      "/rates",
      get(|| async {
        Json(json!({ "result": "success", "base_code": "USD", "rates": { "USD": 1, "NGN": 1600.5 } }))
      }),
    )
    .route("/rates-missing", get(|| async { Json(json!({ "result": "success" })) }))
    .route(
      "/rates-error",
      get(|| async { Json(json!({ "result": "error", "rates": {} })) }),
    )
    .route(
      "/odd-countries",
      get(|| async {
        Json(json!([
          { "name": "Nigeria", "population": 206139589 },
          { "name": "Weird", "population": -5 },
          { "name": "Floaty", "population": 1.5e6 },
          "not a country"
        ]))
      }),
    )
    .route("/not-a-list", get(|| async { Json(json!({ "message": "rate limited" })) }))
    .route("/broken", get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }))
    .route(
      "/slow",
      get(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Json(json!([]))
      }),
    )
}

fn source(base: &str, countries: &str, rates: &str) -> HttpSource {
  HttpSource::new(SourceConfig {
    countries_url: format!("{base}{countries}"),
    exchange_url:  format!("{base}{rates}"),
    timeout:       Duration::from_millis(500),
  })
  .unwrap()
}

#[tokio::test]
async fn fetches_and_parses_countries() {
  let base = serve(upstream()).await;
  let countries = source(&base, "/countries", "/rates").fetch_countries().await.unwrap();

  assert_eq!(countries.len(), 3);
  let nigeria = &countries[0];
  assert_eq!(nigeria.name.as_deref(), Some("Nigeria"));
  assert_eq!(nigeria.population, Some(206_139_589));
  assert_eq!(nigeria.currencies[0].code.as_deref(), Some("NGN"));

  assert!(countries[1].currencies.is_empty());
  assert!(countries[2].name.is_none());
  assert!(countries[2].population.is_none());
}

#[tokio::test]
async fn unusable_entries_do_not_fail_the_directory() {
  let base = serve(upstream()).await;
  let countries = source(&base, "/odd-countries", "/rates").fetch_countries().await.unwrap();

  assert_eq!(countries.len(), 4);
  assert_eq!(countries[0].population, Some(206_139_589));
  assert_eq!(countries[1].name.as_deref(), Some("Weird"));
  assert_eq!(countries[1].population, None);
  assert_eq!(countries[2].population, None);
  assert!(countries[3].name.is_none());
}

#[tokio::test]
async fn fetches_exchange_rates() {
  let base = serve(upstream()).await;
  let rates = source(&base, "/countries", "/rates").fetch_exchange_rates().await.unwrap();
  assert_eq!(rates.get("NGN"), Some(&1600.5));
  assert_eq!(rates.get("USD"), Some(&1.0));
}

#[tokio::test]
async fn missing_rate_table_is_malformed() {
  let base = serve(upstream()).await;
  let err = source(&base, "/countries", "/rates-missing")
    .fetch_exchange_rates()
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Malformed(_)), "{err:?}");
}

#[tokio::test]
async fn unsuccessful_rate_result_is_malformed() {
  let base = serve(upstream()).await;
  let err = source(&base, "/countries", "/rates-error")
    .fetch_exchange_rates()
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Malformed(_)), "{err:?}");
}

#[tokio::test]
async fn non_list_country_payload_fails() {
  let base = serve(upstream()).await;
  let err = source(&base, "/not-a-list", "/rates").fetch_countries().await.unwrap_err();
  assert!(matches!(err, Error::Request(_)), "{err:?}");
}

#[tokio::test]
async fn error_status_is_reported() {
  let base = serve(upstream()).await;
  let err = source(&base, "/broken", "/rates").fetch_countries().await.unwrap_err();
  match err {
    Error::Status { status, url } => {
      assert_eq!(status, StatusCode::BAD_GATEWAY);
      assert!(url.ends_with("/broken"));
    }
    other => panic!("expected status error, got {other:?}"),
  }
}

#[tokio::test]
async fn slow_upstream_times_out() {
  let base = serve(upstream()).await;
  let err = source(&base, "/slow", "/rates").fetch_countries().await.unwrap_err();
  match err {
    Error::Request(e) => assert!(e.is_timeout(), "{e:?}"),
    other => panic!("expected timeout, got {other:?}"),
  }
}

#[tokio::test]
async fn unreachable_host_fails() {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let err = source(&format!("http://{addr}"), "/countries", "/rates")
    .fetch_countries()
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Request(_)), "{err:?}");
}
