//! Async HTTP client fetching order records from the upstream API.

use std::time::Duration;

use anyhow::{Context, Result};
use ordertrail_core::reconcile::{OrderSource, SourceError};
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value, json};

use crate::settings::{ORDER_ID_PLACEHOLDER, UpstreamConfig};

/// Fetches every order and its task details with a bearer token.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpOrderSource {
  client: Client,
  config: UpstreamConfig,
  token:  String,
}

impl HttpOrderSource {
  pub fn new(config: UpstreamConfig, token: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config, token: token.into() })
  }

  /// The details URL for one order. Every query value equal to the
  /// placeholder is replaced by the form-encoded reference number.
  fn details_url(&self, reference_number: &str) -> Result<Url, SourceError> {
    let mut url = Url::parse(&self.config.details_url_template).map_err(SourceError::failed)?;
    if url.query().is_none() {
      return Ok(url);
    }

    let pairs: Vec<(String, String)> = url
      .query_pairs()
      .map(|(k, v)| {
        let v = if v == ORDER_ID_PLACEHOLDER { reference_number.to_owned() } else { v.into_owned() };
        (k.into_owned(), v)
      })
      .collect();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(url)
  }

  async fn get_json(&self, url: Url) -> Result<Value, SourceError> {
    let resp = self
      .client
      .get(url.clone())
      .bearer_auth(&self.token)
      .send()
      .await
      .map_err(SourceError::failed)?;

    match resp.status() {
      StatusCode::UNAUTHORIZED => Err(SourceError::Unauthorized),
      status if !status.is_success() => {
        Err(SourceError::failed(format!("GET {url} → {status}")))
      }
      _ => resp.json().await.map_err(SourceError::failed),
    }
  }
}

impl OrderSource for HttpOrderSource {
  /// `GET orders_url`, then `GET details_url` for each reference number.
  ///
  /// Each record is `{"order": <order>, "details": <details>}`. Orders without
  /// a reference number are passed through with empty details.
  async fn fetch_orders(&self) -> Result<Vec<Value>, SourceError> {
    let orders_url = Url::parse(&self.config.orders_url).map_err(SourceError::failed)?;
    let body = self.get_json(orders_url).await?;
    let Some(orders) = body.get("response").and_then(Value::as_array) else {
      return Err(SourceError::failed("orders response has no `response` array"));
    };

    let mut records = Vec::with_capacity(orders.len());
    for order in orders {
      let details = match order.get("referenceNumber").and_then(Value::as_str) {
        Some(rn) => self.get_json(self.details_url(rn)?).await?,
        None => Value::Object(Map::new()),
      };
      records.push(json!({ "order": order, "details": details }));
    }
    Ok(records)
  }
}

#[cfg(test)]
mod tests {
  use axum::{
    Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode},
    routing::get,
  };
  use serde::Deserialize;
  use tokio::net::TcpListener;

  use super::*;

  const TOKEN: &str = "good-token";

  fn authorised(headers: &HeaderMap) -> bool {
    headers
      .get("authorization")
      .and_then(|v| v.to_str().ok())
      .is_some_and(|v| v == format!("Bearer {TOKEN}"))
  }

  #[derive(Deserialize)]
  struct TaskParams {
    #[serde(rename = "referenceNumber")]
    reference_number: String,
  }

  async fn orders(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !authorised(&headers) {
      return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
      "response": [
        { "referenceNumber": "RN1", "orderStatus": "BOOKED" },
        { "referenceNumber": "RN2", "orderStatus": "DELIVERED" }
      ]
    })))
  }

  async fn tasks(headers: HeaderMap, Query(p): Query<TaskParams>) -> Result<Json<Value>, StatusCode> {
    if !authorised(&headers) {
      return Err(StatusCode::UNAUTHORIZED);
    }
    if p.reference_number == "RN2" {
      return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({ "tasks": { "scheduling": { "deliveryType": "PICKUP_SERVICE_CENTER" } } })))
  }

  /// Serve a fake upstream on an ephemeral port and return its base URL.
  async fn upstream(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
  }

  fn source(base: &str, token: &str) -> HttpOrderSource {
    HttpOrderSource::new(
      UpstreamConfig {
        orders_url:           format!("{base}/orders"),
        details_url_template: format!("{base}/tasks?referenceNumber={{ORDER_ID}}"),
        access_token:         None,
      },
      token,
    )
    .unwrap()
  }

  #[tokio::test]
  async fn combines_orders_with_details() {
    let app = Router::new()
      .route("/orders", get(orders))
      .route("/tasks", get(|headers: HeaderMap, Query(p): Query<TaskParams>| async move {
        if !authorised(&headers) {
          return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(Json(json!({ "tasks": { "for": p.reference_number } })))
      }));
    let base = upstream(app).await;

    let records = source(&base, TOKEN).fetch_orders().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["order"]["referenceNumber"], json!("RN1"));
    assert_eq!(records[0]["details"]["tasks"]["for"], json!("RN1"));
    assert_eq!(records[1]["details"]["tasks"]["for"], json!("RN2"));
  }

  #[test]
  fn reference_number_is_encoded_into_the_details_query() {
    let s = source("http://upstream.test", TOKEN);
    let url = s.details_url("RN 1&admin=true").unwrap();

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs, vec![("referenceNumber".to_owned(), "RN 1&admin=true".to_owned())]);
    assert_eq!(url.path(), "/tasks");
  }

  #[test]
  fn other_query_values_are_kept() {
    let mut s = source("http://upstream.test", TOKEN);
    s.config.details_url_template =
      "http://upstream.test/tasks?lang=en&referenceNumber={ORDER_ID}&v=9.9".to_owned();
    let url = s.details_url("RN7").unwrap();

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs, vec![
      ("lang".to_owned(), "en".to_owned()),
      ("referenceNumber".to_owned(), "RN7".to_owned()),
      ("v".to_owned(), "9.9".to_owned()),
    ]);
  }

  #[tokio::test]
  async fn rejected_token_is_unauthorized() {
    let base = upstream(Router::new().route("/orders", get(orders))).await;

    let err = source(&base, "stale").fetch_orders().await.unwrap_err();
    assert!(matches!(err, SourceError::Unauthorized));
  }

  #[tokio::test]
  async fn failing_details_request_fails_the_fetch() {
    let app = Router::new()
      .route("/orders", get(orders))
      .route("/tasks", get(tasks));
    let base = upstream(app).await;

    let err = source(&base, TOKEN).fetch_orders().await.unwrap_err();
    match err {
      SourceError::Failed(e) => assert!(e.to_string().contains("503"), "{e}"),
      SourceError::Unauthorized => panic!("expected a generic failure"),
    }
  }

  #[tokio::test]
  async fn missing_response_array_is_a_failure() {
    let app = Router::new().route("/orders", get(|| async { Json(json!({ "error": "nope" })) }));
    let base = upstream(app).await;

    let err = source(&base, TOKEN).fetch_orders().await.unwrap_err();
    assert!(matches!(err, SourceError::Failed(_)));
  }
}
