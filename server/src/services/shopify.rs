// codcall_server/src/services/shopify.rs

//! Pulls recent orders from the Shopify Admin REST API.

use crate::services::error_detail;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use codcall::model::Store;
use codcall::payload::RawOrder;
use codcall::{CallError, CommerceProvider};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, instrument};

/// Orders requested per store per sync.
const PAGE_LIMIT: &str = "50";

pub struct ShopifyClient {
  http: reqwest::Client,
  api_version: String,
}

#[derive(Debug, Deserialize)]
struct OrdersPage {
  #[serde(default)]
  orders: Vec<RawOrder>,
}

impl ShopifyClient {
  pub fn new(api_version: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
    let http = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      http,
      api_version: api_version.into(),
    })
  }

  /// Stores keep their bare shop domain, but a pasted URL works too.
  pub fn orders_url(&self, store: &Store) -> String {
    let domain = store
      .url
      .trim()
      .trim_start_matches("https://")
      .trim_start_matches("http://")
      .trim_end_matches('/');
    format!("https://{}/admin/api/{}/orders.json", domain, self.api_version)
  }
}

pub fn orders_query(created_since: DateTime<Utc>) -> [(&'static str, String); 3] {
  [
    ("status", "any".to_string()),
    ("limit", PAGE_LIMIT.to_string()),
    ("created_at_min", created_since.to_rfc3339_opts(SecondsFormat::Millis, true)),
  ]
}

#[async_trait]
impl CommerceProvider for ShopifyClient {
  #[instrument(name = "ShopifyClient::recent_orders", skip_all, fields(store = %store.name))]
  async fn recent_orders(&self, store: &Store, created_since: DateTime<Utc>) -> codcall::Result<Vec<RawOrder>> {
    let response = self
      .http
      .get(self.orders_url(store))
      .header("X-Shopify-Access-Token", &store.access_token)
      .query(&orders_query(created_since))
      .send()
      .await
      .map_err(|e| CallError::commerce(format!("request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      let body: JsonValue = response.json().await.unwrap_or(JsonValue::Null);
      debug!(detail = %error_detail(&body), "Shopify error body.");
      return Err(CallError::commerce(format!("HTTP {}", status.as_u16())));
    }

    let page: OrdersPage = response
      .json()
      .await
      .map_err(|e| CallError::commerce(format!("unexpected response: {}", e)))?;
    debug!(count = page.orders.len(), "Shopify orders fetched.");
    Ok(page.orders)
  }
}
