// codcall/src/model/store.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label matched against payment gateway names when a store configures none.
pub const DEFAULT_COD_LABEL: &str = "Cash on Delivery";

/// A connected shop. Orders are scoped to the store they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
  pub id: Uuid,
  pub name: String,
  /// Shop domain, e.g. `my-shop.myshopify.com`.
  pub url: String,
  #[serde(skip_serializing)]
  pub access_token: String,
  pub cod_gateway_name: String,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

impl Store {
  pub fn cod_label(&self) -> &str {
    if self.cod_gateway_name.trim().is_empty() {
      DEFAULT_COD_LABEL
    } else {
      &self.cod_gateway_name
    }
  }

  pub fn can_sync(&self) -> bool {
    self.is_active && !self.access_token.is_empty()
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStore {
  pub name: String,
  pub url: String,
  #[serde(default)]
  pub access_token: String,
  #[serde(default)]
  pub cod_gateway_name: Option<String>,
}
