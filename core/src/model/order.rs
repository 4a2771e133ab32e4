// codcall/src/model/order.rs

use crate::model::status::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: Uuid,
  pub store_id: Option<Uuid>,
  /// Upstream (Shopify) order id; unique across the table.
  pub external_order_id: i64,
  pub order_number: String,
  pub customer_name: String,
  pub customer_phone: String,
  pub address: String,
  pub product: String,
  pub amount: f64,
  pub currency: String,
  pub status: OrderStatus,
  pub call_scheduled_at: Option<DateTime<Utc>>,
  pub call_attempts: i32,
  pub address_corrected: Option<String>,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A normalised upstream order ready to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrder {
  pub store_id: Option<Uuid>,
  pub external_order_id: i64,
  pub order_number: String,
  pub customer_name: String,
  pub customer_phone: String,
  pub address: String,
  pub product: String,
  pub amount: f64,
  pub currency: String,
  pub status: OrderStatus,
  pub call_scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
  Created(Order),
  /// The external id already exists; nothing was written.
  Duplicate,
}

/// Field-level update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPatch {
  pub status: Option<OrderStatus>,
  pub call_scheduled_at: Option<DateTime<Utc>>,
  pub call_attempts: Option<i32>,
  pub address_corrected: Option<String>,
  pub notes: Option<String>,
}

impl OrderPatch {
  pub fn status(status: OrderStatus) -> Self {
    Self {
      status: Some(status),
      ..Default::default()
    }
  }

  pub fn with_scheduled_at(mut self, at: DateTime<Utc>) -> Self {
    self.call_scheduled_at = Some(at);
    self
  }

  pub fn with_attempts(mut self, attempts: i32) -> Self {
    self.call_attempts = Some(attempts);
    self
  }

  pub fn with_address_corrected(mut self, address: impl Into<String>) -> Self {
    self.address_corrected = Some(address.into());
    self
  }

  pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
    self.notes = Some(notes.into());
    self
  }

  pub fn is_empty(&self) -> bool {
    *self == OrderPatch::default()
  }

  /// Applies the patch in place and bumps `updated_at`.
  pub fn apply_to(&self, order: &mut Order, now: DateTime<Utc>) {
    if let Some(status) = self.status {
      order.status = status;
    }
    if let Some(at) = self.call_scheduled_at {
      order.call_scheduled_at = Some(at);
    }
    if let Some(attempts) = self.call_attempts {
      order.call_attempts = attempts;
    }
    if let Some(address) = &self.address_corrected {
      order.address_corrected = Some(address.clone());
    }
    if let Some(notes) = &self.notes {
      order.notes = Some(notes.clone());
    }
    order.updated_at = now;
  }
}

/// Precondition for a compare-and-set update.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderGuard {
  pub statuses: Vec<OrderStatus>,
  pub call_attempts: Option<i32>,
}

impl OrderGuard {
  pub fn status_in(statuses: &[OrderStatus]) -> Self {
    Self {
      statuses: statuses.to_vec(),
      call_attempts: None,
    }
  }

  pub fn with_attempts(mut self, attempts: i32) -> Self {
    self.call_attempts = Some(attempts);
    self
  }

  pub fn matches(&self, order: &Order) -> bool {
    self.statuses.contains(&order.status) && self.call_attempts.map_or(true, |n| n == order.call_attempts)
  }
}

/// Dashboard listing filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
  pub status: Option<OrderStatus>,
  pub store_id: Option<Uuid>,
  pub created_from: Option<DateTime<Utc>>,
  pub created_to: Option<DateTime<Utc>>,
  /// Case-insensitive match on name, phone, order number or product.
  pub search: Option<String>,
  pub limit: Option<i64>,
}

impl OrderFilter {
  pub const DEFAULT_LIMIT: i64 = 200;

  pub fn effective_limit(&self) -> i64 {
    self.limit.filter(|l| *l > 0).unwrap_or(Self::DEFAULT_LIMIT)
  }

  pub fn matches(&self, order: &Order) -> bool {
    if self.status.map_or(false, |s| s != order.status) {
      return false;
    }
    if self.store_id.is_some() && self.store_id != order.store_id {
      return false;
    }
    if self.created_from.map_or(false, |from| order.created_at < from) {
      return false;
    }
    if self.created_to.map_or(false, |to| order.created_at > to) {
      return false;
    }
    if let Some(needle) = self.search.as_deref().map(str::to_lowercase).filter(|s| !s.is_empty()) {
      let haystacks = [&order.customer_name, &order.customer_phone, &order.order_number, &order.product];
      if !haystacks.iter().any(|h| h.to_lowercase().contains(&needle)) {
        return false;
      }
    }
    true
  }
}
