// codcall_server/src/db/rows.rs

//! Row shapes as stored. Statuses and results are text columns holding the
//! wire identifiers (`pendiente`, `confirmado`, ...).

use chrono::{DateTime, Utc};
use codcall::model::{CallAttempt, CallResult, Order, Store};
use codcall::CallError;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
  pub id: Uuid,
  pub store_id: Option<Uuid>,
  pub shopify_order_id: i64,
  pub order_number: String,
  pub customer_name: String,
  pub customer_phone: String,
  pub address: String,
  pub product: String,
  pub amount: f64,
  pub currency: String,
  pub status: String,
  pub call_scheduled_at: Option<DateTime<Utc>>,
  pub call_attempts: i32,
  pub address_corrected: Option<String>,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = CallError;

  fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
    Ok(Order {
      id: row.id,
      store_id: row.store_id,
      external_order_id: row.shopify_order_id,
      order_number: row.order_number,
      customer_name: row.customer_name,
      customer_phone: row.customer_phone,
      address: row.address,
      product: row.product,
      amount: row.amount,
      currency: row.currency,
      status: row.status.parse()?,
      call_scheduled_at: row.call_scheduled_at,
      call_attempts: row.call_attempts,
      address_corrected: row.address_corrected,
      notes: row.notes,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct CallRow {
  pub id: Uuid,
  pub order_id: Uuid,
  pub vapi_call_id: String,
  pub attempt_number: i32,
  pub started_at: DateTime<Utc>,
  pub ended_at: Option<DateTime<Utc>>,
  pub duration_seconds: Option<f64>,
  pub cost: Option<f64>,
  pub ended_reason: Option<String>,
  pub transcript: Option<String>,
  pub recording_url: Option<String>,
  pub summary: Option<String>,
  pub result: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl TryFrom<CallRow> for CallAttempt {
  type Error = CallError;

  fn try_from(row: CallRow) -> Result<Self, Self::Error> {
    Ok(CallAttempt {
      id: row.id,
      order_id: row.order_id,
      provider_call_id: row.vapi_call_id,
      attempt_number: row.attempt_number,
      started_at: row.started_at,
      ended_at: row.ended_at,
      duration_seconds: row.duration_seconds,
      cost: row.cost,
      ended_reason: row.ended_reason,
      transcript: row.transcript,
      recording_url: row.recording_url,
      summary: row.summary,
      result: row.result.as_deref().map(str::parse::<CallResult>).transpose()?,
      created_at: row.created_at,
    })
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct StoreRow {
  pub id: Uuid,
  pub name: String,
  pub url: String,
  pub access_token: String,
  pub cod_gateway_name: String,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
  fn from(row: StoreRow) -> Self {
    Store {
      id: row.id,
      name: row.name,
      url: row.url,
      access_token: row.access_token,
      cod_gateway_name: row.cod_gateway_name,
      is_active: row.is_active,
      created_at: row.created_at,
    }
  }
}

pub fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, CallError> {
  rows.into_iter().map(Order::try_from).collect()
}

pub fn into_attempts(rows: Vec<CallRow>) -> Result<Vec<CallAttempt>, CallError> {
  rows.into_iter().map(CallAttempt::try_from).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use codcall::model::OrderStatus;

  fn order_row(status: &str) -> OrderRow {
    OrderRow {
      id: Uuid::new_v4(),
      store_id: None,
      shopify_order_id: 42,
      order_number: "#1042".to_string(),
      customer_name: "Lucía".to_string(),
      customer_phone: "+34600111222".to_string(),
      address: "Calle Mayor 1".to_string(),
      product: "Camiseta".to_string(),
      amount: 19.9,
      currency: "EUR".to_string(),
      status: status.to_string(),
      call_scheduled_at: None,
      call_attempts: 1,
      address_corrected: None,
      notes: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn order_rows_map_wire_statuses() {
    let order = Order::try_from(order_row("llamada_programada")).unwrap();
    assert_eq!(order.status, OrderStatus::Scheduled);
    assert_eq!(order.external_order_id, 42);

    assert!(matches!(Order::try_from(order_row("scheduled")), Err(CallError::Validation(_))));
  }

  #[test]
  fn call_rows_map_results() {
    let row = CallRow {
      id: Uuid::new_v4(),
      order_id: Uuid::new_v4(),
      vapi_call_id: "call-1".to_string(),
      attempt_number: 2,
      started_at: Utc::now(),
      ended_at: None,
      duration_seconds: None,
      cost: None,
      ended_reason: None,
      transcript: None,
      recording_url: None,
      summary: None,
      result: Some("buzon".to_string()),
      created_at: Utc::now(),
    };
    let attempt = CallAttempt::try_from(row).unwrap();
    assert_eq!(attempt.provider_call_id, "call-1");
    assert_eq!(attempt.result, Some(CallResult::Voicemail));
    assert!(attempt.is_open());
  }
}
