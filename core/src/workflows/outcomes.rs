// codcall/src/workflows/outcomes.rs

//! What each operation reports back. Business no-ops live here, not in
//! `CallError`.

use crate::model::{CallResult, OrderStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
  Accepted {
    order_id: Uuid,
    order_number: String,
    customer_name: String,
    status: OrderStatus,
  },
  /// Already stored. `existing_id` is `None` when the duplicate was caught by
  /// the storage uniqueness check rather than the pre-check.
  Duplicate { existing_id: Option<Uuid> },
  NotCod,
}

impl IngestOutcome {
  pub fn is_accepted(&self) -> bool {
    matches!(self, IngestOutcome::Accepted { .. })
  }

  pub fn order_id(&self) -> Option<Uuid> {
    match self {
      IngestOutcome::Accepted { order_id, .. } => Some(*order_id),
      IngestOutcome::Duplicate { existing_id } => *existing_id,
      IngestOutcome::NotCod => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncedOrder {
  pub id: Uuid,
  pub order_number: String,
  pub customer_name: String,
  pub store: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncFailure {
  pub store: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub order: Option<String>,
  pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
  pub synced: usize,
  pub new_orders: Vec<SyncedOrder>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub errors: Vec<SyncFailure>,
}

impl SyncReport {
  pub fn merge(&mut self, other: SyncReport) {
    self.synced += other.synced;
    self.new_orders.extend(other.new_orders);
    self.errors.extend(other.errors);
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
  Called,
  SkippedNoPhone,
  VapiError,
  /// Another tick claimed the order between selection and claim.
  AlreadyClaimed,
  Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchEntry {
  pub order_id: Uuid,
  #[serde(rename = "order")]
  pub order_number: String,
  pub status: DispatchStatus,
  #[serde(rename = "vapi_call_id", skip_serializing_if = "Option::is_none")]
  pub call_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl DispatchEntry {
  pub fn new(order_id: Uuid, order_number: impl Into<String>, status: DispatchStatus) -> Self {
    Self {
      order_id,
      order_number: order_number.into(),
      status,
      call_id: None,
      error: None,
    }
  }

  pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
    self.call_id = Some(call_id.into());
    self
  }

  pub fn with_error(mut self, error: impl ToString) -> Self {
    self.error = Some(error.to_string());
    self
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
  /// Calls actually placed.
  pub triggered: usize,
  pub results: Vec<DispatchEntry>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
  /// Not an end-of-call report.
  Ignored,
  Applied {
    result: CallResult,
    order_status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_at: Option<DateTime<Utc>>,
  },
  /// The attempt was already closed; nothing was written.
  Replayed {
    result: Option<CallResult>,
    order_status: OrderStatus,
  },
}
