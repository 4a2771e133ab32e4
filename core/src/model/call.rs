// codcall/src/model/call.rs

use crate::model::status::CallResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One placed call for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallAttempt {
  pub id: Uuid,
  pub order_id: Uuid,
  pub provider_call_id: String,
  /// 1-based; equals the order's `call_attempts` right after dispatch.
  pub attempt_number: i32,
  pub started_at: DateTime<Utc>,
  /// `None` while the call is open.
  pub ended_at: Option<DateTime<Utc>>,
  pub duration_seconds: Option<f64>,
  pub cost: Option<f64>,
  pub ended_reason: Option<String>,
  pub transcript: Option<String>,
  pub recording_url: Option<String>,
  pub summary: Option<String>,
  pub result: Option<CallResult>,
  pub created_at: DateTime<Utc>,
}

impl CallAttempt {
  pub fn is_open(&self) -> bool {
    self.ended_at.is_none()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCallAttempt {
  pub order_id: Uuid,
  pub provider_call_id: String,
  pub attempt_number: i32,
  pub started_at: DateTime<Utc>,
}

/// Fields written when the end-of-call report lands.
#[derive(Debug, Clone, PartialEq)]
pub struct CallCompletion {
  pub ended_at: DateTime<Utc>,
  pub duration_seconds: f64,
  pub cost: f64,
  pub ended_reason: String,
  pub transcript: String,
  pub recording_url: String,
  pub summary: String,
  pub result: CallResult,
}

impl CallCompletion {
  pub fn apply_to(&self, attempt: &mut CallAttempt) {
    attempt.ended_at = Some(self.ended_at);
    attempt.duration_seconds = Some(self.duration_seconds);
    attempt.cost = Some(self.cost);
    attempt.ended_reason = Some(self.ended_reason.clone());
    attempt.transcript = Some(self.transcript.clone());
    attempt.recording_url = Some(self.recording_url.clone());
    attempt.summary = Some(self.summary.clone());
    attempt.result = Some(self.result);
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallFilter {
  pub order_id: Option<Uuid>,
  pub result: Option<CallResult>,
  pub created_from: Option<DateTime<Utc>>,
  pub created_to: Option<DateTime<Utc>>,
  pub limit: Option<i64>,
}

impl CallFilter {
  pub fn effective_limit(&self) -> i64 {
    self.limit.filter(|l| *l > 0).unwrap_or(200)
  }

  pub fn matches(&self, attempt: &CallAttempt) -> bool {
    self.order_id.map_or(true, |id| id == attempt.order_id)
      && self.result.map_or(true, |r| Some(r) == attempt.result)
      && self.created_from.map_or(true, |from| attempt.created_at >= from)
      && self.created_to.map_or(true, |to| attempt.created_at <= to)
  }
}
