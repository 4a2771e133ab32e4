// codcall/src/model/status.rs

//! Order status, call result, and the transition table between statuses.
//!
//! Persisted values keep the identifiers the dashboard and the database use
//! (`pendiente`, `llamada_programada`, ...).

use crate::error::{CallError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
  #[serde(rename = "pendiente")]
  Pending,
  #[serde(rename = "llamada_programada")]
  Scheduled,
  #[serde(rename = "en_llamada")]
  InCall,
  #[serde(rename = "confirmado")]
  Confirmed,
  #[serde(rename = "rechazado")]
  Rejected,
  #[serde(rename = "no_contesta")]
  NoAnswer,
  #[serde(rename = "direccion_cambiada")]
  AddressChanged,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 7] = [
    OrderStatus::Pending,
    OrderStatus::Scheduled,
    OrderStatus::InCall,
    OrderStatus::Confirmed,
    OrderStatus::Rejected,
    OrderStatus::NoAnswer,
    OrderStatus::AddressChanged,
  ];

  /// Statuses the dispatcher picks orders from.
  pub const DISPATCHABLE: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Scheduled];

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pendiente",
      OrderStatus::Scheduled => "llamada_programada",
      OrderStatus::InCall => "en_llamada",
      OrderStatus::Confirmed => "confirmado",
      OrderStatus::Rejected => "rechazado",
      OrderStatus::NoAnswer => "no_contesta",
      OrderStatus::AddressChanged => "direccion_cambiada",
    }
  }

  pub fn is_dispatchable(self) -> bool {
    Self::DISPATCHABLE.contains(&self)
  }

  /// The transition table. Returns the status `event` leads to from `self`,
  /// or `CallError::InvalidTransition`.
  ///
  /// Call reports and in-call decisions are accepted from any status: the
  /// end-of-call report and the assistant's mid-call decision race on the same
  /// order and the last write wins.
  pub fn apply(self, event: OrderEvent) -> Result<OrderStatus> {
    use OrderStatus::*;
    let next = match (self, event) {
      (Pending | Scheduled, OrderEvent::CallPlaced) => InCall,
      (Pending | Scheduled, OrderEvent::PhoneMissing) => NoAnswer,
      (InCall, OrderEvent::CallReleased { previous }) if previous.is_dispatchable() => previous,
      (InCall, OrderEvent::AttemptUnrecorded { retry: true }) => Scheduled,
      (InCall, OrderEvent::AttemptUnrecorded { retry: false }) => NoAnswer,
      (_, OrderEvent::CallEnded { result, address_change }) => match result {
        CallResult::Confirmed if address_change => AddressChanged,
        CallResult::Confirmed => Confirmed,
        CallResult::Rejected => Rejected,
        CallResult::Callback => Scheduled,
        CallResult::NoAnswer | CallResult::Voicemail => NoAnswer,
      },
      (NoAnswer, OrderEvent::RetryScheduled) => Scheduled,
      (_, OrderEvent::AgentConfirmed { address_changed: true }) => AddressChanged,
      (_, OrderEvent::AgentConfirmed { address_changed: false }) => Confirmed,
      (_, OrderEvent::AgentRejected) => Rejected,
      (_, OrderEvent::OperatorOverride(target)) if target != InCall => target,
      (from, event) => return Err(CallError::InvalidTransition { from, event }),
    };
    Ok(next)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = CallError;

  fn from_str(s: &str) -> Result<Self> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| CallError::Validation(format!("Unknown order status '{}'", s)))
  }
}

/// Classified outcome of one call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallResult {
  #[serde(rename = "confirmado")]
  Confirmed,
  #[serde(rename = "rechazado")]
  Rejected,
  #[serde(rename = "callback")]
  Callback,
  #[serde(rename = "no_contesta")]
  NoAnswer,
  #[serde(rename = "buzon")]
  Voicemail,
}

impl CallResult {
  pub const ALL: [CallResult; 5] = [
    CallResult::Confirmed,
    CallResult::Rejected,
    CallResult::Callback,
    CallResult::NoAnswer,
    CallResult::Voicemail,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      CallResult::Confirmed => "confirmado",
      CallResult::Rejected => "rechazado",
      CallResult::Callback => "callback",
      CallResult::NoAnswer => "no_contesta",
      CallResult::Voicemail => "buzon",
    }
  }
}

impl fmt::Display for CallResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for CallResult {
  type Err = CallError;

  fn from_str(s: &str) -> Result<Self> {
    CallResult::ALL
      .into_iter()
      .find(|result| result.as_str() == s)
      .ok_or_else(|| CallError::Validation(format!("Unknown call result '{}'", s)))
  }
}

/// Everything that moves an order between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
  /// The dispatcher claimed the order and is placing a call.
  CallPlaced,
  /// The order has no phone to call.
  PhoneMissing,
  /// The provider refused the call; the claim is handed back.
  CallReleased { previous: OrderStatus },
  /// The call went out but its attempt could not be stored. The order leaves
  /// `InCall` so it is not stranded; `retry` says whether budget remains.
  AttemptUnrecorded { retry: bool },
  /// End-of-call report received.
  CallEnded { result: CallResult, address_change: bool },
  /// A no-answer order still has retry budget.
  RetryScheduled,
  AgentConfirmed { address_changed: bool },
  AgentRejected,
  OperatorOverride(OrderStatus),
}

impl fmt::Display for OrderEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OrderEvent::CallPlaced => f.write_str("call_placed"),
      OrderEvent::PhoneMissing => f.write_str("phone_missing"),
      OrderEvent::CallReleased { previous } => write!(f, "call_released({})", previous),
      OrderEvent::AttemptUnrecorded { retry } => write!(f, "attempt_unrecorded(retry={})", retry),
      OrderEvent::CallEnded { result, address_change } => {
        write!(f, "call_ended({}, address_change={})", result, address_change)
      }
      OrderEvent::RetryScheduled => f.write_str("retry_scheduled"),
      OrderEvent::AgentConfirmed { address_changed } => {
        write!(f, "agent_confirmed(address_changed={})", address_changed)
      }
      OrderEvent::AgentRejected => f.write_str("agent_rejected"),
      OrderEvent::OperatorOverride(target) => write!(f, "operator_override({})", target),
    }
  }
}
