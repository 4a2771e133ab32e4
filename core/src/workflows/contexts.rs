// codcall/src/workflows/contexts.rs

//! Data threaded through each workflow pipeline. Handlers receive these
//! wrapped in `ContextData`.

use crate::model::{CallAttempt, CallCompletion, CallResult, NewOrder, Order, OrderPatch, OrderStatus, Store};
use crate::payload::{CompletionReport, RawOrder, ToolCall, ToolReply};
use crate::ports::{CommerceProvider, Storage, VoiceProvider};
use crate::settings::{Settings, VoiceCredentials};
use crate::workflows::outcomes::{CompletionOutcome, DispatchEntry, IngestOutcome};
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;

/// Collaborators shared by every workflow run.
#[derive(Clone)]
pub struct FlowDeps {
  pub storage: Arc<dyn Storage>,
  pub voice: Arc<dyn VoiceProvider>,
  pub commerce: Option<Arc<dyn CommerceProvider>>,
}

#[derive(Clone)]
pub struct IngestCtxData {
  pub deps: FlowDeps,
  pub raw: RawOrder,
  pub store: Option<Store>,
  pub settings: Settings,
  pub now: DateTime<FixedOffset>,
  pub external_id: Option<i64>,
  pub new_order: Option<NewOrder>,
  pub outcome: Option<IngestOutcome>,
}

#[derive(Clone)]
pub struct DispatchCtxData {
  pub deps: FlowDeps,
  pub settings: Settings,
  pub now: DateTime<FixedOffset>,
  pub credentials: Option<VoiceCredentials>,
  pub due: Vec<Order>,
  pub entries: Vec<DispatchEntry>,
  /// Set when the tick ends without touching any order.
  pub message: Option<String>,
}

#[derive(Clone)]
pub struct CompletionCtxData {
  pub deps: FlowDeps,
  pub report: CompletionReport,
  pub settings: Settings,
  pub now: DateTime<FixedOffset>,
  pub attempt: Option<CallAttempt>,
  pub order: Option<Order>,
  pub result: Option<CallResult>,
  pub address_change_requested: bool,
  pub address_corrected: Option<String>,
  pub order_status: Option<OrderStatus>,
  pub completion: Option<CallCompletion>,
  pub patch: OrderPatch,
  pub outcome: Option<CompletionOutcome>,
}

#[derive(Clone)]
pub struct ToolDecisionCtxData {
  pub deps: FlowDeps,
  pub tool_call: ToolCall,
  pub order: Option<Order>,
  pub reply: Option<ToolReply>,
}
