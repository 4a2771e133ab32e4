// codcall/src/workflows/mod.rs

//! The call-confirmation operations, each a registered pipeline run through
//! [`CallFlow`].

pub mod completion;
pub mod contexts;
pub mod dispatch;
pub mod ingest;
pub mod operator;
pub mod outcomes;
pub mod sync;
pub mod tool_call;

use crate::core::ContextData;
use crate::error::{CallError, Result};
use crate::model::Store;
use crate::payload::{CompletionReport, RawOrder, ToolCall, ToolReply};
use crate::ports::{CommerceProvider, Storage, VoiceProvider};
use crate::registry::Registry;
use crate::settings::Settings;
use chrono::{DateTime, Duration, FixedOffset};
use std::sync::Arc;
use tracing::instrument;

pub use contexts::{CompletionCtxData, DispatchCtxData, FlowDeps, IngestCtxData, ToolDecisionCtxData};
pub use operator::{OperatorUpdate, TestCallRequest};
pub use outcomes::{
  CompletionOutcome, DispatchEntry, DispatchReport, DispatchStatus, IngestOutcome, SyncFailure, SyncReport,
  SyncedOrder,
};

/// How far back a store sync looks for orders unless told otherwise.
pub const DEFAULT_SYNC_LOOKBACK_DAYS: i64 = 30;

/// Entry point for every operation. Cheap to share behind an `Arc`; holds no
/// per-request state.
pub struct CallFlow {
  deps: FlowDeps,
  registry: Registry<CallError>,
  sync_lookback: Duration,
}

impl CallFlow {
  pub fn new(storage: Arc<dyn Storage>, voice: Arc<dyn VoiceProvider>) -> Self {
    let registry = Registry::<CallError>::new();
    registry.register_pipeline(ingest::build_ingest_pipeline());
    registry.register_pipeline(dispatch::build_dispatch_pipeline());
    registry.register_pipeline(completion::build_completion_pipeline());
    registry.register_pipeline(tool_call::build_tool_decision_pipeline());

    Self {
      deps: FlowDeps {
        storage,
        voice,
        commerce: None,
      },
      registry,
      sync_lookback: Duration::days(DEFAULT_SYNC_LOOKBACK_DAYS),
    }
  }

  pub fn with_commerce(mut self, commerce: Arc<dyn CommerceProvider>) -> Self {
    self.deps.commerce = Some(commerce);
    self
  }

  pub fn with_sync_lookback(mut self, lookback: Duration) -> Self {
    self.sync_lookback = lookback;
    self
  }

  pub fn storage(&self) -> &Arc<dyn Storage> {
    &self.deps.storage
  }

  pub fn registry(&self) -> &Registry<CallError> {
    &self.registry
  }

  /// Reads the settings table fresh.
  pub async fn load_settings(&self) -> Result<Settings> {
    let raw = self.deps.storage.load_settings().await?;
    Ok(Settings::from_map(&raw))
  }

  #[instrument(name = "CallFlow::ingest_order", skip_all, fields(external_order_id = ?raw.id, store = ?store.map(|s| &s.name)))]
  pub async fn ingest_order(
    &self,
    raw: RawOrder,
    store: Option<&Store>,
    settings: &Settings,
    now: DateTime<FixedOffset>,
  ) -> Result<IngestOutcome> {
    let ctx = ContextData::new(IngestCtxData {
      deps: self.deps.clone(),
      raw,
      store: store.cloned(),
      settings: settings.clone(),
      now,
      external_id: None,
      new_order: None,
      outcome: None,
    });
    self.registry.run(ctx.clone()).await?;
    let outcome = ctx.read().outcome.clone();
    outcome.ok_or_else(|| CallError::Internal("ingest pipeline finished without an outcome".to_string()))
  }

  #[instrument(name = "CallFlow::dispatch_pending_calls", skip_all, fields(now = %now))]
  pub async fn dispatch_pending_calls(&self, now: DateTime<FixedOffset>, settings: &Settings) -> Result<DispatchReport> {
    let ctx = ContextData::new(DispatchCtxData {
      deps: self.deps.clone(),
      settings: settings.clone(),
      now,
      credentials: None,
      due: Vec::new(),
      entries: Vec::new(),
      message: None,
    });
    self.registry.run(ctx.clone()).await?;

    let guard = ctx.read();
    let triggered = guard
      .entries
      .iter()
      .filter(|e| e.status == DispatchStatus::Called)
      .count();
    Ok(DispatchReport {
      triggered,
      results: guard.entries.clone(),
      message: guard.message.clone(),
    })
  }

  #[instrument(name = "CallFlow::apply_call_completion", skip_all, fields(provider_call_id = %report.provider_call_id))]
  pub async fn apply_call_completion(
    &self,
    report: CompletionReport,
    settings: &Settings,
    now: DateTime<FixedOffset>,
  ) -> Result<CompletionOutcome> {
    let ctx = ContextData::new(CompletionCtxData {
      deps: self.deps.clone(),
      report,
      settings: settings.clone(),
      now,
      attempt: None,
      order: None,
      result: None,
      address_change_requested: false,
      address_corrected: None,
      order_status: None,
      completion: None,
      patch: Default::default(),
      outcome: None,
    });
    self.registry.run(ctx.clone()).await?;
    let outcome = ctx.read().outcome.clone();
    outcome.ok_or_else(|| CallError::Internal("completion pipeline finished without an outcome".to_string()))
  }

  /// Always yields a reply for the assistant. Errors are returned only for
  /// storage failures while resolving the order; callers turn those into
  /// [`tool_call::INTERNAL_ERROR_REPLY`].
  #[instrument(name = "CallFlow::apply_tool_decision", skip_all, fields(tool_call_id = %tool_call.id, function = %tool_call.function_name))]
  pub async fn apply_tool_decision(&self, tool_call: ToolCall) -> Result<ToolReply> {
    let ctx = ContextData::new(ToolDecisionCtxData {
      deps: self.deps.clone(),
      tool_call,
      order: None,
      reply: None,
    });
    self.registry.run(ctx.clone()).await?;
    let reply = ctx.read().reply.clone();
    reply.ok_or_else(|| CallError::Internal("tool decision pipeline finished without a reply".to_string()))
  }
}
