// codcall/src/workflows/completion.rs

//! End-of-call handling: classify the call, move the order through the state
//! machine, schedule a retry when budget remains, and write the attempt and
//! the order together.

use crate::core::{ContextData, PipelineControl};
use crate::error::{CallError, Result};
use crate::model::{CallCompletion, CallResult, OrderEvent, OrderPatch, OrderStatus};
use crate::pipeline::Pipeline;
use crate::rules::{classify_result, requests_address_change};
use crate::settings::retry_delay;
use crate::workflows::contexts::CompletionCtxData;
use crate::workflows::outcomes::CompletionOutcome;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

pub(crate) fn build_completion_pipeline() -> Pipeline<CompletionCtxData, CallError> {
  let mut p = Pipeline::<CompletionCtxData, CallError>::new(&[
    ("check_report_type", false, None),
    ("locate_attempt", false, None),
    ("classify_outcome", false, None),
    ("scan_transcript", false, None),
    ("plan_retry", false, None),
    ("commit_outcome", false, None),
  ]);

  p.on_root("check_report_type", check_report_type);
  p.on_root("locate_attempt", locate_attempt);
  p.on_root("classify_outcome", classify_outcome);
  p.on_root("scan_transcript", scan_transcript);
  p.on_root("plan_retry", plan_retry);
  p.on_root("commit_outcome", commit_outcome);
  p
}

fn missing(step: &str, what: &str) -> CallError {
  CallError::Internal(format!("{} ran without {}", step, what))
}

async fn check_report_type(ctx: ContextData<CompletionCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  if guard.report.is_completion() {
    return Ok(PipelineControl::Continue);
  }
  debug!(report_type = ?guard.report.report_type, "Ignoring non end-of-call event.");
  guard.outcome = Some(CompletionOutcome::Ignored);
  Ok(PipelineControl::Stop)
}

#[instrument(name = "completion::locate_attempt", skip_all)]
async fn locate_attempt(ctx: ContextData<CompletionCtxData>) -> Result<PipelineControl> {
  let (storage, provider_call_id) = {
    let guard = ctx.read();
    (guard.deps.storage.clone(), guard.report.provider_call_id.clone())
  };
  if provider_call_id.is_empty() {
    return Err(CallError::Validation("No call ID found".to_string()));
  }

  let attempt = storage.find_call_attempt(&provider_call_id).await?.ok_or_else(|| {
    warn!(provider_call_id = %provider_call_id, "No call attempt for completion report.");
    CallError::NotFound(format!("Call record not found for call id {}", provider_call_id))
  })?;
  let order = storage
    .get_order(attempt.order_id)
    .await?
    .ok_or_else(|| CallError::NotFound(format!("Order {} not found", attempt.order_id)))?;

  let mut guard = ctx.write();
  if !attempt.is_open() {
    info!(provider_call_id = %provider_call_id, "Completion report replayed for a closed attempt.");
    guard.outcome = Some(CompletionOutcome::Replayed {
      result: attempt.result,
      order_status: order.status,
    });
    return Ok(PipelineControl::Stop);
  }
  guard.attempt = Some(attempt);
  guard.order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn classify_outcome(ctx: ContextData<CompletionCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  let result = classify_result(&guard.report.success_evaluation, &guard.report.ended_reason);
  debug!(
    success_evaluation = %guard.report.success_evaluation,
    ended_reason = %guard.report.ended_reason,
    result = %result,
    "Call classified."
  );
  guard.result = Some(result);
  Ok(PipelineControl::Continue)
}

async fn scan_transcript(ctx: ContextData<CompletionCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  if !requests_address_change(&guard.report.transcript) {
    return Ok(PipelineControl::Continue);
  }

  let corrected = guard
    .report
    .structured_new_address
    .clone()
    .filter(|a| !a.is_empty())
    .or_else(|| Some(guard.report.summary.clone()).filter(|s| !s.is_empty()));
  guard.address_change_requested = true;
  guard.address_corrected = corrected;
  Ok(PipelineControl::Continue)
}

async fn plan_retry(ctx: ContextData<CompletionCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  let data = &mut *guard;
  let order = data.order.as_ref().ok_or_else(|| missing("plan_retry", "an order"))?;
  let result = data.result.ok_or_else(|| missing("plan_retry", "a result"))?;

  let address_change = data.address_change_requested && result == CallResult::Confirmed;
  let mut status = order.status.apply(OrderEvent::CallEnded { result, address_change })?;
  let mut patch = OrderPatch::status(status);
  if let Some(address) = &data.address_corrected {
    patch = patch.with_address_corrected(address.clone());
  }

  if status == OrderStatus::NoAnswer && order.call_attempts < data.settings.max_retries {
    let retry = data.settings.hours.next_eligible(data.now, retry_delay());
    status = status.apply(OrderEvent::RetryScheduled)?;
    patch.status = Some(status);
    patch = patch.with_scheduled_at(retry.at.with_timezone(&Utc));
    debug!(retry_at = %retry.at, attempts = order.call_attempts, "Retry scheduled.");
  }

  data.order_status = Some(status);
  data.patch = patch;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "completion::commit_outcome", skip_all)]
async fn commit_outcome(ctx: ContextData<CompletionCtxData>) -> Result<PipelineControl> {
  let (storage, report, order_id, result, order_status, patch, now) = {
    let guard = ctx.read();
    let order_id = guard.order.as_ref().map(|o| o.id);
    (
      guard.deps.storage.clone(),
      guard.report.clone(),
      order_id.ok_or_else(|| missing("commit_outcome", "an order"))?,
      guard.result.ok_or_else(|| missing("commit_outcome", "a result"))?,
      guard.order_status.ok_or_else(|| missing("commit_outcome", "a target status"))?,
      guard.patch.clone(),
      guard.now,
    )
  };

  let completion = CallCompletion {
    ended_at: now.with_timezone(&Utc),
    duration_seconds: report.duration_seconds,
    cost: report.cost,
    ended_reason: report.ended_reason.clone(),
    transcript: report.transcript.clone(),
    recording_url: report.recording_url.clone(),
    summary: report.summary.clone(),
    result,
  };

  let written = storage
    .complete_call(&report.provider_call_id, &completion, order_id, &patch)
    .await?;

  let outcome = if written {
    info!(
      provider_call_id = %report.provider_call_id,
      order_id = %order_id,
      result = %result,
      order_status = %order_status,
      "Call outcome applied."
    );
    CompletionOutcome::Applied {
      result,
      order_status,
      retry_at: patch.call_scheduled_at,
    }
  } else {
    info!(provider_call_id = %report.provider_call_id, "Attempt closed concurrently; report not re-applied.");
    let stored = storage.find_call_attempt(&report.provider_call_id).await?;
    let current = storage.get_order(order_id).await?;
    CompletionOutcome::Replayed {
      result: stored.and_then(|a| a.result),
      order_status: current.map_or(order_status, |o| o.status),
    }
  };

  {
    let mut guard = ctx.write();
    guard.completion = Some(completion);
    guard.outcome = Some(outcome);
  }
  Ok(PipelineControl::Continue)
}
