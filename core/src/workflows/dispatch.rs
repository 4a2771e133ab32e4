// codcall/src/workflows/dispatch.rs

//! Call dispatch: one tick picks a bounded batch of due orders and places one
//! outbound call per order.
//!
//! Each order is claimed with a compare-and-set before the provider is called
//! and released if the provider refuses, so overlapping ticks never call the
//! same order twice and a failed dispatch costs no retry budget. A call that
//! went out but could not be recorded moves the order out of `InCall` and
//! leaves the provider call id in its notes.

use crate::core::{ContextData, PipelineControl};
use crate::error::{CallError, Result};
use crate::model::{NewCallAttempt, Order, OrderEvent, OrderGuard, OrderPatch, OrderStatus};
use crate::payload::{CallRequest, CallVariables};
use crate::pipeline::Pipeline;
use crate::settings::{retry_delay, Settings, VoiceCredentials, DISPATCH_BATCH_SIZE};
use crate::workflows::contexts::{DispatchCtxData, FlowDeps};
use crate::workflows::outcomes::{DispatchEntry, DispatchStatus};
use chrono::{DateTime, FixedOffset, Utc};
use tracing::{error, info, instrument, warn};

/// Appended to the order notes when there is no number to call.
pub const NO_PHONE_NOTE: &str = "[Auto] Sin teléfono de contacto";

/// Prefix of the note left when a placed call could not be recorded; the
/// provider call id follows.
pub const UNRECORDED_CALL_NOTE: &str = "[Auto] Llamada sin registrar:";

pub(crate) fn build_dispatch_pipeline() -> Pipeline<DispatchCtxData, CallError> {
  let mut p = Pipeline::<DispatchCtxData, CallError>::new(&[
    ("check_configuration", false, None),
    ("check_business_hours", false, None),
    ("select_due_orders", false, None),
    ("place_calls", false, None),
  ]);

  p.on_root("check_configuration", check_configuration);
  p.on_root("check_business_hours", check_business_hours);
  p.on_root("select_due_orders", select_due_orders);
  p.on_root("place_calls", place_calls);
  p
}

async fn check_configuration(ctx: ContextData<DispatchCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  guard.credentials = guard.settings.voice_credentials();
  if guard.credentials.is_none() {
    info!("Voice provider not configured, nothing to dispatch.");
    guard.message = Some("Vapi not configured".to_string());
    return Ok(PipelineControl::Stop);
  }
  Ok(PipelineControl::Continue)
}

async fn check_business_hours(ctx: ContextData<DispatchCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  if !guard.settings.hours.is_open_at(&guard.now) {
    info!(now = %guard.now, hours = ?guard.settings.hours, "Outside business hours, nothing to dispatch.");
    guard.message = Some("Outside business hours".to_string());
    return Ok(PipelineControl::Stop);
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "dispatch::select_due_orders", skip_all)]
async fn select_due_orders(ctx: ContextData<DispatchCtxData>) -> Result<PipelineControl> {
  let (storage, now, max_retries) = {
    let guard = ctx.read();
    (guard.deps.storage.clone(), guard.now.with_timezone(&Utc), guard.settings.max_retries)
  };

  let due = storage.due_orders(now, max_retries, DISPATCH_BATCH_SIZE).await?;
  let mut guard = ctx.write();
  if due.is_empty() {
    guard.message = Some("No pending calls".to_string());
    return Ok(PipelineControl::Stop);
  }
  info!(count = due.len(), "Orders due for a call.");
  guard.due = due;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "dispatch::place_calls", skip_all)]
async fn place_calls(ctx: ContextData<DispatchCtxData>) -> Result<PipelineControl> {
  let (deps, settings, credentials, due, now) = {
    let guard = ctx.read();
    (
      guard.deps.clone(),
      guard.settings.clone(),
      guard.credentials.clone(),
      guard.due.clone(),
      guard.now,
    )
  };
  let credentials =
    credentials.ok_or_else(|| CallError::Internal("place_calls ran without voice credentials".to_string()))?;

  let mut entries = Vec::with_capacity(due.len());
  for order in due {
    let order_id = order.id;
    let order_number = order.order_number.clone();
    let entry = match dispatch_one(&deps, &settings, &credentials, order, now).await {
      Ok(entry) => entry,
      Err(e) => {
        error!(order_id = %order_id, error = %e, "Dispatch failed for order.");
        DispatchEntry::new(order_id, order_number, DispatchStatus::Error).with_error(e)
      }
    };
    entries.push(entry);
  }

  ctx.write().entries = entries;
  Ok(PipelineControl::Continue)
}

#[instrument(skip_all, fields(order_id = %order.id, order_number = %order.order_number))]
async fn dispatch_one(
  deps: &FlowDeps,
  settings: &Settings,
  credentials: &VoiceCredentials,
  order: Order,
  now: DateTime<FixedOffset>,
) -> Result<DispatchEntry> {
  let storage = &deps.storage;
  let untouched = OrderGuard::status_in(&[order.status]).with_attempts(order.call_attempts);

  if order.customer_phone.trim().is_empty() {
    let status = order.status.apply(OrderEvent::PhoneMissing)?;
    let notes = format!("{}\n{}", order.notes.as_deref().unwrap_or_default(), NO_PHONE_NOTE);
    let patch = OrderPatch::status(status).with_notes(notes);
    if !storage.update_order_if(order.id, &untouched, &patch).await? {
      return Ok(DispatchEntry::new(order.id, order.order_number, DispatchStatus::AlreadyClaimed));
    }
    warn!("Order has no phone number, marked as not answered.");
    return Ok(DispatchEntry::new(order.id, order.order_number, DispatchStatus::SkippedNoPhone));
  }

  let in_call = order.status.apply(OrderEvent::CallPlaced)?;
  let attempt_number = order.call_attempts + 1;
  let claim = OrderPatch::status(in_call).with_attempts(attempt_number);
  if !storage.update_order_if(order.id, &untouched, &claim).await? {
    info!("Order claimed by another dispatcher, skipping.");
    return Ok(DispatchEntry::new(order.id, order.order_number, DispatchStatus::AlreadyClaimed));
  }

  let store_name = match order.store_id {
    Some(store_id) => match storage.get_store(store_id).await {
      Ok(store) => store.map(|s| s.name).unwrap_or_default(),
      Err(e) => {
        warn!(store_id = %store_id, error = %e, "Could not load store name for the call.");
        String::new()
      }
    },
    None => String::new(),
  };

  let request = CallRequest {
    customer_number: order.customer_phone.clone(),
    variables: CallVariables {
      customer_name: order.customer_name.clone(),
      order_number: order.order_number.clone(),
      product: order.product.clone(),
      amount: order.amount.to_string(),
      address: order.address.clone(),
      store_name,
    },
  };

  let placed = match deps.voice.place_call(credentials, &request).await {
    Ok(placed) if placed.id.trim().is_empty() => {
      error!("Voice provider answered without a call id, releasing the order.");
      release_claim(deps, &order, attempt_number).await;
      let e = CallError::voice("Provider returned an empty call id");
      return Ok(DispatchEntry::new(order.id, order.order_number, DispatchStatus::VapiError).with_error(e));
    }
    Ok(placed) => placed,
    Err(e) => {
      error!(error = %e, "Voice provider refused the call, releasing the order.");
      release_claim(deps, &order, attempt_number).await;
      return Ok(DispatchEntry::new(order.id, order.order_number, DispatchStatus::VapiError).with_error(e));
    }
  };

  let recorded = storage
    .insert_call_attempt(NewCallAttempt {
      order_id: order.id,
      provider_call_id: placed.id.clone(),
      attempt_number,
      started_at: now.with_timezone(&Utc),
    })
    .await;
  if let Err(e) = recorded {
    error!(provider_call_id = %placed.id, error = %e, "Call placed but its attempt was not stored.");
    park_unrecorded(deps, settings, &order, attempt_number, &placed.id, now).await;
    return Ok(
      DispatchEntry::new(order.id, order.order_number, DispatchStatus::Error)
        .with_call_id(placed.id)
        .with_error(e),
    );
  }

  info!(provider_call_id = %placed.id, attempt_number, "Call placed.");
  Ok(DispatchEntry::new(order.id, order.order_number, DispatchStatus::Called).with_call_id(placed.id))
}

/// Hands a claimed order back to the status it was picked from, restoring its
/// attempt count. Only applies while the order is still the one we claimed.
async fn release_claim(deps: &FlowDeps, order: &Order, claimed_attempts: i32) {
  let released = match OrderStatus::InCall.apply(OrderEvent::CallReleased { previous: order.status }) {
    Ok(status) => status,
    Err(e) => {
      error!(error = %e, "Cannot release claim.");
      return;
    }
  };
  let guard = OrderGuard::status_in(&[OrderStatus::InCall]).with_attempts(claimed_attempts);
  let patch = OrderPatch::status(released).with_attempts(order.call_attempts);
  match deps.storage.update_order_if(order.id, &guard, &patch).await {
    Ok(true) => info!(status = %released, "Claim released."),
    Ok(false) => warn!("Order changed while claimed; claim not released."),
    Err(e) => error!(error = %e, "Failed to release claim."),
  }
}

/// Moves a claimed order whose call went out unrecorded back into the
/// schedule (or to `NoAnswer` once the budget is spent). The attempt counts
/// as used and the provider call id goes into the notes for reconciliation.
async fn park_unrecorded(
  deps: &FlowDeps,
  settings: &Settings,
  order: &Order,
  claimed_attempts: i32,
  provider_call_id: &str,
  now: DateTime<FixedOffset>,
) {
  let retry = claimed_attempts < settings.max_retries;
  let status = match OrderStatus::InCall.apply(OrderEvent::AttemptUnrecorded { retry }) {
    Ok(status) => status,
    Err(e) => {
      error!(error = %e, "Cannot park unrecorded call.");
      return;
    }
  };
  let note = format!("{} {}", UNRECORDED_CALL_NOTE, provider_call_id);
  let notes = match order.notes.as_deref().filter(|n| !n.is_empty()) {
    Some(existing) => format!("{}\n{}", existing, note),
    None => note,
  };
  let mut patch = OrderPatch::status(status).with_notes(notes);
  if retry {
    let at = settings.hours.next_eligible(now, retry_delay()).at;
    patch = patch.with_scheduled_at(at.with_timezone(&Utc));
  }
  let guard = OrderGuard::status_in(&[OrderStatus::InCall]).with_attempts(claimed_attempts);
  match deps.storage.update_order_if(order.id, &guard, &patch).await {
    Ok(true) => warn!(status = %status, "Unrecorded call parked for reconciliation."),
    Ok(false) => warn!("Order changed while claimed; unrecorded call not parked."),
    Err(e) => error!(error = %e, "Failed to park unrecorded call."),
  }
}
