// codcall/src/workflows/ingest.rs

//! Order ingestion: one raw upstream order in, at most one stored order out.

use crate::core::{ContextData, PipelineControl};
use crate::error::{CallError, Result};
use crate::model::{InsertOutcome, NewOrder, OrderStatus, DEFAULT_COD_LABEL};
use crate::pipeline::Pipeline;
use crate::rules::is_cod;
use crate::workflows::contexts::IngestCtxData;
use crate::workflows::outcomes::IngestOutcome;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

pub(crate) fn build_ingest_pipeline() -> Pipeline<IngestCtxData, CallError> {
  let mut p = Pipeline::<IngestCtxData, CallError>::new(&[
    ("validate_payload", false, None),
    ("check_duplicate", false, None),
    ("classify_payment", false, None),
    ("normalize_order", false, None),
    ("schedule_first_call", false, None),
    ("persist_order", false, None),
  ]);

  p.on_root("validate_payload", validate_payload);
  p.on_root("check_duplicate", check_duplicate);
  p.on_root("classify_payment", classify_payment);
  p.on_root("normalize_order", normalize_order);
  p.on_root("schedule_first_call", schedule_first_call);
  p.on_root("persist_order", persist_order);
  p
}

fn external_id(data: &IngestCtxData) -> Result<i64> {
  data
    .external_id
    .ok_or_else(|| CallError::Internal("ingest step ran before the payload was validated".to_string()))
}

async fn validate_payload(ctx: ContextData<IngestCtxData>) -> Result<PipelineControl> {
  let id = ctx.read().raw.id;
  let Some(id) = id else {
    return Err(CallError::Validation("Invalid order payload: missing order id".to_string()));
  };
  ctx.write().external_id = Some(id);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "ingest::check_duplicate", skip_all)]
async fn check_duplicate(ctx: ContextData<IngestCtxData>) -> Result<PipelineControl> {
  let (storage, external_order_id) = {
    let guard = ctx.read();
    (guard.deps.storage.clone(), external_id(&guard)?)
  };

  if let Some(existing) = storage.find_order_by_external_id(external_order_id).await? {
    info!(external_order_id, order_id = %existing.id, "Order already stored, skipping.");
    ctx.write().outcome = Some(IngestOutcome::Duplicate {
      existing_id: Some(existing.id),
    });
    return Ok(PipelineControl::Stop);
  }
  Ok(PipelineControl::Continue)
}

async fn classify_payment(ctx: ContextData<IngestCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  let cod_label = guard.store.as_ref().map_or(DEFAULT_COD_LABEL, |s| s.cod_label());
  if is_cod(&guard.raw.payment_gateway_names, cod_label) {
    return Ok(PipelineControl::Continue);
  }

  debug!(
    external_order_id = ?guard.external_id,
    gateways = ?guard.raw.payment_gateway_names,
    "Not a cash-on-delivery order, skipping."
  );
  guard.outcome = Some(IngestOutcome::NotCod);
  Ok(PipelineControl::Stop)
}

async fn normalize_order(ctx: ContextData<IngestCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  let data = &mut *guard;
  let raw = &data.raw;

  data.new_order = Some(NewOrder {
    store_id: data.store.as_ref().map(|s| s.id),
    external_order_id: external_id(data)?,
    order_number: raw.order_number_display(),
    customer_name: raw.customer_name(),
    customer_phone: raw.customer_phone(),
    address: raw.display_address(),
    product: raw.product_description(),
    amount: raw.amount(),
    currency: raw.currency_code(),
    status: OrderStatus::Pending,
    call_scheduled_at: data.now.with_timezone(&Utc),
  });
  Ok(PipelineControl::Continue)
}

async fn schedule_first_call(ctx: ContextData<IngestCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  let data = &mut *guard;
  let eligibility = data.settings.hours.next_eligible(data.now, data.settings.wait());

  let Some(order) = data.new_order.as_mut() else {
    return Err(CallError::Internal("schedule_first_call ran without a normalised order".to_string()));
  };
  order.call_scheduled_at = eligibility.at.with_timezone(&Utc);
  order.status = if eligibility.fell_outside {
    OrderStatus::Scheduled
  } else {
    OrderStatus::Pending
  };
  Ok(PipelineControl::Continue)
}

#[instrument(name = "ingest::persist_order", skip_all)]
async fn persist_order(ctx: ContextData<IngestCtxData>) -> Result<PipelineControl> {
  let (storage, new_order) = {
    let guard = ctx.read();
    (guard.deps.storage.clone(), guard.new_order.clone())
  };
  let new_order =
    new_order.ok_or_else(|| CallError::Internal("persist_order ran without a normalised order".to_string()))?;
  let external_order_id = new_order.external_order_id;

  let outcome = match storage.insert_order(new_order).await? {
    InsertOutcome::Created(order) => {
      info!(
        order_id = %order.id,
        external_order_id,
        order_number = %order.order_number,
        status = %order.status,
        call_scheduled_at = ?order.call_scheduled_at,
        "COD order ingested."
      );
      IngestOutcome::Accepted {
        order_id: order.id,
        order_number: order.order_number,
        customer_name: order.customer_name,
        status: order.status,
      }
    }
    InsertOutcome::Duplicate => {
      warn!(external_order_id, "Insert rejected by the uniqueness check; order already stored.");
      IngestOutcome::Duplicate { existing_id: None }
    }
  };

  ctx.write().outcome = Some(outcome);
  Ok(PipelineControl::Continue)
}
