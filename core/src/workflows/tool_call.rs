// codcall/src/workflows/tool_call.rs

//! In-call decisions reported by the assistant through its tool function.
//!
//! Every path ends with a reply the assistant can read back; failures to find
//! or update the order are reported as "manual review" messages, not errors.

use crate::core::{ContextData, PipelineControl};
use crate::error::{CallError, Result};
use crate::model::{OrderEvent, OrderPatch};
use crate::payload::ToolReply;
use crate::pipeline::Pipeline;
use crate::workflows::contexts::ToolDecisionCtxData;
use tracing::{error, info, instrument, warn};

/// The only tool function the assistant is given.
pub const TOOL_FUNCTION_NAME: &str = "actualizar_pedido";

pub const UNKNOWN_FUNCTION_REPLY: &str = "Función no reconocida";
pub const NO_ACTIVE_ORDER_REPLY: &str = "No se encontró el pedido activo. El equipo lo revisará manualmente.";
pub const UPDATE_FAILED_REPLY: &str = "Error al actualizar el pedido. El equipo lo revisará manualmente.";
pub const INTERNAL_ERROR_REPLY: &str = "Error interno. El equipo revisará el pedido manualmente.";

pub(crate) fn build_tool_decision_pipeline() -> Pipeline<ToolDecisionCtxData, CallError> {
  let mut p = Pipeline::<ToolDecisionCtxData, CallError>::new(&[
    ("check_function", false, None),
    ("resolve_order", false, None),
    ("apply_decision", false, None),
  ]);

  p.on_root("check_function", check_function);
  p.on_root("resolve_order", resolve_order);
  p.on_root("apply_decision", apply_decision);
  p
}

fn reply(ctx: &ContextData<ToolDecisionCtxData>, message: impl Into<String>) {
  let mut guard = ctx.write();
  let tool_call_id = guard.tool_call.id.clone();
  guard.reply = Some(ToolReply::new(tool_call_id, message));
}

async fn check_function(ctx: ContextData<ToolDecisionCtxData>) -> Result<PipelineControl> {
  let function_name = ctx.read().tool_call.function_name.clone();
  if function_name == TOOL_FUNCTION_NAME {
    return Ok(PipelineControl::Continue);
  }
  info!(function_name = %function_name, "Unrecognised tool function.");
  reply(&ctx, UNKNOWN_FUNCTION_REPLY);
  Ok(PipelineControl::Stop)
}

/// Call attempt → order first; otherwise the most recently updated order that
/// is currently in a call. The fallback can pick the wrong order when several
/// calls are live at once.
#[instrument(name = "tool_call::resolve_order", skip_all)]
async fn resolve_order(ctx: ContextData<ToolDecisionCtxData>) -> Result<PipelineControl> {
  let (storage, provider_call_id) = {
    let guard = ctx.read();
    (guard.deps.storage.clone(), guard.tool_call.provider_call_id.clone())
  };

  let mut order = None;
  if let Some(call_id) = provider_call_id.as_deref().filter(|id| !id.is_empty()) {
    if let Some(attempt) = storage.find_call_attempt(call_id).await? {
      order = storage.get_order(attempt.order_id).await?;
    }
  }
  if order.is_none() {
    warn!(provider_call_id = ?provider_call_id, "No order linked to the call, falling back to the latest in-call order.");
    order = storage.latest_in_call_order().await?;
  }

  match order {
    Some(order) => {
      ctx.write().order = Some(order);
      Ok(PipelineControl::Continue)
    }
    None => {
      warn!("No active order for tool call.");
      reply(&ctx, NO_ACTIVE_ORDER_REPLY);
      Ok(PipelineControl::Stop)
    }
  }
}

#[instrument(name = "tool_call::apply_decision", skip_all)]
async fn apply_decision(ctx: ContextData<ToolDecisionCtxData>) -> Result<PipelineControl> {
  let (storage, order, decision, new_address) = {
    let guard = ctx.read();
    (
      guard.deps.storage.clone(),
      guard.order.clone(),
      guard.tool_call.decision(),
      guard.tool_call.new_address(),
    )
  };
  let order = order.ok_or_else(|| CallError::Internal("apply_decision ran without an order".to_string()))?;

  let (event, message) = match decision.as_str() {
    "confirmado" if !new_address.is_empty() => (
      OrderEvent::AgentConfirmed { address_changed: true },
      format!("Pedido {} confirmado con nueva dirección: {}", order.order_number, new_address),
    ),
    "confirmado" => (
      OrderEvent::AgentConfirmed { address_changed: false },
      format!("Pedido {} confirmado correctamente", order.order_number),
    ),
    "rechazado" => (
      OrderEvent::AgentRejected,
      format!("Pedido {} marcado como rechazado", order.order_number),
    ),
    other => {
      info!(order_id = %order.id, decision = %other, "Unrecognised decision, leaving order untouched.");
      reply(&ctx, format!("Resultado \"{}\" no reconocido. El equipo lo revisará.", other));
      return Ok(PipelineControl::Continue);
    }
  };

  let status = order.status.apply(event)?;
  let mut patch = OrderPatch::status(status);
  if let OrderEvent::AgentConfirmed { address_changed: true } = event {
    patch = patch.with_address_corrected(new_address);
  }

  let message = match storage.update_order(order.id, &patch).await {
    Ok(Some(_)) => {
      info!(order_id = %order.id, status = %status, "Order updated from in-call decision.");
      message
    }
    Ok(None) => {
      error!(order_id = %order.id, "Order vanished before the decision was applied.");
      UPDATE_FAILED_REPLY.to_string()
    }
    Err(e) => {
      error!(order_id = %order.id, error = %e, "Failed to apply in-call decision.");
      UPDATE_FAILED_REPLY.to_string()
    }
  };

  reply(&ctx, message);
  Ok(PipelineControl::Continue)
}
