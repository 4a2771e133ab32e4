// codcall_server/src/web/handlers/webhook_handlers.rs

//! Inbound webhooks: Shopify order creation, Vapi end-of-call reports and
//! Vapi in-call tool invocations.

use actix_web::{web, HttpRequest, HttpResponse};
use codcall::payload::{CompletionReport, RawOrder, ToolCall, ToolReply};
use codcall::workflows::tool_call::INTERNAL_ERROR_REPLY;
use codcall::workflows::{CompletionOutcome, IngestOutcome};
use serde_json::{json, Value as JsonValue};
use tracing::{error, info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;

const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

pub fn ingest_response(outcome: &IngestOutcome) -> JsonValue {
  match outcome {
    IngestOutcome::Accepted { order_id, status, .. } => {
      json!({ "success": true, "order_id": order_id, "status": status })
    }
    IngestOutcome::Duplicate { existing_id } => json!({ "message": "Order already exists", "id": existing_id }),
    IngestOutcome::NotCod => json!({ "message": "Not a COD order, skipped" }),
  }
}

pub fn completion_response(outcome: &CompletionOutcome) -> JsonValue {
  match outcome {
    CompletionOutcome::Ignored => json!({ "message": "Ignored non-end event" }),
    CompletionOutcome::Applied {
      result,
      order_status,
      retry_at,
    } => json!({ "success": true, "result": result, "orderStatus": order_status, "retryAt": retry_at }),
    CompletionOutcome::Replayed { result, order_status } => {
      json!({ "success": true, "result": result, "orderStatus": order_status, "replayed": true })
    }
  }
}

#[instrument(
  name = "handler::shopify_webhook",
  skip(app_state, req, body),
  fields(shop_domain = ?req.headers().get(SHOP_DOMAIN_HEADER).and_then(|h| h.to_str().ok()))
)]
pub async fn shopify_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Json<JsonValue>,
) -> Result<HttpResponse, AppError> {
  let raw: RawOrder = serde_json::from_value(body.into_inner())
    .map_err(|e| AppError::Validation(format!("Invalid order payload: {}", e)))?;

  let shop_domain = req
    .headers()
    .get(SHOP_DOMAIN_HEADER)
    .and_then(|h| h.to_str().ok())
    .map(str::trim)
    .filter(|d| !d.is_empty());

  let flow = &app_state.flow;
  let store = match shop_domain {
    Some(domain) => {
      let store = flow.storage().find_store_by_domain(domain).await?;
      if store.is_none() {
        warn!(domain = %domain, "No active store for shop domain; using defaults.");
      }
      store
    }
    None => None,
  };

  let settings = flow.load_settings().await?;
  let outcome = flow
    .ingest_order(raw, store.as_ref(), &settings, app_state.now())
    .await?;
  info!(outcome = ?outcome, "Shopify webhook handled.");
  Ok(HttpResponse::Ok().json(ingest_response(&outcome)))
}

#[instrument(name = "handler::vapi_callback", skip(app_state, body))]
pub async fn vapi_callback_handler(
  app_state: web::Data<AppState>,
  body: web::Json<JsonValue>,
) -> Result<HttpResponse, AppError> {
  let report = CompletionReport::from_json(&body);
  let settings = app_state.flow.load_settings().await?;
  let outcome = app_state
    .flow
    .apply_call_completion(report, &settings, app_state.now())
    .await?;
  Ok(HttpResponse::Ok().json(completion_response(&outcome)))
}

/// Always answers 200 once a tool call is found, so the assistant can keep
/// talking; failures become a manual-review message.
#[instrument(name = "handler::vapi_tool", skip(app_state, body))]
pub async fn vapi_tool_handler(
  app_state: web::Data<AppState>,
  body: web::Json<JsonValue>,
) -> Result<HttpResponse, AppError> {
  let tool_call =
    ToolCall::from_json(&body).ok_or_else(|| AppError::Validation("No tool call found in payload".to_string()))?;
  let tool_call_id = tool_call.id.clone();

  let reply = match app_state.flow.apply_tool_decision(tool_call).await {
    Ok(reply) => reply,
    Err(e) => {
      error!(error = %e, tool_call_id = %tool_call_id, "Tool decision failed.");
      ToolReply::new(tool_call_id, INTERNAL_ERROR_REPLY)
    }
  };
  Ok(HttpResponse::Ok().json(reply.to_body()))
}
