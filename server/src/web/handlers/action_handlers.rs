// codcall_server/src/web/handlers/action_handlers.rs

//! Operator-triggered runs: dispatch now, sync now, test call.

use actix_web::{web, HttpResponse};
use codcall::workflows::TestCallRequest;
use codcall::CallError;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::trigger_calls", skip(app_state))]
pub async fn trigger_calls_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let settings = app_state.flow.load_settings().await?;
  let report = app_state
    .flow
    .dispatch_pending_calls(app_state.now(), &settings)
    .await?;
  info!(triggered = report.triggered, "Manual dispatch finished.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "triggered": report.triggered,
    "results": report.results,
    "message": report.message,
  })))
}

#[instrument(name = "handler::shopify_sync", skip(app_state))]
pub async fn shopify_sync_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let settings = app_state.flow.load_settings().await?;
  let report = app_state.flow.sync_all_stores(app_state.now(), &settings).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "synced": report.synced,
    "new_orders": report.new_orders,
    "errors": report.errors,
  })))
}

#[instrument(name = "handler::test_call", skip(app_state, body))]
pub async fn test_call_handler(
  app_state: web::Data<AppState>,
  body: web::Json<TestCallRequest>,
) -> Result<HttpResponse, AppError> {
  let settings = app_state.flow.load_settings().await?;
  match app_state.flow.place_test_call(body.into_inner(), &settings).await {
    Ok(placed) => Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "message": "Llamada de prueba iniciada correctamente",
      "call_id": placed.id,
      "status": placed.status,
    }))),
    Err(CallError::Provider { message, .. }) => {
      warn!(detail = %message, "Test call refused by the provider.");
      Ok(HttpResponse::BadRequest().json(json!({
        "error": "Error al iniciar la llamada de prueba",
        "details": message,
      })))
    }
    Err(e) => Err(e.into()),
  }
}
