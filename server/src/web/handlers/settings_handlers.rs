// codcall_server/src/web/handlers/settings_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::get_settings", skip(app_state))]
pub async fn get_settings_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let settings = app_state.flow.storage().load_settings().await?;
  Ok(HttpResponse::Ok().json(json!({ "settings": settings })))
}

/// Every value is stored as text; non-string JSON values keep their JSON
/// spelling (`15`, `true`).
pub fn settings_entries(body: Map<String, JsonValue>) -> HashMap<String, String> {
  body
    .into_iter()
    .map(|(key, value)| {
      let value = match value {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
      };
      (key, value)
    })
    .collect()
}

#[instrument(name = "handler::save_settings", skip(app_state, body))]
pub async fn save_settings_handler(
  app_state: web::Data<AppState>,
  body: web::Json<JsonValue>,
) -> Result<HttpResponse, AppError> {
  let JsonValue::Object(map) = body.into_inner() else {
    return Err(AppError::Validation("Invalid settings".to_string()));
  };
  let entries = settings_entries(map);
  app_state.flow.storage().save_settings(&entries).await?;
  info!(keys = ?entries.keys().collect::<Vec<_>>(), "Settings saved.");
  Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
