// codcall_server/src/web/handlers/store_handlers.rs

use actix_web::{web, HttpResponse};
use codcall::model::NewStore;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::list_stores", skip(app_state))]
pub async fn list_stores_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let stores = app_state.flow.storage().list_stores().await?;
  Ok(HttpResponse::Ok().json(json!({ "stores": stores })))
}

#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub url: String,
  #[serde(default)]
  pub access_token: String,
  #[serde(default)]
  pub cod_gateway_name: Option<String>,
}

impl CreateStoreRequest {
  pub fn into_new_store(self) -> Result<NewStore, AppError> {
    if self.name.trim().is_empty() || self.url.trim().is_empty() {
      return Err(AppError::Validation("Name and URL are required".to_string()));
    }
    Ok(NewStore {
      name: self.name.trim().to_string(),
      url: self.url.trim().to_string(),
      access_token: self.access_token.trim().to_string(),
      cod_gateway_name: self.cod_gateway_name,
    })
  }
}

#[instrument(name = "handler::create_store", skip(app_state, body))]
pub async fn create_store_handler(
  app_state: web::Data<AppState>,
  body: web::Json<CreateStoreRequest>,
) -> Result<HttpResponse, AppError> {
  let new_store = body.into_inner().into_new_store()?;
  let store = app_state.flow.storage().create_store(new_store).await?;
  info!(store_id = %store.id, store = %store.name, "Store created.");
  Ok(HttpResponse::Created().json(json!({ "store": store })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteStoreQuery {
  pub id: Option<Uuid>,
}

#[instrument(name = "handler::delete_store", skip(app_state, query))]
pub async fn delete_store_handler(
  app_state: web::Data<AppState>,
  query: web::Query<DeleteStoreQuery>,
) -> Result<HttpResponse, AppError> {
  let id = query
    .id
    .ok_or_else(|| AppError::Validation("Missing store id".to_string()))?;
  if !app_state.flow.storage().delete_store(id).await? {
    warn!(store_id = %id, "Delete requested for an unknown store.");
  }
  Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn name_and_url_are_required() {
    let request = CreateStoreRequest {
      name: "Tienda Norte".to_string(),
      url: " ".to_string(),
      access_token: String::new(),
      cod_gateway_name: None,
    };
    assert!(matches!(request.into_new_store(), Err(AppError::Validation(_))));

    let request: CreateStoreRequest =
      serde_json::from_value(json!({ "name": " Tienda Norte ", "url": "norte.myshopify.com" })).unwrap();
    let store = request.into_new_store().unwrap();
    assert_eq!(store.name, "Tienda Norte");
    assert_eq!(store.access_token, "");
    assert_eq!(store.cod_gateway_name, None);
  }
}
