// codcall_server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use codcall::model::{CallAttempt, CallFilter, Order, OrderFilter, OrderStatus, Store};
use codcall::workflows::OperatorUpdate;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{day_end, day_start};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
  pub status: Option<OrderStatus>,
  pub store_id: Option<Uuid>,
  pub from: Option<NaiveDate>,
  pub to: Option<NaiveDate>,
  pub search: Option<String>,
  pub limit: Option<i64>,
}

impl From<ListOrdersQuery> for OrderFilter {
  fn from(query: ListOrdersQuery) -> Self {
    OrderFilter {
      status: query.status,
      store_id: query.store_id,
      created_from: query.from.map(day_start),
      created_to: query.to.map(day_end),
      search: query.search.filter(|s| !s.trim().is_empty()),
      limit: query.limit,
    }
  }
}

/// An order as the dashboard shows it: with its store and its calls, newest
/// call first.
#[derive(Debug, Serialize)]
pub struct OrderView {
  #[serde(flatten)]
  pub order: Order,
  pub store_name: String,
  pub store_url: String,
  pub calls: Vec<CallAttempt>,
  pub last_call: Option<CallAttempt>,
}

impl OrderView {
  fn new(order: Order, store: Option<&Store>, calls: Vec<CallAttempt>) -> Self {
    Self {
      store_name: store.map(|s| s.name.clone()).unwrap_or_default(),
      store_url: store.map(|s| s.url.clone()).unwrap_or_default(),
      last_call: calls.first().cloned(),
      calls,
      order,
    }
  }
}

#[instrument(name = "handler::list_orders", skip(app_state, query))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let storage = app_state.flow.storage();
  let orders = storage.list_orders(&query.into_inner().into()).await?;
  let stores: HashMap<Uuid, Store> = storage.list_stores().await?.into_iter().map(|s| (s.id, s)).collect();

  let calls = try_join_all(orders.iter().map(|order| {
    let filter = CallFilter {
      order_id: Some(order.id),
      ..Default::default()
    };
    async move { storage.list_call_attempts(&filter).await }
  }))
  .await?;

  let views: Vec<OrderView> = orders
    .into_iter()
    .zip(calls)
    .map(|(order, calls)| {
      let store = order.store_id.and_then(|id| stores.get(&id));
      OrderView::new(order, store, calls)
    })
    .collect();
  info!(count = views.len(), "Orders listed.");

  Ok(HttpResponse::Ok().json(json!({ "orders": views })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
  pub id: Option<Uuid>,
  #[serde(flatten)]
  pub update: OperatorUpdate,
}

#[instrument(name = "handler::update_order", skip(app_state, body))]
pub async fn update_order_handler(
  app_state: web::Data<AppState>,
  body: web::Json<UpdateOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let UpdateOrderRequest { id, update } = body.into_inner();
  let id = id.ok_or_else(|| AppError::Validation("Missing order id".to_string()))?;
  let order = app_state.flow.override_order(id, update).await?;
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}
