// codcall_server/src/web/handlers/call_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use codcall::model::{CallFilter, CallResult};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use super::{day_end, day_start};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListCallsQuery {
  pub order_id: Option<Uuid>,
  pub result: Option<CallResult>,
  pub from: Option<NaiveDate>,
  pub to: Option<NaiveDate>,
  pub limit: Option<i64>,
}

impl From<ListCallsQuery> for CallFilter {
  fn from(query: ListCallsQuery) -> Self {
    CallFilter {
      order_id: query.order_id,
      result: query.result,
      created_from: query.from.map(day_start),
      created_to: query.to.map(day_end),
      limit: query.limit,
    }
  }
}

#[instrument(name = "handler::list_calls", skip(app_state, query))]
pub async fn list_calls_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListCallsQuery>,
) -> Result<HttpResponse, AppError> {
  let calls = app_state
    .flow
    .storage()
    .list_call_attempts(&query.into_inner().into())
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "calls": calls })))
}
