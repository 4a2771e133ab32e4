// codcall_server/src/db/pg_store.rs

//! PostgreSQL implementation of the storage port.

use crate::db::rows::{into_attempts, into_orders, CallRow, OrderRow, StoreRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codcall::model::{
  CallAttempt, CallCompletion, CallFilter, InsertOutcome, NewCallAttempt, NewOrder, NewStore, Order, OrderFilter,
  OrderGuard, OrderPatch, OrderStatus, Store, DEFAULT_COD_LABEL,
};
use codcall::{CallError, Storage};
use futures_util::TryStreamExt;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};
use uuid::Uuid;

type Result<T> = codcall::Result<T>;

const ORDER_COLUMNS: &str = "id, store_id, shopify_order_id, order_number, customer_name, customer_phone, address, \
   product, amount, currency, status, call_scheduled_at, call_attempts, address_corrected, notes, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

fn db_err(err: sqlx::Error) -> CallError {
  CallError::persistence(err)
}

fn status_names(statuses: &[OrderStatus]) -> Vec<String> {
  statuses.iter().map(|s| s.as_str().to_string()).collect()
}

/// `UPDATE ecom_orders SET ... WHERE id = $n`. The caller appends any extra
/// conditions and the RETURNING clause.
fn order_update<'a>(id: Uuid, patch: &OrderPatch, now: DateTime<Utc>) -> QueryBuilder<'a, Postgres> {
  let mut qb = QueryBuilder::new("UPDATE ecom_orders SET updated_at = ");
  qb.push_bind(now);
  if let Some(status) = patch.status {
    qb.push(", status = ").push_bind(status.as_str());
  }
  if let Some(at) = patch.call_scheduled_at {
    qb.push(", call_scheduled_at = ").push_bind(at);
  }
  if let Some(attempts) = patch.call_attempts {
    qb.push(", call_attempts = ").push_bind(attempts);
  }
  if let Some(address) = &patch.address_corrected {
    qb.push(", address_corrected = ").push_bind(address.clone());
  }
  if let Some(notes) = &patch.notes {
    qb.push(", notes = ").push_bind(notes.clone());
  }
  qb.push(" WHERE id = ").push_bind(id);
  qb
}

#[async_trait]
impl Storage for PgStore {
  #[instrument(name = "PgStore::insert_order", skip_all, fields(external_order_id = order.external_order_id))]
  async fn insert_order(&self, order: NewOrder) -> Result<InsertOutcome> {
    let sql = format!(
      "INSERT INTO ecom_orders (store_id, shopify_order_id, order_number, customer_name, customer_phone, address, \
       product, amount, currency, status, call_scheduled_at, call_attempts) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0) \
       ON CONFLICT (shopify_order_id) DO NOTHING RETURNING {}",
      ORDER_COLUMNS
    );
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(order.store_id)
      .bind(order.external_order_id)
      .bind(&order.order_number)
      .bind(&order.customer_name)
      .bind(&order.customer_phone)
      .bind(&order.address)
      .bind(&order.product)
      .bind(order.amount)
      .bind(&order.currency)
      .bind(order.status.as_str())
      .bind(order.call_scheduled_at)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)?;

    match row {
      Some(row) => Ok(InsertOutcome::Created(row.try_into()?)),
      None => {
        debug!("Insert skipped by the unique external id.");
        Ok(InsertOutcome::Duplicate)
      }
    }
  }

  async fn find_order_by_external_id(&self, external_order_id: i64) -> Result<Option<Order>> {
    let sql = format!("SELECT {} FROM ecom_orders WHERE shopify_order_id = $1", ORDER_COLUMNS);
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(external_order_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)?;
    row.map(Order::try_from).transpose()
  }

  async fn existing_external_ids(&self, ids: &[i64]) -> Result<HashSet<i64>> {
    if ids.is_empty() {
      return Ok(HashSet::new());
    }
    sqlx::query_scalar::<_, i64>("SELECT shopify_order_id FROM ecom_orders WHERE shopify_order_id = ANY($1)")
      .bind(ids)
      .fetch(&self.pool)
      .try_collect::<HashSet<i64>>()
      .await
      .map_err(db_err)
  }

  async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
    let sql = format!("SELECT {} FROM ecom_orders WHERE id = $1", ORDER_COLUMNS);
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)?;
    row.map(Order::try_from).transpose()
  }

  async fn due_orders(&self, now: DateTime<Utc>, max_retries: i32, limit: usize) -> Result<Vec<Order>> {
    let sql = format!(
      "SELECT {} FROM ecom_orders \
       WHERE status = ANY($1) AND call_scheduled_at <= $2 AND call_attempts < $3 \
       ORDER BY call_scheduled_at ASC LIMIT $4",
      ORDER_COLUMNS
    );
    let rows: Vec<OrderRow> = sqlx::query_as(&sql)
      .bind(status_names(&OrderStatus::DISPATCHABLE))
      .bind(now)
      .bind(max_retries)
      .bind(limit as i64)
      .fetch_all(&self.pool)
      .await
      .map_err(db_err)?;
    into_orders(rows)
  }

  #[instrument(name = "PgStore::update_order_if", skip(self, guard, patch))]
  async fn update_order_if(&self, id: Uuid, guard: &OrderGuard, patch: &OrderPatch) -> Result<bool> {
    let mut qb = order_update(id, patch, Utc::now());
    qb.push(" AND status = ANY(").push_bind(status_names(&guard.statuses)).push(")");
    if let Some(attempts) = guard.call_attempts {
      qb.push(" AND call_attempts = ").push_bind(attempts);
    }
    let result = qb.build().execute(&self.pool).await.map_err(db_err)?;
    Ok(result.rows_affected() > 0)
  }

  async fn update_order(&self, id: Uuid, patch: &OrderPatch) -> Result<Option<Order>> {
    let mut qb = order_update(id, patch, Utc::now());
    qb.push(" RETURNING ").push(ORDER_COLUMNS);
    let row: Option<OrderRow> = qb
      .build_query_as()
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)?;
    row.map(Order::try_from).transpose()
  }

  async fn latest_in_call_order(&self) -> Result<Option<Order>> {
    let sql = format!(
      "SELECT {} FROM ecom_orders WHERE status = $1 ORDER BY updated_at DESC LIMIT 1",
      ORDER_COLUMNS
    );
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(OrderStatus::InCall.as_str())
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)?;
    row.map(Order::try_from).transpose()
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM ecom_orders WHERE TRUE", ORDER_COLUMNS));
    if let Some(status) = filter.status {
      qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(store_id) = filter.store_id {
      qb.push(" AND store_id = ").push_bind(store_id);
    }
    if let Some(from) = filter.created_from {
      qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
      qb.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
      let pattern = format!("%{}%", search);
      qb.push(" AND (customer_name ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR customer_phone ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR order_number ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR product ILIKE ")
        .push_bind(pattern)
        .push(")");
    }
    qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(filter.effective_limit());

    let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&self.pool).await.map_err(db_err)?;
    into_orders(rows)
  }

  async fn insert_call_attempt(&self, attempt: NewCallAttempt) -> Result<CallAttempt> {
    let row: CallRow = sqlx::query_as(
      "INSERT INTO ecom_calls (order_id, vapi_call_id, attempt_number, started_at) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(attempt.order_id)
    .bind(&attempt.provider_call_id)
    .bind(attempt.attempt_number)
    .bind(attempt.started_at)
    .fetch_one(&self.pool)
    .await
    .map_err(db_err)?;
    row.try_into()
  }

  async fn find_call_attempt(&self, provider_call_id: &str) -> Result<Option<CallAttempt>> {
    let row: Option<CallRow> =
      sqlx::query_as("SELECT * FROM ecom_calls WHERE vapi_call_id = $1 ORDER BY created_at DESC LIMIT 1")
        .bind(provider_call_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
    row.map(CallAttempt::try_from).transpose()
  }

  #[instrument(name = "PgStore::complete_call", skip(self, completion, patch))]
  async fn complete_call(
    &self,
    provider_call_id: &str,
    completion: &CallCompletion,
    order_id: Uuid,
    patch: &OrderPatch,
  ) -> Result<bool> {
    let mut tx = self.pool.begin().await.map_err(db_err)?;

    let closed = sqlx::query(
      "UPDATE ecom_calls SET ended_at = $2, duration_seconds = $3, cost = $4, ended_reason = $5, transcript = $6, \
       recording_url = $7, summary = $8, result = $9 \
       WHERE vapi_call_id = $1 AND ended_at IS NULL",
    )
    .bind(provider_call_id)
    .bind(completion.ended_at)
    .bind(completion.duration_seconds)
    .bind(completion.cost)
    .bind(&completion.ended_reason)
    .bind(&completion.transcript)
    .bind(&completion.recording_url)
    .bind(&completion.summary)
    .bind(completion.result.as_str())
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;

    if closed.rows_affected() == 0 {
      tx.rollback().await.map_err(db_err)?;
      debug!("Attempt already closed, nothing written.");
      return Ok(false);
    }

    order_update(order_id, patch, completion.ended_at)
      .build()
      .execute(&mut *tx)
      .await
      .map_err(db_err)?;
    tx.commit().await.map_err(db_err)?;
    Ok(true)
  }

  async fn list_call_attempts(&self, filter: &CallFilter) -> Result<Vec<CallAttempt>> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM ecom_calls WHERE TRUE");
    if let Some(order_id) = filter.order_id {
      qb.push(" AND order_id = ").push_bind(order_id);
    }
    if let Some(result) = filter.result {
      qb.push(" AND result = ").push_bind(result.as_str());
    }
    if let Some(from) = filter.created_from {
      qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
      qb.push(" AND created_at <= ").push_bind(to);
    }
    qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(filter.effective_limit());

    let rows: Vec<CallRow> = qb.build_query_as().fetch_all(&self.pool).await.map_err(db_err)?;
    into_attempts(rows)
  }

  async fn load_settings(&self) -> Result<HashMap<String, String>> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM ecom_settings")
      .fetch_all(&self.pool)
      .await
      .map_err(db_err)?;
    Ok(rows.into_iter().collect())
  }

  async fn save_settings(&self, entries: &HashMap<String, String>) -> Result<()> {
    let mut tx = self.pool.begin().await.map_err(db_err)?;
    for (key, value) in entries {
      sqlx::query("INSERT INTO ecom_settings (key, value) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value")
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
    }
    tx.commit().await.map_err(db_err)
  }

  async fn active_stores(&self) -> Result<Vec<Store>> {
    let rows: Vec<StoreRow> =
      sqlx::query_as("SELECT * FROM ecom_stores WHERE is_active AND access_token <> '' ORDER BY created_at ASC")
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
    Ok(rows.into_iter().map(Store::from).collect())
  }

  async fn get_store(&self, id: Uuid) -> Result<Option<Store>> {
    let row: Option<StoreRow> = sqlx::query_as("SELECT * FROM ecom_stores WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)?;
    Ok(row.map(Store::from))
  }

  async fn find_store_by_domain(&self, domain: &str) -> Result<Option<Store>> {
    let row: Option<StoreRow> = sqlx::query_as("SELECT * FROM ecom_stores WHERE is_active AND url ILIKE $1 LIMIT 1")
      .bind(format!("%{}%", domain))
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)?;
    Ok(row.map(Store::from))
  }

  async fn list_stores(&self) -> Result<Vec<Store>> {
    let rows: Vec<StoreRow> = sqlx::query_as("SELECT * FROM ecom_stores ORDER BY created_at DESC")
      .fetch_all(&self.pool)
      .await
      .map_err(db_err)?;
    Ok(rows.into_iter().map(Store::from).collect())
  }

  async fn create_store(&self, store: NewStore) -> Result<Store> {
    let cod_label = store
      .cod_gateway_name
      .filter(|label| !label.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_COD_LABEL.to_string());
    let row: StoreRow = sqlx::query_as(
      "INSERT INTO ecom_stores (name, url, access_token, cod_gateway_name, is_active) \
       VALUES ($1, $2, $3, $4, TRUE) RETURNING *",
    )
    .bind(&store.name)
    .bind(&store.url)
    .bind(&store.access_token)
    .bind(cod_label)
    .fetch_one(&self.pool)
    .await
    .map_err(db_err)?;
    Ok(row.into())
  }

  async fn delete_store(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM ecom_stores WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await
      .map_err(db_err)?;
    Ok(result.rows_affected() > 0)
  }
}
