// codcall/src/memory.rs

//! `MemoryStore`: a process-local `Storage` behind one `parking_lot` mutex.
//!
//! Every trait method takes the lock once, so each call is atomic with
//! respect to the others, including the compare-and-set and the two-record
//! `complete_call`.

use crate::error::{CallError, Result};
use crate::model::{
  CallAttempt, CallCompletion, CallFilter, InsertOutcome, NewCallAttempt, NewOrder, NewStore, Order, OrderFilter,
  OrderGuard, OrderPatch, OrderStatus, Store, DEFAULT_COD_LABEL,
};
use crate::ports::Storage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  orders: Vec<Order>,
  calls: Vec<CallAttempt>,
  settings: HashMap<String, String>,
  stores: Vec<Store>,
}

#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_settings<K: Into<String>, V: Into<String>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
    let store = Self::new();
    store
      .tables
      .lock()
      .settings
      .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
    store
  }

  /// Inserts a fully-formed order, bypassing the uniqueness check. Fixture helper.
  pub fn put_order(&self, order: Order) {
    self.tables.lock().orders.push(order);
  }

  pub fn put_call_attempt(&self, attempt: CallAttempt) {
    self.tables.lock().calls.push(attempt);
  }

  pub fn put_store(&self, store: Store) {
    self.tables.lock().stores.push(store);
  }

  pub fn orders(&self) -> Vec<Order> {
    self.tables.lock().orders.clone()
  }

  pub fn call_attempts(&self) -> Vec<CallAttempt> {
    self.tables.lock().calls.clone()
  }
}

#[async_trait]
impl Storage for MemoryStore {
  async fn insert_order(&self, order: NewOrder) -> Result<InsertOutcome> {
    let mut tables = self.tables.lock();
    if tables.orders.iter().any(|o| o.external_order_id == order.external_order_id) {
      return Ok(InsertOutcome::Duplicate);
    }
    let now = Utc::now();
    let created = Order {
      id: Uuid::new_v4(),
      store_id: order.store_id,
      external_order_id: order.external_order_id,
      order_number: order.order_number,
      customer_name: order.customer_name,
      customer_phone: order.customer_phone,
      address: order.address,
      product: order.product,
      amount: order.amount,
      currency: order.currency,
      status: order.status,
      call_scheduled_at: Some(order.call_scheduled_at),
      call_attempts: 0,
      address_corrected: None,
      notes: None,
      created_at: now,
      updated_at: now,
    };
    tables.orders.push(created.clone());
    Ok(InsertOutcome::Created(created))
  }

  async fn find_order_by_external_id(&self, external_order_id: i64) -> Result<Option<Order>> {
    let tables = self.tables.lock();
    Ok(tables.orders.iter().find(|o| o.external_order_id == external_order_id).cloned())
  }

  async fn existing_external_ids(&self, ids: &[i64]) -> Result<HashSet<i64>> {
    let wanted: HashSet<i64> = ids.iter().copied().collect();
    let tables = self.tables.lock();
    Ok(
      tables
        .orders
        .iter()
        .map(|o| o.external_order_id)
        .filter(|id| wanted.contains(id))
        .collect(),
    )
  }

  async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.tables.lock().orders.iter().find(|o| o.id == id).cloned())
  }

  async fn due_orders(&self, now: DateTime<Utc>, max_retries: i32, limit: usize) -> Result<Vec<Order>> {
    let tables = self.tables.lock();
    let mut due: Vec<Order> = tables
      .orders
      .iter()
      .filter(|o| o.status.is_dispatchable())
      .filter(|o| o.call_scheduled_at.map_or(false, |at| at <= now))
      .filter(|o| o.call_attempts < max_retries)
      .cloned()
      .collect();
    due.sort_by_key(|o| o.call_scheduled_at);
    due.truncate(limit);
    Ok(due)
  }

  async fn update_order_if(&self, id: Uuid, guard: &OrderGuard, patch: &OrderPatch) -> Result<bool> {
    let mut tables = self.tables.lock();
    match tables.orders.iter_mut().find(|o| o.id == id) {
      Some(order) if guard.matches(order) => {
        patch.apply_to(order, Utc::now());
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn update_order(&self, id: Uuid, patch: &OrderPatch) -> Result<Option<Order>> {
    let mut tables = self.tables.lock();
    Ok(tables.orders.iter_mut().find(|o| o.id == id).map(|order| {
      patch.apply_to(order, Utc::now());
      order.clone()
    }))
  }

  async fn latest_in_call_order(&self) -> Result<Option<Order>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .orders
        .iter()
        .filter(|o| o.status == OrderStatus::InCall)
        .max_by_key(|o| o.updated_at)
        .cloned(),
    )
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
    let tables = self.tables.lock();
    let mut orders: Vec<Order> = tables.orders.iter().filter(|o| filter.matches(o)).cloned().collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders.truncate(filter.effective_limit() as usize);
    Ok(orders)
  }

  async fn insert_call_attempt(&self, attempt: NewCallAttempt) -> Result<CallAttempt> {
    let mut tables = self.tables.lock();
    if tables.calls.iter().any(|c| c.provider_call_id == attempt.provider_call_id) {
      return Err(CallError::persistence(anyhow::anyhow!(
        "call attempt {} already exists",
        attempt.provider_call_id
      )));
    }
    let created = CallAttempt {
      id: Uuid::new_v4(),
      order_id: attempt.order_id,
      provider_call_id: attempt.provider_call_id,
      attempt_number: attempt.attempt_number,
      started_at: attempt.started_at,
      ended_at: None,
      duration_seconds: None,
      cost: None,
      ended_reason: None,
      transcript: None,
      recording_url: None,
      summary: None,
      result: None,
      created_at: Utc::now(),
    };
    tables.calls.push(created.clone());
    Ok(created)
  }

  async fn find_call_attempt(&self, provider_call_id: &str) -> Result<Option<CallAttempt>> {
    let tables = self.tables.lock();
    Ok(tables.calls.iter().find(|c| c.provider_call_id == provider_call_id).cloned())
  }

  async fn complete_call(
    &self,
    provider_call_id: &str,
    completion: &CallCompletion,
    order_id: Uuid,
    patch: &OrderPatch,
  ) -> Result<bool> {
    let mut tables = self.tables.lock();
    let Some(attempt_idx) = tables
      .calls
      .iter()
      .position(|c| c.provider_call_id == provider_call_id && c.is_open())
    else {
      return Ok(false);
    };
    completion.apply_to(&mut tables.calls[attempt_idx]);
    if let Some(order) = tables.orders.iter_mut().find(|o| o.id == order_id) {
      patch.apply_to(order, completion.ended_at);
    }
    Ok(true)
  }

  async fn list_call_attempts(&self, filter: &CallFilter) -> Result<Vec<CallAttempt>> {
    let tables = self.tables.lock();
    let mut calls: Vec<CallAttempt> = tables.calls.iter().filter(|c| filter.matches(c)).cloned().collect();
    calls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    calls.truncate(filter.effective_limit() as usize);
    Ok(calls)
  }

  async fn load_settings(&self) -> Result<HashMap<String, String>> {
    Ok(self.tables.lock().settings.clone())
  }

  async fn save_settings(&self, entries: &HashMap<String, String>) -> Result<()> {
    self
      .tables
      .lock()
      .settings
      .extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(())
  }

  async fn active_stores(&self) -> Result<Vec<Store>> {
    Ok(self.tables.lock().stores.iter().filter(|s| s.can_sync()).cloned().collect())
  }

  async fn get_store(&self, id: Uuid) -> Result<Option<Store>> {
    Ok(self.tables.lock().stores.iter().find(|s| s.id == id).cloned())
  }

  async fn find_store_by_domain(&self, domain: &str) -> Result<Option<Store>> {
    let needle = domain.to_lowercase();
    let tables = self.tables.lock();
    Ok(
      tables
        .stores
        .iter()
        .find(|s| s.is_active && s.url.to_lowercase().contains(&needle))
        .cloned(),
    )
  }

  async fn list_stores(&self) -> Result<Vec<Store>> {
    let mut stores = self.tables.lock().stores.clone();
    stores.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(stores)
  }

  async fn create_store(&self, store: NewStore) -> Result<Store> {
    let created = Store {
      id: Uuid::new_v4(),
      name: store.name,
      url: store.url,
      access_token: store.access_token,
      cod_gateway_name: store
        .cod_gateway_name
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_COD_LABEL.to_string()),
      is_active: true,
      created_at: Utc::now(),
    };
    self.tables.lock().stores.push(created.clone());
    Ok(created)
  }

  async fn delete_store(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    let before = tables.stores.len();
    tables.stores.retain(|s| s.id != id);
    Ok(tables.stores.len() != before)
  }
}
