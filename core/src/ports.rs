// codcall/src/ports.rs

//! Collaborators the workflows need: persistence, the voice-call provider and
//! the upstream commerce platform.
//!
//! Every implementation must bound its own I/O (request timeouts, pool
//! acquire timeouts); the workflows never wait on a collaborator without a
//! limit being enforced underneath.

use crate::error::Result;
use crate::model::{
  CallAttempt, CallCompletion, CallFilter, InsertOutcome, NewCallAttempt, NewOrder, NewStore, Order, OrderFilter,
  OrderGuard, OrderPatch, Store,
};
use crate::payload::{CallRequest, PlacedCall, RawOrder};
use crate::settings::VoiceCredentials;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[async_trait]
pub trait Storage: Send + Sync {
  // --- orders ---

  /// Inserts unless the external id already exists. The uniqueness check is
  /// the storage layer's, so two racing inserts yield one row.
  async fn insert_order(&self, order: NewOrder) -> Result<InsertOutcome>;

  async fn find_order_by_external_id(&self, external_order_id: i64) -> Result<Option<Order>>;

  /// Which of `ids` are already stored, read in one query.
  async fn existing_external_ids(&self, ids: &[i64]) -> Result<HashSet<i64>>;

  async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;

  /// Pending/scheduled orders with `call_scheduled_at <= now` and
  /// `call_attempts < max_retries`, oldest schedule first, at most `limit`.
  async fn due_orders(&self, now: DateTime<Utc>, max_retries: i32, limit: usize) -> Result<Vec<Order>>;

  /// Compare-and-set: applies `patch` only if the stored row still satisfies
  /// `guard`. Returns whether the row was updated.
  async fn update_order_if(&self, id: Uuid, guard: &OrderGuard, patch: &OrderPatch) -> Result<bool>;

  /// Unconditional update; `None` if the order does not exist.
  async fn update_order(&self, id: Uuid, patch: &OrderPatch) -> Result<Option<Order>>;

  /// The most recently updated order currently `en_llamada`.
  async fn latest_in_call_order(&self) -> Result<Option<Order>>;

  /// Newest first.
  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>>;

  // --- call attempts ---

  async fn insert_call_attempt(&self, attempt: NewCallAttempt) -> Result<CallAttempt>;

  async fn find_call_attempt(&self, provider_call_id: &str) -> Result<Option<CallAttempt>>;

  /// Writes the attempt completion and the order patch as one unit. The
  /// attempt write is conditional on the attempt still being open; when it is
  /// not (a replayed report), nothing is written and `false` is returned.
  async fn complete_call(
    &self,
    provider_call_id: &str,
    completion: &CallCompletion,
    order_id: Uuid,
    patch: &OrderPatch,
  ) -> Result<bool>;

  /// Newest first.
  async fn list_call_attempts(&self, filter: &CallFilter) -> Result<Vec<CallAttempt>>;

  // --- settings ---

  async fn load_settings(&self) -> Result<HashMap<String, String>>;

  async fn save_settings(&self, entries: &HashMap<String, String>) -> Result<()>;

  // --- stores ---

  async fn active_stores(&self) -> Result<Vec<Store>>;

  async fn get_store(&self, id: Uuid) -> Result<Option<Store>>;

  /// Active store whose URL contains `domain`, case-insensitively.
  async fn find_store_by_domain(&self, domain: &str) -> Result<Option<Store>>;

  async fn list_stores(&self) -> Result<Vec<Store>>;

  async fn create_store(&self, store: NewStore) -> Result<Store>;

  async fn delete_store(&self, id: Uuid) -> Result<bool>;
}

/// Places outbound calls. Failures and timeouts come back as
/// `CallError::Provider`.
#[async_trait]
pub trait VoiceProvider: Send + Sync {
  async fn place_call(&self, credentials: &VoiceCredentials, request: &CallRequest) -> Result<PlacedCall>;
}

/// Pulls orders from the upstream shop.
#[async_trait]
pub trait CommerceProvider: Send + Sync {
  async fn recent_orders(&self, store: &Store, created_since: DateTime<Utc>) -> Result<Vec<RawOrder>>;
}
