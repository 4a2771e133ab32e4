// tests/common/mod.rs
#![allow(dead_code)] // Not every test file uses every fixture

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use codcall::model::{
  CallAttempt, CallCompletion, CallFilter, InsertOutcome, NewCallAttempt, NewOrder, NewStore, Order, OrderFilter,
  OrderGuard, OrderPatch, OrderStatus, Store,
};
use codcall::payload::{CallRequest, PlacedCall, RawAddress, RawCustomer, RawLineItem, RawOrder};
use codcall::settings::{self, VoiceCredentials};
use codcall::{
  CallError, CallFlow, CommerceProvider, ContextData, FlowError, MemoryStore, PipelineControl, Settings, Storage,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

// --- Engine test context ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

// --- Common Error Type for engine tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Flow error: {0}")]
  Flow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> codcall::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    let step_name_owned = step_name.to_string();
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name_owned.clone());
      tracing::debug!(target: "test_handlers", step = %step_name_owned, "executed, counter: {}", guard.counter);
      if guard.should_stop_at.as_deref() == Some(step_name_owned.as_str()) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> codcall::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    let step_name_owned = step_name.to_string();
    let error_message_owned = error_message.to_string();
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name_owned.clone());
      tracing::warn!(target: "test_handlers", step = %step_name_owned, "failing with: '{}'", error_message_owned);
      Err(TestError::Handler(error_message_owned))
    })
  })
}

// --- Tracing Setup ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Clock fixtures ---

/// Operating offset used across the workflow tests (UTC+02:00).
pub fn offset() -> FixedOffset {
  FixedOffset::east_opt(2 * 3600).unwrap()
}

/// 2024-05-14 at `hour:minute` in the operating offset.
pub fn local(hour: u32, minute: u32) -> DateTime<FixedOffset> {
  local_on(14, hour, minute)
}

pub fn local_on(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
  let naive = NaiveDate::from_ymd_opt(2024, 5, day)
    .unwrap()
    .and_hms_opt(hour, minute, 0)
    .unwrap();
  offset().from_local_datetime(&naive).single().unwrap()
}

// --- Settings fixtures ---

pub fn voice_settings_map() -> HashMap<String, String> {
  HashMap::from([
    (settings::KEY_VAPI_KEY.to_string(), "sk-test".to_string()),
    (settings::KEY_VAPI_ASSISTANT_ID.to_string(), "asst-1".to_string()),
    (settings::KEY_VAPI_PHONE_ID.to_string(), "phone-1".to_string()),
  ])
}

/// Defaults plus voice credentials.
pub fn configured_settings() -> Settings {
  Settings::from_map(&voice_settings_map())
}

// --- Payload fixtures ---

pub fn cod_order(id: i64) -> RawOrder {
  RawOrder {
    id: Some(id),
    name: Some(format!("#{}", 1000 + id)),
    order_number: Some(1000 + id),
    payment_gateway_names: vec!["Cash on Delivery (COD)".to_string()],
    shipping_address: Some(RawAddress {
      first_name: Some("Lucía".to_string()),
      last_name: Some("García".to_string()),
      address1: Some("Calle Mayor 1".to_string()),
      address2: None,
      city: Some("Madrid".to_string()),
      province: Some("Madrid".to_string()),
      zip: Some("28013".to_string()),
      country: Some("Spain".to_string()),
      phone: Some("+34600111222".to_string()),
    }),
    billing_address: None,
    phone: None,
    customer: Some(RawCustomer {
      first_name: Some("Lucía".to_string()),
    }),
    line_items: vec![
      RawLineItem {
        title: "Camiseta".to_string(),
        quantity: 2,
      },
      RawLineItem {
        title: "Gorra".to_string(),
        quantity: 1,
      },
    ],
    total_price: Some(json!("49.90")),
    currency: Some("EUR".to_string()),
  }
}

pub fn card_order(id: i64) -> RawOrder {
  RawOrder {
    payment_gateway_names: vec!["Credit Card".to_string()],
    ..cod_order(id)
  }
}

pub fn store(name: &str, url: &str) -> Store {
  Store {
    id: Uuid::new_v4(),
    name: name.to_string(),
    url: url.to_string(),
    access_token: "shpat_test".to_string(),
    cod_gateway_name: "Contra reembolso".to_string(),
    is_active: true,
    created_at: Utc::now(),
  }
}

/// A stored order ready for dispatch unless the caller changes it.
pub fn due_order(order_number: &str, scheduled_at: DateTime<FixedOffset>) -> Order {
  let created = scheduled_at.with_timezone(&Utc) - chrono::Duration::minutes(15);
  Order {
    id: Uuid::new_v4(),
    store_id: None,
    external_order_id: rand_external_id(),
    order_number: order_number.to_string(),
    customer_name: "Lucía García".to_string(),
    customer_phone: "+34600111222".to_string(),
    address: "Calle Mayor 1, Madrid".to_string(),
    product: "Camiseta x2".to_string(),
    amount: 49.9,
    currency: "EUR".to_string(),
    status: OrderStatus::Pending,
    call_scheduled_at: Some(scheduled_at.with_timezone(&Utc)),
    call_attempts: 0,
    address_corrected: None,
    notes: None,
    created_at: created,
    updated_at: created,
  }
}

fn rand_external_id() -> i64 {
  (Uuid::new_v4().as_u128() % 1_000_000_000) as i64
}

// --- Fake providers ---

/// Records every call request. Numbers listed in `failing_numbers` are
/// refused with a provider error.
#[derive(Default)]
pub struct FakeVoiceProvider {
  pub calls: Mutex<Vec<CallRequest>>,
  pub failing_numbers: Mutex<HashSet<String>>,
}

impl FakeVoiceProvider {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn fail_for(&self, number: &str) {
    self.failing_numbers.lock().insert(number.to_string());
  }

  pub fn call_count(&self) -> usize {
    self.calls.lock().len()
  }
}

#[async_trait]
impl codcall::VoiceProvider for FakeVoiceProvider {
  async fn place_call(&self, _credentials: &VoiceCredentials, request: &CallRequest) -> Result<PlacedCall, CallError> {
    if self.failing_numbers.lock().contains(&request.customer_number) {
      return Err(CallError::voice("HTTP 400: invalid number"));
    }
    let mut calls = self.calls.lock();
    calls.push(request.clone());
    Ok(PlacedCall {
      id: format!("call-{}", calls.len()),
      status: Some("queued".to_string()),
    })
  }
}

/// Serves canned orders per store URL; stores in `failing` answer with an
/// HTTP error.
#[derive(Default)]
pub struct FakeCommerceProvider {
  pub orders: Mutex<HashMap<String, Vec<RawOrder>>>,
  pub failing: Mutex<HashSet<String>>,
}

impl FakeCommerceProvider {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn serve(&self, store_url: &str, orders: Vec<RawOrder>) {
    self.orders.lock().insert(store_url.to_string(), orders);
  }

  pub fn fail_for(&self, store_url: &str) {
    self.failing.lock().insert(store_url.to_string());
  }
}

#[async_trait]
impl CommerceProvider for FakeCommerceProvider {
  async fn recent_orders(&self, store: &Store, _created_since: DateTime<Utc>) -> Result<Vec<RawOrder>, CallError> {
    if self.failing.lock().contains(&store.url) {
      return Err(CallError::commerce("HTTP 401"));
    }
    Ok(self.orders.lock().get(&store.url).cloned().unwrap_or_default())
  }
}

pub struct Harness {
  pub store: Arc<MemoryStore>,
  pub voice: Arc<FakeVoiceProvider>,
  pub commerce: Arc<FakeCommerceProvider>,
  pub flow: CallFlow,
}

pub fn harness() -> Harness {
  let store = Arc::new(MemoryStore::new());
  let voice = FakeVoiceProvider::new();
  let commerce = FakeCommerceProvider::new();
  let flow = CallFlow::new(store.clone(), voice.clone()).with_commerce(commerce.clone());
  Harness {
    store,
    voice,
    commerce,
    flow,
  }
}

// --- Storage with injected write failures ---

/// Delegates to a `MemoryStore` but fails chosen writes: order inserts by
/// external id, and claims or attempt inserts by order id.
pub struct FailingStorage {
  pub inner: Arc<MemoryStore>,
  pub failing_inserts: Mutex<HashSet<i64>>,
  pub failing_claims: Mutex<HashSet<Uuid>>,
  pub failing_attempts: Mutex<HashSet<Uuid>>,
}

impl FailingStorage {
  pub fn new(inner: Arc<MemoryStore>) -> Arc<Self> {
    Arc::new(Self {
      inner,
      failing_inserts: Mutex::new(HashSet::new()),
      failing_claims: Mutex::new(HashSet::new()),
      failing_attempts: Mutex::new(HashSet::new()),
    })
  }

  pub fn fail_insert(&self, external_order_id: i64) {
    self.failing_inserts.lock().insert(external_order_id);
  }

  pub fn fail_claim(&self, order_id: Uuid) {
    self.failing_claims.lock().insert(order_id);
  }

  pub fn fail_attempt(&self, order_id: Uuid) {
    self.failing_attempts.lock().insert(order_id);
  }

  fn broken(what: &str) -> CallError {
    CallError::persistence(anyhow::anyhow!("connection reset while writing {}", what))
  }
}

#[async_trait]
impl Storage for FailingStorage {
  async fn insert_order(&self, order: NewOrder) -> Result<InsertOutcome, CallError> {
    if self.failing_inserts.lock().contains(&order.external_order_id) {
      return Err(Self::broken("order"));
    }
    self.inner.insert_order(order).await
  }

  async fn find_order_by_external_id(&self, external_order_id: i64) -> Result<Option<Order>, CallError> {
    self.inner.find_order_by_external_id(external_order_id).await
  }

  async fn existing_external_ids(&self, ids: &[i64]) -> Result<HashSet<i64>, CallError> {
    self.inner.existing_external_ids(ids).await
  }

  async fn get_order(&self, id: Uuid) -> Result<Option<Order>, CallError> {
    self.inner.get_order(id).await
  }

  async fn due_orders(&self, now: DateTime<Utc>, max_retries: i32, limit: usize) -> Result<Vec<Order>, CallError> {
    self.inner.due_orders(now, max_retries, limit).await
  }

  async fn update_order_if(&self, id: Uuid, guard: &OrderGuard, patch: &OrderPatch) -> Result<bool, CallError> {
    if patch.status == Some(OrderStatus::InCall) && self.failing_claims.lock().contains(&id) {
      return Err(Self::broken("claim"));
    }
    self.inner.update_order_if(id, guard, patch).await
  }

  async fn update_order(&self, id: Uuid, patch: &OrderPatch) -> Result<Option<Order>, CallError> {
    self.inner.update_order(id, patch).await
  }

  async fn latest_in_call_order(&self) -> Result<Option<Order>, CallError> {
    self.inner.latest_in_call_order().await
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, CallError> {
    self.inner.list_orders(filter).await
  }

  async fn insert_call_attempt(&self, attempt: NewCallAttempt) -> Result<CallAttempt, CallError> {
    if self.failing_attempts.lock().contains(&attempt.order_id) {
      return Err(Self::broken("call attempt"));
    }
    self.inner.insert_call_attempt(attempt).await
  }

  async fn find_call_attempt(&self, provider_call_id: &str) -> Result<Option<CallAttempt>, CallError> {
    self.inner.find_call_attempt(provider_call_id).await
  }

  async fn complete_call(
    &self,
    provider_call_id: &str,
    completion: &CallCompletion,
    order_id: Uuid,
    patch: &OrderPatch,
  ) -> Result<bool, CallError> {
    self.inner.complete_call(provider_call_id, completion, order_id, patch).await
  }

  async fn list_call_attempts(&self, filter: &CallFilter) -> Result<Vec<CallAttempt>, CallError> {
    self.inner.list_call_attempts(filter).await
  }

  async fn load_settings(&self) -> Result<HashMap<String, String>, CallError> {
    self.inner.load_settings().await
  }

  async fn save_settings(&self, entries: &HashMap<String, String>) -> Result<(), CallError> {
    self.inner.save_settings(entries).await
  }

  async fn active_stores(&self) -> Result<Vec<Store>, CallError> {
    self.inner.active_stores().await
  }

  async fn get_store(&self, id: Uuid) -> Result<Option<Store>, CallError> {
    self.inner.get_store(id).await
  }

  async fn find_store_by_domain(&self, domain: &str) -> Result<Option<Store>, CallError> {
    self.inner.find_store_by_domain(domain).await
  }

  async fn list_stores(&self) -> Result<Vec<Store>, CallError> {
    self.inner.list_stores().await
  }

  async fn create_store(&self, store: NewStore) -> Result<Store, CallError> {
    self.inner.create_store(store).await
  }

  async fn delete_store(&self, id: Uuid) -> Result<bool, CallError> {
    self.inner.delete_store(id).await
  }
}

pub struct FaultyHarness {
  pub store: Arc<MemoryStore>,
  pub faults: Arc<FailingStorage>,
  pub voice: Arc<FakeVoiceProvider>,
  pub commerce: Arc<FakeCommerceProvider>,
  pub flow: CallFlow,
}

/// Like [`harness`], with the flow writing through a [`FailingStorage`].
pub fn faulty_harness() -> FaultyHarness {
  let store = Arc::new(MemoryStore::new());
  let faults = FailingStorage::new(store.clone());
  let voice = FakeVoiceProvider::new();
  let commerce = FakeCommerceProvider::new();
  let flow = CallFlow::new(faults.clone(), voice.clone()).with_commerce(commerce.clone());
  FaultyHarness {
    store,
    faults,
    voice,
    commerce,
    flow,
  }
}
