// codcall_server/src/state.rs
use crate::config::AppConfig;
use chrono::{DateTime, FixedOffset, Utc};
use codcall::CallFlow;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub flow: Arc<CallFlow>,
  pub config: Arc<AppConfig>, // Share loaded config
}

impl AppState {
  /// Current time in the operating offset.
  pub fn now(&self) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&self.config.utc_offset)
  }
}
