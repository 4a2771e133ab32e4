// codcall/src/workflows/sync.rs

//! Pull-based ingestion: fetch recent orders for a store and ingest the ones
//! not stored yet.

use crate::error::{CallError, Result};
use crate::model::Store;
use crate::rules::filter_new_ordered;
use crate::settings::Settings;
use crate::workflows::outcomes::{IngestOutcome, SyncFailure, SyncReport, SyncedOrder};
use crate::workflows::CallFlow;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashSet;
use tracing::{error, info, instrument, warn};

impl CallFlow {
  /// Ingests every new order the upstream shop returns for `store`. A failure
  /// on one order is recorded in the report and the rest still run; a failure
  /// to fetch or to read the existing ids fails the whole store.
  #[instrument(name = "CallFlow::sync_store", skip_all, fields(store = %store.name))]
  pub async fn sync_store(&self, store: &Store, settings: &Settings, now: DateTime<FixedOffset>) -> Result<SyncReport> {
    let commerce = self
      .deps
      .commerce
      .as_ref()
      .ok_or_else(|| CallError::Internal("no commerce provider configured".to_string()))?;

    let since = now.with_timezone(&Utc) - self.sync_lookback;
    let raw_orders = commerce.recent_orders(store, since).await?;
    let ids: Vec<i64> = raw_orders.iter().filter_map(|o| o.id).collect();
    let existing = self.deps.storage.existing_external_ids(&ids).await?;
    let mut fresh: HashSet<i64> = filter_new_ordered(ids, &existing).into_iter().collect();
    info!(fetched = raw_orders.len(), new = fresh.len(), "Store orders fetched.");

    let mut report = SyncReport::default();
    for raw in raw_orders {
      // `remove` also drops repeats of the same id later in the batch.
      if !raw.id.map_or(false, |id| fresh.remove(&id)) {
        continue;
      }
      let label = raw.order_number_display();
      match self.ingest_order(raw, Some(store), settings, now).await {
        Ok(IngestOutcome::Accepted {
          order_id,
          order_number,
          customer_name,
          ..
        }) => {
          report.synced += 1;
          report.new_orders.push(SyncedOrder {
            id: order_id,
            order_number,
            customer_name,
            store: store.name.clone(),
          });
        }
        Ok(_) => {}
        Err(e) => {
          warn!(order = %label, error = %e, "Order failed to ingest during sync.");
          report.errors.push(SyncFailure {
            store: store.name.clone(),
            order: Some(label),
            error: e.to_string(),
          });
        }
      }
    }
    Ok(report)
  }

  /// Syncs every active store that has an access token. Per-store failures
  /// are collected; they never stop the other stores.
  #[instrument(name = "CallFlow::sync_all_stores", skip_all)]
  pub async fn sync_all_stores(&self, now: DateTime<FixedOffset>, settings: &Settings) -> Result<SyncReport> {
    let stores = self.deps.storage.active_stores().await?;
    let mut report = SyncReport::default();
    if stores.is_empty() {
      info!("No active stores with tokens.");
      return Ok(report);
    }

    for store in stores.iter().filter(|s| s.can_sync()) {
      match self.sync_store(store, settings, now).await {
        Ok(store_report) => report.merge(store_report),
        Err(e) => {
          error!(store = %store.name, error = %e, "Store sync failed.");
          report.errors.push(SyncFailure {
            store: store.name.clone(),
            order: None,
            error: e.to_string(),
          });
        }
      }
    }
    info!(synced = report.synced, errors = report.errors.len(), "Sync finished.");
    Ok(report)
  }
}
