// codcall_server/src/scheduler.rs

//! In-process periodic ticks for dispatch and store sync. Each tick reloads
//! settings and runs independently; a tick overlapping a manual trigger is
//! safe because dispatch claims orders before calling.

use crate::config::AppConfig;
use chrono::{DateTime, FixedOffset, Utc};
use codcall::CallFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, info_span, Instrument};

pub fn spawn_ticks(flow: Arc<CallFlow>, config: Arc<AppConfig>) {
  let offset = config.utc_offset;

  if let Some(period) = config.dispatch_interval {
    let flow = flow.clone();
    spawn_every(period, "dispatch_tick", move || {
      let flow = flow.clone();
      async move { dispatch_tick(&flow, now(offset)).await }
    });
  }

  if let Some(period) = config.sync_interval {
    spawn_every(period, "sync_tick", move || {
      let flow = flow.clone();
      async move { sync_tick(&flow, now(offset)).await }
    });
  }
}

fn now(offset: FixedOffset) -> DateTime<FixedOffset> {
  Utc::now().with_timezone(&offset)
}

fn spawn_every<F, Fut>(period: Duration, name: &'static str, mut tick: F)
where
  F: FnMut() -> Fut + 'static,
  Fut: std::future::Future<Output = ()> + 'static,
{
  info!(tick = name, period_secs = period.as_secs(), "Periodic tick scheduled.");
  actix_rt::spawn(async move {
    let mut ticker = interval(period);
    // A slow tick delays the next one instead of firing a burst to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      tick().instrument(info_span!("tick", tick = name)).await;
    }
  });
}

async fn dispatch_tick(flow: &CallFlow, now: DateTime<FixedOffset>) {
  let settings = match flow.load_settings().await {
    Ok(settings) => settings,
    Err(e) => {
      error!(error = %e, "Dispatch tick could not load settings.");
      return;
    }
  };
  match flow.dispatch_pending_calls(now, &settings).await {
    Ok(report) if report.results.is_empty() => {
      info!(message = ?report.message, "Dispatch tick: nothing to call.");
    }
    Ok(report) => info!(triggered = report.triggered, handled = report.results.len(), "Dispatch tick finished."),
    Err(e) => error!(error = %e, "Dispatch tick failed."),
  }
}

async fn sync_tick(flow: &CallFlow, now: DateTime<FixedOffset>) {
  let settings = match flow.load_settings().await {
    Ok(settings) => settings,
    Err(e) => {
      error!(error = %e, "Sync tick could not load settings.");
      return;
    }
  };
  match flow.sync_all_stores(now, &settings).await {
    Ok(report) => info!(synced = report.synced, errors = report.errors.len(), "Sync tick finished."),
    Err(e) => error!(error = %e, "Sync tick failed."),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[actix_rt::test]
  async fn test_spawn_every_keeps_ticking() {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    spawn_every(Duration::from_millis(10), "test_tick", move || {
      let seen = seen.clone();
      async move {
        seen.fetch_add(1, Ordering::SeqCst);
      }
    });

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(count.load(Ordering::SeqCst) >= 2);
  }
}
