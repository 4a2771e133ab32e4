// tests/completion_tests.rs
mod common;

use chrono::{Duration, Utc};
use codcall::model::{CallAttempt, CallResult, Order, OrderStatus};
use codcall::payload::CompletionReport;
use codcall::workflows::CompletionOutcome;
use codcall::{CallError, Storage};
use common::*;
use serde_json::{json, Value};
use serial_test::serial;
use uuid::Uuid;

const CALL_ID: &str = "call-abc";

fn seed_in_call(h: &Harness, attempts: i32) -> Order {
  let mut order = due_order("#3001", local(11, 0));
  order.status = OrderStatus::InCall;
  order.call_attempts = attempts;
  h.store.put_order(order.clone());
  h.store.put_call_attempt(CallAttempt {
    id: Uuid::new_v4(),
    order_id: order.id,
    provider_call_id: CALL_ID.to_string(),
    attempt_number: attempts,
    started_at: local(11, 55).with_timezone(&Utc),
    ended_at: None,
    duration_seconds: None,
    cost: None,
    ended_reason: None,
    transcript: None,
    recording_url: None,
    summary: None,
    result: None,
    created_at: local(11, 55).with_timezone(&Utc),
  });
  order
}

fn report(success_evaluation: Value, ended_reason: &str, transcript: &str) -> CompletionReport {
  CompletionReport::from_json(&json!({
    "message": {
      "type": "end-of-call-report",
      "call": { "id": CALL_ID },
      "analysis": { "successEvaluation": success_evaluation },
      "endedReason": ended_reason,
      "transcript": transcript,
      "summary": "Cliente atendió la llamada",
      "durationSeconds": 42.5,
      "cost": 0.12,
      "recordingUrl": "https://recordings.example/abc.wav"
    }
  }))
}

#[tokio::test]
#[serial]
async fn test_confirmed_call_confirms_order() {
  setup_tracing();
  let h = harness();
  let order = seed_in_call(&h, 1);
  let now = local(12, 0);

  let outcome = h
    .flow
    .apply_call_completion(report(json!("true"), "customer-ended-call", "Sí, confirmo"), &configured_settings(), now)
    .await
    .unwrap();

  assert_eq!(
    outcome,
    CompletionOutcome::Applied {
      result: CallResult::Confirmed,
      order_status: OrderStatus::Confirmed,
      retry_at: None,
    }
  );
  let stored = h.store.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Confirmed);

  let attempt = h.store.find_call_attempt(CALL_ID).await.unwrap().unwrap();
  assert_eq!(attempt.ended_at, Some(now.with_timezone(&Utc)));
  assert_eq!(attempt.result, Some(CallResult::Confirmed));
  assert_eq!(attempt.duration_seconds, Some(42.5));
  assert_eq!(attempt.cost, Some(0.12));
  assert_eq!(attempt.ended_reason.as_deref(), Some("customer-ended-call"));
  assert_eq!(attempt.recording_url.as_deref(), Some("https://recordings.example/abc.wav"));
}

#[tokio::test]
#[serial]
async fn test_no_answer_with_budget_is_rescheduled_in_thirty_minutes() {
  setup_tracing();
  let h = harness();
  let order = seed_in_call(&h, 1);
  let now = local(12, 0);

  let outcome = h
    .flow
    .apply_call_completion(report(json!(""), "no-answer", ""), &configured_settings(), now)
    .await
    .unwrap();

  let expected_retry = (now + Duration::minutes(30)).with_timezone(&Utc);
  assert_eq!(
    outcome,
    CompletionOutcome::Applied {
      result: CallResult::NoAnswer,
      order_status: OrderStatus::Scheduled,
      retry_at: Some(expected_retry),
    }
  );
  let stored = h.store.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Scheduled);
  assert_eq!(stored.call_scheduled_at, Some(expected_retry));
  assert_eq!(stored.call_attempts, 1);
}

#[tokio::test]
#[serial]
async fn test_retry_near_closing_moves_to_next_opening() {
  setup_tracing();
  let h = harness();
  let order = seed_in_call(&h, 1);

  h.flow
    .apply_call_completion(report(json!(""), "voicemail", ""), &configured_settings(), local(20, 45))
    .await
    .unwrap();

  let stored = h.store.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Scheduled);
  assert_eq!(stored.call_scheduled_at, Some(local_on(15, 9, 0).with_timezone(&Utc)));
  let attempt = h.store.find_call_attempt(CALL_ID).await.unwrap().unwrap();
  assert_eq!(attempt.result, Some(CallResult::Voicemail));
}

#[tokio::test]
#[serial]
async fn test_no_answer_with_exhausted_budget_stays_no_answer() {
  setup_tracing();
  let h = harness();
  let order = seed_in_call(&h, 3);

  let outcome = h
    .flow
    .apply_call_completion(report(json!(""), "no-answer", ""), &configured_settings(), local(12, 0))
    .await
    .unwrap();

  assert_eq!(
    outcome,
    CompletionOutcome::Applied {
      result: CallResult::NoAnswer,
      order_status: OrderStatus::NoAnswer,
      retry_at: None,
    }
  );
  let stored = h.store.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::NoAnswer);
  assert_eq!(stored.call_scheduled_at, order.call_scheduled_at);
}

#[tokio::test]
#[serial]
async fn test_address_change_upgrades_confirmation() {
  setup_tracing();
  let h = harness();
  let order = seed_in_call(&h, 1);
  let body = json!({
    "message": {
      "type": "end-of-call-report",
      "call": { "id": CALL_ID },
      "analysis": {
        "successEvaluation": "true",
        "structuredData": { "new_address": "Calle Luna 7, Madrid" }
      },
      "endedReason": "customer-ended-call",
      "transcript": "Quiero cambiar la dirección de entrega",
      "summary": "Cambio de dirección"
    }
  });

  let outcome = h
    .flow
    .apply_call_completion(CompletionReport::from_json(&body), &configured_settings(), local(12, 0))
    .await
    .unwrap();

  assert!(matches!(
    outcome,
    CompletionOutcome::Applied {
      order_status: OrderStatus::AddressChanged,
      ..
    }
  ));
  let stored = h.store.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::AddressChanged);
  assert_eq!(stored.address_corrected.as_deref(), Some("Calle Luna 7, Madrid"));
}

#[tokio::test]
#[serial]
async fn test_address_change_falls_back_to_summary() {
  setup_tracing();
  let h = harness();
  let order = seed_in_call(&h, 1);

  h.flow
    .apply_call_completion(
      report(json!("success"), "customer-ended-call", "la dirección no es correcta"),
      &configured_settings(),
      local(12, 0),
    )
    .await
    .unwrap();

  let stored = h.store.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::AddressChanged);
  assert_eq!(stored.address_corrected.as_deref(), Some("Cliente atendió la llamada"));
}

#[tokio::test]
#[serial]
async fn test_rejection_is_not_upgraded_by_address_keywords() {
  setup_tracing();
  let h = harness();
  let order = seed_in_call(&h, 1);

  h.flow
    .apply_call_completion(report(json!(false), "customer-ended-call", "no, quiero cambiar todo"), &configured_settings(), local(12, 0))
    .await
    .unwrap();

  let stored = h.store.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Rejected);
}

#[tokio::test]
#[serial]
async fn test_callback_goes_back_to_scheduled() {
  setup_tracing();
  let h = harness();
  let order = seed_in_call(&h, 1);

  h.flow
    .apply_call_completion(report(json!("Callback"), "customer-ended-call", ""), &configured_settings(), local(12, 0))
    .await
    .unwrap();

  let stored = h.store.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Scheduled);
}

#[tokio::test]
#[serial]
async fn test_replayed_report_is_not_reapplied() {
  setup_tracing();
  let h = harness();
  let order = seed_in_call(&h, 1);
  let settings = configured_settings();

  h.flow
    .apply_call_completion(report(json!("true"), "customer-ended-call", ""), &settings, local(12, 0))
    .await
    .unwrap();
  let first_attempt = h.store.find_call_attempt(CALL_ID).await.unwrap().unwrap();

  let replay = h
    .flow
    .apply_call_completion(report(json!(""), "no-answer", ""), &settings, local(12, 10))
    .await
    .unwrap();

  assert_eq!(
    replay,
    CompletionOutcome::Replayed {
      result: Some(CallResult::Confirmed),
      order_status: OrderStatus::Confirmed,
    }
  );
  assert_eq!(h.store.find_call_attempt(CALL_ID).await.unwrap().unwrap(), first_attempt);
  assert_eq!(h.store.get_order(order.id).await.unwrap().unwrap().status, OrderStatus::Confirmed);
}

#[tokio::test]
#[serial]
async fn test_non_completion_events_are_ignored() {
  setup_tracing();
  let h = harness();
  let order = seed_in_call(&h, 1);
  let body = json!({ "message": { "type": "status-update", "call": { "id": CALL_ID } } });

  let outcome = h
    .flow
    .apply_call_completion(CompletionReport::from_json(&body), &configured_settings(), local(12, 0))
    .await
    .unwrap();

  assert_eq!(outcome, CompletionOutcome::Ignored);
  assert_eq!(h.store.get_order(order.id).await.unwrap().unwrap().status, OrderStatus::InCall);
}

#[tokio::test]
#[serial]
async fn test_missing_and_unknown_call_ids() {
  setup_tracing();
  let h = harness();
  seed_in_call(&h, 1);
  let settings = configured_settings();

  let missing = CompletionReport::from_json(&json!({ "message": { "type": "end-of-call-report" } }));
  let result = h.flow.apply_call_completion(missing, &settings, local(12, 0)).await;
  assert!(matches!(result, Err(CallError::Validation(_))));

  let unknown = CompletionReport::from_json(&json!({ "type": "end-of-call-report", "callId": "call-zzz" }));
  let result = h.flow.apply_call_completion(unknown, &settings, local(12, 0)).await;
  assert!(matches!(result, Err(CallError::NotFound(_))));

  assert!(h.store.call_attempts()[0].is_open());
}
