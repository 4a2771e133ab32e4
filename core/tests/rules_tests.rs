// tests/rules_tests.rs
mod common;

use chrono::{Duration, Timelike};
use codcall::model::CallResult;
use codcall::rules::{
  classify_result, filter_new, filter_new_ordered, is_cod, next_eligible_time, requests_address_change, BusinessHours,
  COD_SYNONYMS,
};
use codcall::settings::{self, Settings};
use common::*;
use std::collections::{HashMap, HashSet};

// --- Deduplication ---

#[test]
fn test_filter_new_is_disjoint_from_existing_and_subset_of_candidates() {
  let universe: Vec<i64> = (1..=8).collect();
  for mask_a in 0u32..256 {
    let candidates: HashSet<i64> = universe.iter().copied().filter(|i| mask_a & (1 << (i - 1)) != 0).collect();
    for mask_b in [0u32, 0b1010_1010, 0b0000_1111, 0b1111_1111, mask_a] {
      let existing: HashSet<i64> = universe.iter().copied().filter(|i| mask_b & (1 << (i - 1)) != 0).collect();
      let fresh = filter_new(&candidates, &existing);
      assert!(fresh.is_disjoint(&existing));
      assert!(fresh.is_subset(&candidates));
      assert_eq!(fresh.len(), candidates.difference(&existing).count());
    }
  }
}

#[test]
fn test_filter_new_ordered_keeps_upstream_order_and_drops_repeats() {
  let existing: HashSet<i64> = [2, 4].into_iter().collect();
  let fresh = filter_new_ordered(vec![5, 2, 1, 5, 4, 3, 1], &existing);
  assert_eq!(fresh, vec![5, 1, 3]);
}

// --- COD classification ---

#[test]
fn test_cod_matches_each_synonym_case_insensitively() {
  for token in COD_SYNONYMS {
    let label = format!("Pago {}", token.to_uppercase());
    assert!(is_cod(&[label.as_str()], "Something Else"), "token {} should match", token);
  }
  assert!(is_cod(&["Cash On Delivery"], ""));
}

#[test]
fn test_cod_matches_configured_label() {
  assert!(is_cod(&["Pago en Mano"], "pago en mano"));
  assert!(!is_cod(&["Pago en Mano"], "Transferencia"));
}

#[test]
fn test_cod_rejects_card_and_empty_labels() {
  assert!(!is_cod(&["Credit Card"], "Cash on Delivery"));
  assert!(!is_cod::<&str>(&[], "Cash on Delivery"));
  assert!(is_cod(&["shopify_payments", "COD"], "Cash on Delivery"));
}

// --- Business hours ---

#[test]
fn test_candidate_inside_window_is_returned_unchanged() {
  let now = local(10, 0);
  let (at, fell_outside) = next_eligible_time(now, 15, 9, 21);
  assert_eq!(at, now + Duration::minutes(15));
  assert!(!fell_outside);
}

#[test]
fn test_late_evening_rolls_to_next_day_opening() {
  // 20:50 + 15 minutes = 21:05, past a 21:00 close.
  let (at, fell_outside) = next_eligible_time(local(20, 50), 15, 9, 21);
  assert!(fell_outside);
  assert_eq!(at, local_on(15, 9, 0));
  assert_eq!((at.minute(), at.second(), at.nanosecond()), (0, 0, 0));
}

#[test]
fn test_early_morning_opens_same_day() {
  let (at, fell_outside) = next_eligible_time(local(6, 0), 15, 9, 21);
  assert!(fell_outside);
  assert_eq!(at, local(9, 0));
}

#[test]
fn test_candidate_past_midnight_opens_on_its_own_date() {
  let (at, fell_outside) = next_eligible_time(local(23, 50), 15, 9, 21);
  assert!(fell_outside);
  assert_eq!(at, local_on(15, 9, 0));
}

#[test]
fn test_window_until_midnight() {
  let hours = BusinessHours::new(9, 24);
  let eligibility = hours.next_eligible(local(23, 0), Duration::minutes(15));
  assert!(!eligibility.fell_outside);
  assert_eq!(eligibility.at, local(23, 15));
}

#[test]
fn test_window_edges() {
  let hours = BusinessHours::default();
  assert!(hours.is_open_at(&local(9, 0)));
  assert!(hours.is_open_at(&local(20, 59)));
  assert!(!hours.is_open_at(&local(21, 0)));
  assert!(!hours.is_open_at(&local(8, 59)));
}

#[test]
fn test_result_keeps_the_operating_offset() {
  let (at, _) = next_eligible_time(local(22, 0), 15, 9, 21);
  assert_eq!(at.offset(), &offset());
}

// --- Call outcome classification ---

#[test]
fn test_classify_from_success_evaluation() {
  assert_eq!(classify_result("true", "customer-ended-call"), CallResult::Confirmed);
  assert_eq!(classify_result("Success", ""), CallResult::Confirmed);
  assert_eq!(classify_result("false", ""), CallResult::Rejected);
  assert_eq!(classify_result("FAILED", ""), CallResult::Rejected);
  assert_eq!(classify_result("callback requested", ""), CallResult::Callback);
  assert_eq!(classify_result("", "customer-ended-call"), CallResult::NoAnswer);
  assert_eq!(classify_result("maybe", ""), CallResult::NoAnswer);
}

#[test]
fn test_ended_reason_overrides_evaluation() {
  assert_eq!(classify_result("true", "voicemail"), CallResult::Voicemail);
  assert_eq!(classify_result("true", "no-answer"), CallResult::NoAnswer);
  assert_eq!(classify_result("false", "customer-did-not-answer-no-answer"), CallResult::NoAnswer);
  assert_eq!(classify_result("true", "twilio-failed-to-connect-call"), CallResult::NoAnswer);
}

#[test]
fn test_address_change_keywords() {
  assert!(requests_address_change("Quiero CAMBIAR la dirección"));
  assert!(requests_address_change("la nueva dirección es Calle Sol 3"));
  assert!(requests_address_change("hay que corregirla"));
  assert!(requests_address_change("Esa dirección no es correcta"));
  assert!(!requests_address_change("Sí, confirmo el pedido"));
}

// --- Settings ---

fn settings_from(pairs: &[(&str, &str)]) -> Settings {
  let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
  Settings::from_map(&map)
}

#[test]
fn test_settings_defaults() {
  let s = Settings::from_map(&HashMap::new());
  assert_eq!(s, Settings::default());
  assert_eq!(s.wait_minutes, 15);
  assert_eq!(s.hours, BusinessHours::new(9, 21));
  assert_eq!(s.max_retries, 3);
  assert!(s.voice_credentials().is_none());
}

#[test]
fn test_settings_parse_leniently() {
  let s = settings_from(&[
    (settings::KEY_WAIT_MINUTES, "20 min"),
    (settings::KEY_HOUR_START, "08:30"),
    (settings::KEY_HOUR_END, "22:00"),
    (settings::KEY_MAX_RETRIES, "5"),
  ]);
  assert_eq!(s.wait_minutes, 20);
  assert_eq!(s.hours, BusinessHours::new(8, 22));
  assert_eq!(s.max_retries, 5);
}

#[test]
fn test_settings_fall_back_on_invalid_values() {
  let s = settings_from(&[
    (settings::KEY_WAIT_MINUTES, "0"),
    (settings::KEY_HOUR_START, "25:00"),
    (settings::KEY_HOUR_END, "soon"),
    (settings::KEY_MAX_RETRIES, "-2"),
  ]);
  assert_eq!(s.wait_minutes, 15);
  assert_eq!(s.hours, BusinessHours::default());
  assert_eq!(s.max_retries, 3);
}

#[test]
fn test_voice_credentials_need_key_and_assistant() {
  let only_key = settings_from(&[(settings::KEY_VAPI_KEY, "sk")]);
  assert!(only_key.voice_credentials().is_none());

  let blank_assistant = settings_from(&[(settings::KEY_VAPI_KEY, "sk"), (settings::KEY_VAPI_ASSISTANT_ID, "  ")]);
  assert!(blank_assistant.voice_credentials().is_none());

  let creds = settings_from(&[(settings::KEY_VAPI_KEY, "sk"), (settings::KEY_VAPI_ASSISTANT_ID, "a1")])
    .voice_credentials()
    .unwrap();
  assert_eq!(creds.assistant_id, "a1");
  assert_eq!(creds.phone_number_id, None);

  assert_eq!(
    configured_settings().voice_credentials().unwrap().phone_number_id.as_deref(),
    Some("phone-1")
  );
}
