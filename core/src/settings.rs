// codcall/src/settings.rs

//! Business settings, rebuilt from the key/value settings table for every
//! operation. Nothing here is cached: two operations running back to back may
//! see different values if an operator saved in between.

use crate::rules::BusinessHours;
use chrono::Duration;
use serde::Serialize;
use std::collections::HashMap;

pub const KEY_WAIT_MINUTES: &str = "wait_minutes";
pub const KEY_HOUR_START: &str = "hour_start";
pub const KEY_HOUR_END: &str = "hour_end";
pub const KEY_MAX_RETRIES: &str = "max_retries";
pub const KEY_VAPI_KEY: &str = "vapi_key";
pub const KEY_VAPI_ASSISTANT_ID: &str = "vapi_assistant_id";
pub const KEY_VAPI_PHONE_ID: &str = "vapi_phone_id";

const DEFAULT_WAIT_MINUTES: i64 = 15;
const DEFAULT_MAX_RETRIES: i32 = 3;

/// Orders handled per dispatch tick.
pub const DISPATCH_BATCH_SIZE: usize = 5;

/// Delay before calling back an order that did not answer.
pub fn retry_delay() -> Duration {
  Duration::minutes(30)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
  /// Delay between ingestion and the first call.
  pub wait_minutes: i64,
  pub hours: BusinessHours,
  /// Retry budget: no automatic call once `call_attempts` reaches it.
  pub max_retries: i32,
  pub voice: VoiceSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VoiceSettings {
  #[serde(skip_serializing)]
  pub api_key: Option<String>,
  pub assistant_id: Option<String>,
  pub phone_number_id: Option<String>,
}

/// Credentials needed to place a call.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceCredentials {
  pub api_key: String,
  pub assistant_id: String,
  pub phone_number_id: Option<String>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      wait_minutes: DEFAULT_WAIT_MINUTES,
      hours: BusinessHours::default(),
      max_retries: DEFAULT_MAX_RETRIES,
      voice: VoiceSettings::default(),
    }
  }
}

impl Settings {
  /// Builds settings from raw key/value rows. Unparsable or non-positive
  /// numbers fall back to their defaults; hours take the part before `:`.
  pub fn from_map(map: &HashMap<String, String>) -> Self {
    let defaults = BusinessHours::default();
    let positive = |key: &str| leading_int(map.get(key)).filter(|n| *n > 0);
    let hour = |key: &str, max: i64| {
      map
        .get(key)
        .and_then(|v| leading_int(v.split(':').next()))
        .filter(|h| (0..=max).contains(h))
        .map(|h| h as u32)
    };

    Self {
      wait_minutes: positive(KEY_WAIT_MINUTES).unwrap_or(DEFAULT_WAIT_MINUTES),
      hours: BusinessHours::new(
        hour(KEY_HOUR_START, 23).unwrap_or(defaults.start_hour),
        hour(KEY_HOUR_END, 24).unwrap_or(defaults.end_hour),
      ),
      max_retries: positive(KEY_MAX_RETRIES)
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or(DEFAULT_MAX_RETRIES),
      voice: VoiceSettings {
        api_key: non_blank(map.get(KEY_VAPI_KEY)),
        assistant_id: non_blank(map.get(KEY_VAPI_ASSISTANT_ID)),
        phone_number_id: non_blank(map.get(KEY_VAPI_PHONE_ID)),
      },
    }
  }

  pub fn wait(&self) -> Duration {
    Duration::minutes(self.wait_minutes)
  }

  /// `None` when the API key or the assistant id is missing; dispatch is then
  /// a no-op rather than an error.
  pub fn voice_credentials(&self) -> Option<VoiceCredentials> {
    Some(VoiceCredentials {
      api_key: self.voice.api_key.clone()?,
      assistant_id: self.voice.assistant_id.clone()?,
      phone_number_id: self.voice.phone_number_id.clone(),
    })
  }
}

/// Parses an optional leading sign and the digits that follow, ignoring
/// whatever trails them (`"15 min"` is 15).
fn leading_int<S: AsRef<str>>(value: Option<S>) -> Option<i64> {
  let value = value?;
  let trimmed = value.as_ref().trim_start();
  let (sign, digits) = match trimmed.strip_prefix('-') {
    Some(rest) => (-1, rest),
    None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
  };
  let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
  digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

fn non_blank(value: Option<&String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
