// codcall/src/rules/business_hours.rs

//! Scheduling around the `[start_hour, end_hour)` calling window.
//!
//! Hours are read in the offset carried by the `now` value handed in, so a
//! deployment picks one operating offset and every decision uses it.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Timelike};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusinessHours {
  pub start_hour: u32,
  /// Exclusive. `24` keeps the window open until midnight.
  pub end_hour: u32,
}

impl Default for BusinessHours {
  fn default() -> Self {
    Self {
      start_hour: 9,
      end_hour: 21,
    }
  }
}

/// Result of [`BusinessHours::next_eligible`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
  pub at: DateTime<FixedOffset>,
  /// True when the candidate time fell outside the window and was moved to
  /// the next opening. Ingestion stores such orders as `Scheduled` rather
  /// than `Pending`.
  pub fell_outside: bool,
}

impl BusinessHours {
  pub fn new(start_hour: u32, end_hour: u32) -> Self {
    Self {
      start_hour: start_hour.min(23),
      end_hour: end_hour.min(24),
    }
  }

  pub fn contains_hour(&self, hour: u32) -> bool {
    hour >= self.start_hour && hour < self.end_hour
  }

  pub fn is_open_at(&self, at: &DateTime<FixedOffset>) -> bool {
    self.contains_hour(at.hour())
  }

  /// `now + wait` if that lands inside the window, otherwise the next window
  /// opening at `start_hour:00:00.000`.
  ///
  /// Before the window the opening is the same calendar day as the candidate;
  /// at or after `end_hour` it is the following day. A candidate that already
  /// crossed midnight therefore opens on its own date, never a day later.
  /// Only the candidate's hour decides the day; the hour of `now` itself is
  /// not a separate trigger, so a late `now` never skips a whole day.
  pub fn next_eligible(&self, now: DateTime<FixedOffset>, wait: Duration) -> Eligibility {
    let candidate = now + wait;
    if self.is_open_at(&candidate) {
      return Eligibility {
        at: candidate,
        fell_outside: false,
      };
    }

    let mut date = candidate.date_naive();
    if candidate.hour() >= self.end_hour {
      date = date.succ_opt().unwrap_or(date);
    }
    let opening = NaiveTime::from_hms_opt(self.start_hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let at = date
      .and_time(opening)
      .and_local_timezone(*candidate.offset())
      .single()
      .unwrap_or(candidate);

    Eligibility { at, fell_outside: true }
  }
}

/// Free-function form of [`BusinessHours::next_eligible`] taking the raw
/// configuration values.
pub fn next_eligible_time(
  now: DateTime<FixedOffset>,
  wait_minutes: i64,
  hour_start: u32,
  hour_end: u32,
) -> (DateTime<FixedOffset>, bool) {
  let eligibility = BusinessHours::new(hour_start, hour_end).next_eligible(now, Duration::minutes(wait_minutes));
  (eligibility.at, eligibility.fell_outside)
}
