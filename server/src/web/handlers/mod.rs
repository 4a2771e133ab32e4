// codcall_server/src/web/handlers/mod.rs

pub mod action_handlers;
pub mod call_handlers;
pub mod order_handlers;
pub mod settings_handlers;
pub mod store_handlers;
pub mod webhook_handlers;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Start of `day` in UTC.
pub(crate) fn day_start(day: NaiveDate) -> DateTime<Utc> {
  Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// Last millisecond of `day` in UTC, so a `to` date includes the whole day.
pub(crate) fn day_end(day: NaiveDate) -> DateTime<Utc> {
  let end = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
  Utc.from_utc_datetime(&day.and_time(end))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn date_bounds_cover_the_whole_day() {
    let day = NaiveDate::from_ymd_opt(2024, 5, 14).unwrap();
    assert_eq!(day_start(day).to_rfc3339(), "2024-05-14T00:00:00+00:00");
    assert_eq!(
      day_end(day).to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
      "2024-05-14T23:59:59.999Z"
    );
  }
}
