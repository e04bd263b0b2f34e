//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Conversions between UTC timestamps and `CFAbsoluteTime` values.
//!
//! An absolute time is a double-precision offset, in seconds, from the Core Data
//! epoch of 1 January 2001, 00:00:00 UTC. Conversions go through whole 100ns ticks,
//! truncating anything finer.
//!
//! Date nodes only ever hold whole seconds, the precision of plist XML, so a
//! node reads back equal from either format.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};

/// Seconds between the Unix epoch and the Core Data epoch.
const CORE_DATA_EPOCH_UNIX_SECONDS: i64 = 978_307_200;

const TICKS_PER_SECOND: i64 = 10_000_000;

const NANOS_PER_TICK: i64 = 100;

/// A date decoded from a binary property list.
///
/// Serde has no date type, so binary dates reach typed `Deserialize`
/// implementations as a pseudo-structure. Use this type for such fields.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Date(pub DateTime<Utc>);

impl From<Date> for DateTime<Utc> {
    fn from(date: Date) -> Self {
        date.0
    }
}

fn core_data_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(CORE_DATA_EPOCH_UNIX_SECONDS)
}

/// Converts an absolute time into a UTC timestamp.
///
/// Returns `None` when the result falls outside of the representable range.
pub(crate) fn date_from_absolute_time(seconds: f64) -> Option<DateTime<Utc>> {
    let ticks = (seconds * TICKS_PER_SECOND as f64) as i64;
    let whole = TimeDelta::try_seconds(ticks / TICKS_PER_SECOND)?;
    let fraction = TimeDelta::nanoseconds((ticks % TICKS_PER_SECOND) * NANOS_PER_TICK);
    core_data_epoch()
        .checked_add_signed(whole)?
        .checked_add_signed(fraction)
}

/// Converts a UTC timestamp into an absolute time.
pub(crate) fn absolute_time_from_date(date: &DateTime<Utc>) -> f64 {
    let delta = date.signed_duration_since(core_data_epoch());
    let ticks = delta.num_seconds()
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(i64::from(delta.subsec_nanos()) / NANOS_PER_TICK);
    ticks as f64 / TICKS_PER_SECOND as f64
}

/// Drops the fraction of a second.
pub(crate) fn whole_seconds(date: DateTime<Utc>) -> DateTime<Utc> {
    date.with_nanosecond(0).unwrap_or(date)
}

/// Parses date text as written by people and by plist XML writers.
///
/// Accepts RFC 3339 timestamps as well as `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`, the latter three taken as UTC.
pub(crate) fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_is_zero() {
        let epoch = parse_date_text("2001-01-01T00:00:00Z").unwrap();
        assert_eq!(absolute_time_from_date(&epoch), 0.0);
        assert_eq!(date_from_absolute_time(0.0), Some(epoch));
    }

    #[test]
    fn test_negative_absolute_time() {
        let date = date_from_absolute_time(-2.5).unwrap();
        assert_eq!(date.to_rfc3339(), "2000-12-31T23:59:57.500+00:00");
        assert_eq!(absolute_time_from_date(&date), -2.5);
    }

    #[test]
    fn test_sub_tick_precision_truncated() {
        let date = date_from_absolute_time(1.000_000_05).unwrap();
        assert_eq!(absolute_time_from_date(&date), 1.0);
    }

    #[test]
    fn test_whole_seconds() {
        let date = date_from_absolute_time(-2.5).unwrap();
        assert_eq!(whole_seconds(date).to_rfc3339(), "2000-12-31T23:59:57+00:00");
        let epoch = date_from_absolute_time(0.0).unwrap();
        assert_eq!(whole_seconds(epoch), epoch);
    }

    #[test]
    fn test_parse_date_text_formats() {
        let expected = parse_date_text("2019-07-04T10:20:30Z").unwrap();
        assert_eq!(parse_date_text("2019-07-04T10:20:30"), Some(expected));
        assert_eq!(parse_date_text(" 2019-07-04 10:20:30 "), Some(expected));
        assert_eq!(parse_date_text("2019-07-04T12:20:30+02:00"), Some(expected));
        assert_eq!(
            parse_date_text("2019-07-04").map(|date| date.to_rfc3339()),
            Some(String::from("2019-07-04T00:00:00+00:00"))
        );
        assert_eq!(parse_date_text("07/04/2019"), None);
    }
}
