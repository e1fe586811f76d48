//! `send_sync` schedule parsing
//!
//! `"now"` (or `"sekarang"`) means immediate dispatch. Anything else must
//! parse as a datetime; naive formats additionally require a `timezone`
//! field, either a UTC offset (`+07:00`, `+0700`, `-05:30`, bounded to
//! [-14:00, +14:00]) or an IANA zone name. The resolved wall time is
//! converted to UTC for storage and must lie in the future.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Naive datetime formats accepted alongside a `timezone` field
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M",
];

/// Result of parsing a `send_sync` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Dispatch immediately; no `scheduled_at`
    Immediate,
    /// Dispatch at the given UTC instant
    At {
        utc: DateTime<Utc>,
        /// The caller's declared timezone, kept for display
        timezone: Option<String>,
    },
}

/// Schedule parsing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid datetime format. Use 'now' for immediate or 'YYYY-MM-DD HH:MM:SS' for scheduled")]
    InvalidFormat,

    #[error("timezone is required for scheduled campaigns (e.g. '+07:00' or 'Asia/Jakarta')")]
    TimezoneRequired,

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("UTC offset out of range: {0} (allowed range is -14:00 to +14:00)")]
    OffsetOutOfRange(String),

    #[error("scheduled time must be in the future (current time in {zone}: {now_local})")]
    PastTime { zone: String, now_local: String },
}

impl From<ScheduleError> for hermes_types::HermesError {
    fn from(err: ScheduleError) -> Self {
        Self::InvalidSchedule(err.to_string())
    }
}

/// A resolved timezone: fixed offset or named zone
enum ZoneSpec {
    Fixed(FixedOffset),
    Named(Tz),
}

impl ZoneSpec {
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            // DST gaps/overlaps resolve to the earliest valid instant
            Self::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::Named(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    fn render_now(&self, now: DateTime<Utc>) -> String {
        match self {
            Self::Fixed(offset) => now
                .with_timezone(offset)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            Self::Named(tz) => now
                .with_timezone(tz)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        }
    }
}

/// Parse a timezone string: UTC offset or IANA zone name
fn parse_zone(raw: &str) -> Result<ZoneSpec, ScheduleError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScheduleError::TimezoneRequired);
    }

    if trimmed.starts_with('+') || trimmed.starts_with('-') {
        return parse_offset(trimmed).map(ZoneSpec::Fixed);
    }

    trimmed
        .parse::<Tz>()
        .map(ZoneSpec::Named)
        .map_err(|_| ScheduleError::InvalidTimezone(trimmed.to_string()))
}

/// Parse `±HH:MM` / `±HHMM` into a fixed offset within [-14:00, +14:00]
fn parse_offset(raw: &str) -> Result<FixedOffset, ScheduleError> {
    let sign = if raw.starts_with('-') { -1 } else { 1 };
    let digits: String = raw[1..].chars().filter(|c| *c != ':').collect();

    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ScheduleError::InvalidTimezone(raw.to_string()));
    }

    let hours: i32 = digits[0..2].parse().unwrap_or(99);
    let minutes: i32 = digits[2..4].parse().unwrap_or(99);

    if minutes >= 60 {
        return Err(ScheduleError::InvalidTimezone(raw.to_string()));
    }

    let total_minutes = sign * (hours * 60 + minutes);
    if total_minutes.abs() > 14 * 60 {
        return Err(ScheduleError::OffsetOutOfRange(raw.to_string()));
    }

    FixedOffset::east_opt(total_minutes * 60)
        .ok_or_else(|| ScheduleError::InvalidTimezone(raw.to_string()))
}

/// Parse a `send_sync` value against the current time.
///
/// `timezone` is consulted only for naive datetime formats; ISO-8601
/// inputs carry their own offset.
pub fn parse_send_sync(
    send_sync: &str,
    timezone: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ScheduleOutcome, ScheduleError> {
    let input = send_sync.trim();
    let lowered = input.to_ascii_lowercase();

    if lowered == "now" || lowered == "sekarang" {
        return Ok(ScheduleOutcome::Immediate);
    }

    // ISO-8601 with an explicit offset stands on its own
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        let utc = parsed.with_timezone(&Utc);
        let zone = ZoneSpec::Fixed(parsed.offset().fix());
        return check_future(utc, input, &zone, now, None);
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            let raw_zone = timezone
                .map(str::trim)
                .filter(|tz| !tz.is_empty())
                .ok_or(ScheduleError::TimezoneRequired)?;
            let zone = parse_zone(raw_zone)?;
            let utc = zone.localize(naive).ok_or(ScheduleError::InvalidFormat)?;
            return check_future(utc, input, &zone, now, Some(raw_zone.to_string()));
        }
    }

    Err(ScheduleError::InvalidFormat)
}

fn check_future(
    utc: DateTime<Utc>,
    _input: &str,
    zone: &ZoneSpec,
    now: DateTime<Utc>,
    timezone: Option<String>,
) -> Result<ScheduleOutcome, ScheduleError> {
    if utc <= now {
        let zone_label = timezone.clone().unwrap_or_else(|| "UTC offset".to_string());
        return Err(ScheduleError::PastTime {
            zone: zone_label,
            now_local: zone.render_now(now),
        });
    }

    Ok(ScheduleOutcome::At { utc, timezone })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_now_keywords() {
        assert_eq!(
            parse_send_sync("now", None, now()).unwrap(),
            ScheduleOutcome::Immediate
        );
        assert_eq!(
            parse_send_sync("  SEKARANG ", None, now()).unwrap(),
            ScheduleOutcome::Immediate
        );
    }

    #[test]
    fn test_naive_formats_with_offset() {
        for input in [
            "2099-01-01 10:00:00",
            "2099-01-01 10:00",
            "2099-01-01T10:00:00",
            "01/01/2099 10:00",
            "01-01-2099 10:00",
        ] {
            let outcome = parse_send_sync(input, Some("+07:00"), now()).unwrap();
            match outcome {
                ScheduleOutcome::At { utc, timezone } => {
                    // 10:00 at +07:00 is 03:00 UTC
                    assert_eq!(utc, Utc.with_ymd_and_hms(2099, 1, 1, 3, 0, 0).unwrap());
                    assert_eq!(timezone.as_deref(), Some("+07:00"));
                }
                other => panic!("expected At, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_naive_format_requires_timezone() {
        let err = parse_send_sync("2099-01-01 10:00:00", None, now()).unwrap_err();
        assert_eq!(err, ScheduleError::TimezoneRequired);
    }

    #[test]
    fn test_offset_variants() {
        assert!(parse_send_sync("2099-01-01 10:00", Some("+0700"), now()).is_ok());
        assert!(parse_send_sync("2099-01-01 10:00", Some("-05:30"), now()).is_ok());
        assert!(parse_send_sync("2099-01-01 10:00", Some("+14:00"), now()).is_ok());
        assert!(parse_send_sync("2099-01-01 10:00", Some("-14:00"), now()).is_ok());
    }

    #[test]
    fn test_offset_out_of_range() {
        let err = parse_send_sync("2099-01-01 10:00", Some("+15:00"), now()).unwrap_err();
        assert!(matches!(err, ScheduleError::OffsetOutOfRange(_)));
    }

    #[test]
    fn test_bad_offset_minutes() {
        let err = parse_send_sync("2099-01-01 10:00", Some("+07:75"), now()).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidTimezone(_)));
    }

    #[test]
    fn test_iana_zone() {
        let outcome = parse_send_sync("2099-01-01 10:00:00", Some("Asia/Jakarta"), now()).unwrap();
        match outcome {
            ScheduleOutcome::At { utc, .. } => {
                // Jakarta is UTC+7, no DST
                assert_eq!(utc, Utc.with_ymd_and_hms(2099, 1, 1, 3, 0, 0).unwrap());
            }
            other => panic!("expected At, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_iana_zone() {
        let err =
            parse_send_sync("2099-01-01 10:00", Some("Mars/Olympus_Mons"), now()).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidTimezone(_)));
    }

    #[test]
    fn test_iso_with_offset_needs_no_timezone() {
        let outcome = parse_send_sync("2099-01-01T10:00:00+07:00", None, now()).unwrap();
        match outcome {
            ScheduleOutcome::At { utc, timezone } => {
                assert_eq!(utc, Utc.with_ymd_and_hms(2099, 1, 1, 3, 0, 0).unwrap());
                assert_eq!(timezone, None);
            }
            other => panic!("expected At, got {other:?}"),
        }
    }

    #[test]
    fn test_past_time_rejected_with_local_now() {
        let err = parse_send_sync("2020-01-01 10:00:00", Some("+07:00"), now()).unwrap_err();
        match err {
            ScheduleError::PastTime { zone, now_local } => {
                assert_eq!(zone, "+07:00");
                // 12:00 UTC rendered at +07:00
                assert_eq!(now_local, "2025-06-01 19:00:00");
            }
            other => panic!("expected PastTime, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_now_rejected() {
        // Equality with now() is not "in the future"
        let err = parse_send_sync("2025-06-01T12:00:00+00:00", None, now()).unwrap_err();
        assert!(matches!(err, ScheduleError::PastTime { .. }));
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(
            parse_send_sync("tomorrow-ish", None, now()).unwrap_err(),
            ScheduleError::InvalidFormat
        );
    }
}
