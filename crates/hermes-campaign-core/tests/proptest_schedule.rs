//! Property tests for `send_sync` parsing

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use hermes_campaign_core::{parse_send_sync, ScheduleError, ScheduleOutcome};

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

proptest! {
    /// Parsing never panics, whatever the inputs look like.
    #[test]
    fn parse_never_panics(send_sync in ".*", timezone in proptest::option::of(".*")) {
        let _ = parse_send_sync(&send_sync, timezone.as_deref(), now());
    }

    /// Every in-range offset is accepted and converts the wall time
    /// consistently: local minus offset equals UTC.
    #[test]
    fn valid_offsets_convert_consistently(
        sign in prop::bool::ANY,
        hours in 0i32..=13,
        minutes in 0i32..=59,
        colon in prop::bool::ANY,
    ) {
        let signch = if sign { '+' } else { '-' };
        let tz = if colon {
            format!("{signch}{hours:02}:{minutes:02}")
        } else {
            format!("{signch}{hours:02}{minutes:02}")
        };

        let outcome = parse_send_sync("2099-01-01 10:00:00", Some(&tz), now()).unwrap();
        let ScheduleOutcome::At { utc, .. } = outcome else {
            panic!("expected scheduled outcome");
        };

        let offset_minutes = (hours * 60 + minutes) * if sign { 1 } else { -1 };
        let local = Utc.with_ymd_and_hms(2099, 1, 1, 10, 0, 0).unwrap();
        prop_assert_eq!(utc, local - chrono::Duration::minutes(i64::from(offset_minutes)));
    }

    /// Offsets beyond ±14:00 are always rejected.
    #[test]
    fn out_of_range_offsets_rejected(hours in 15i32..=23, minutes in 0i32..=59) {
        for signch in ['+', '-'] {
            let tz = format!("{signch}{hours:02}:{minutes:02}");
            let err = parse_send_sync("2099-01-01 10:00:00", Some(&tz), now()).unwrap_err();
            prop_assert!(matches!(
                err,
                ScheduleError::OffsetOutOfRange(_) | ScheduleError::InvalidTimezone(_)
            ));
        }
    }

    /// Scheduled outcomes are always strictly in the future.
    #[test]
    fn scheduled_time_is_future(offset_hours in -13i64..=13) {
        let tz = if offset_hours >= 0 {
            format!("+{:02}:00", offset_hours)
        } else {
            format!("-{:02}:00", -offset_hours)
        };

        if let Ok(ScheduleOutcome::At { utc, .. }) =
            parse_send_sync("2099-06-01 00:30:00", Some(&tz), now())
        {
            prop_assert!(utc > now());
        }
    }
}

#[test]
fn fourteen_hour_boundary_exact() {
    assert!(parse_send_sync("2099-01-01 10:00:00", Some("+14:00"), now()).is_ok());
    assert!(parse_send_sync("2099-01-01 10:00:00", Some("-14:00"), now()).is_ok());
    assert!(parse_send_sync("2099-01-01 10:00:00", Some("+14:01"), now()).is_err());
}
