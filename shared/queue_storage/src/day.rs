//! Calendar-day helpers
//!
//! Ticket numbers and tracking entries are scoped to one local calendar day.
//! The counter key must expire at the next local midnight, computed as a
//! delta at increment time so the first increment of every day re-establishes
//! the correct expiry.

use chrono::{DateTime, Datelike, Duration, Local, TimeZone};

/// Formats the service-day partition key (`YYYY-MM-DD`, local time)
#[must_use]
pub fn service_day<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        now.year(),
        now.month(),
        now.day()
    )
}

/// Today's service-day key in local time
#[must_use]
pub fn today() -> String {
    service_day(&Local::now())
}

/// Seconds from `now` until the next local midnight
///
/// Always in `1..=86_400`; on a DST boundary the wall-clock day is still the
/// unit that matters for queue numbering.
#[must_use]
pub fn seconds_until_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> u64 {
    let next_midnight = (now.date_naive() + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid wall-clock time");

    let delta = next_midnight - now.naive_local();
    let secs = delta.num_seconds();
    u64::try_from(secs.clamp(1, 86_400)).expect("clamped to a positive range")
}

/// Unix timestamp of the next local midnight plus a randomized offset
///
/// Used for DynamoDB TTL attributes: entries must survive until end of day,
/// and the random spread keeps the table's TTL deletions from bursting.
#[must_use]
pub fn expiry_after_midnight(jitter_secs: u64) -> i64 {
    let now = Local::now();
    let delta = i64::try_from(seconds_until_midnight(&now)).unwrap_or(86_400);
    let jitter = i64::try_from(jitter_secs).unwrap_or(0);
    now.timestamp() + delta + jitter
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;
    use pretty_assertions::assert_eq;

    use super::*;

    fn bangkok(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .unwrap()
    }

    #[test]
    fn service_day_formats_local_date() {
        let now = bangkok(2024, 3, 7, 23, 59, 59);
        assert_eq!(service_day(&now), "2024-03-07");
    }

    #[test]
    fn seconds_until_midnight_is_the_delta_to_next_local_midnight() {
        let now = bangkok(2024, 3, 7, 23, 59, 0);
        assert_eq!(seconds_until_midnight(&now), 60);

        let early = bangkok(2024, 3, 7, 0, 0, 1);
        assert_eq!(seconds_until_midnight(&early), 86_399);
    }

    #[test]
    fn seconds_until_midnight_is_bounded_for_any_input() {
        for hour in 0..24 {
            let now = bangkok(2024, 6, 1, hour, 30, 30);
            let secs = seconds_until_midnight(&now);
            assert!(secs >= 1 && secs <= 86_400, "out of range: {secs}");
        }
        // Exactly midnight still yields a full day, not zero
        let midnight = bangkok(2024, 6, 1, 0, 0, 0);
        assert_eq!(seconds_until_midnight(&midnight), 86_400);
    }
}
