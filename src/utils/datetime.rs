use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

/// Returns the next UTC midnight (`YYYY-MM-DD 00:00:00Z`) after `now`.
pub fn next_utc_midnight_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now
        .date_naive()
        .checked_add_days(chrono::Days::new(1))
        .expect("tomorrow should always be valid");

    let midnight = tomorrow
        .and_hms_opt(0, 0, 0)
        .expect("00:00:00 should always be valid");

    DateTime::<Utc>::from_naive_utc_and_offset(midnight, Utc)
}

/// Returns the sleep duration until the next UTC midnight.
pub fn duration_until_next_utc_midnight(now: DateTime<Utc>) -> Duration {
    let next_midnight = next_utc_midnight_after(now);
    let sleep_duration = next_midnight.signed_duration_since(now);

    sleep_duration
        .to_std()
        .unwrap_or_else(|_| Duration::from_secs(0))
}

/// Lower bound of a poll window. Without a previous watermark the window reaches back
/// `safety_window` from `now`, never further.
pub fn poll_window_start(
    last_poll_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    safety_window: chrono::Duration,
) -> DateTime<Utc> {
    last_poll_at.unwrap_or(now - safety_window)
}

/// RFC 3339 with a `Z` suffix, as the hiring platform's filter syntax expects.
pub fn filter_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts)
            .expect("timestamp should parse")
            .with_timezone(&Utc)
    }

    #[test]
    fn test_next_utc_midnight_after() {
        let next_midnight = next_utc_midnight_after(parse("2026-02-11T15:42:05Z"));
        assert_eq!(next_midnight.to_rfc3339(), "2026-02-12T00:00:00+00:00");
    }

    #[test]
    fn test_duration_until_next_utc_midnight() {
        let duration = duration_until_next_utc_midnight(parse("2026-02-11T23:59:30Z"));

        assert_eq!(
            duration,
            Duration::from_secs(30),
            "Expected 30 seconds until midnight"
        );
    }

    #[test]
    fn test_poll_window_start_defaults_to_safety_window() {
        let now = parse("2026-10-14T12:00:00Z");

        assert_eq!(
            poll_window_start(None, now, chrono::Duration::minutes(60)),
            parse("2026-10-14T11:00:00Z")
        );

        let last = parse("2026-10-13T00:00:00Z");
        assert_eq!(
            poll_window_start(Some(last), now, chrono::Duration::minutes(60)),
            last
        );
    }

    #[test]
    fn test_filter_timestamp() {
        assert_eq!(
            filter_timestamp(parse("2026-10-14T12:00:00.750Z")),
            "2026-10-14T12:00:00Z"
        );
    }
}
