//! Normalization of provider timestamps to calendar dates.
//!
//! The history endpoint reports epoch values at sub-day granularity, and
//! depending on the endpoint revision they come as seconds or milliseconds.
//! Anything above [`MILLIS_THRESHOLD`] (roughly the year 2286 in seconds) is
//! treated as milliseconds.

use chrono::{DateTime, NaiveDate};

use super::error::DomainError;

/// Raw values above this magnitude are milliseconds.
pub const MILLIS_THRESHOLD: f64 = 1e10;

/// Convert a raw epoch value (seconds or milliseconds) to its UTC date.
///
/// # Errors
/// Returns [`DomainError::TimestampOutOfRange`] for non-finite or
/// unrepresentable values.
pub fn to_calendar_date(raw: f64) -> Result<NaiveDate, DomainError> {
    let out_of_range = || DomainError::TimestampOutOfRange {
        raw: raw.to_string(),
    };
    if !raw.is_finite() {
        return Err(out_of_range());
    }

    let seconds = if raw > MILLIS_THRESHOLD {
        raw / 1000.0
    } else {
        raw
    };
    let seconds = seconds.floor();
    if seconds < i64::MIN as f64 || seconds > i64::MAX as f64 {
        return Err(out_of_range());
    }

    #[allow(clippy::cast_possible_truncation)]
    DateTime::from_timestamp(seconds as i64, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(out_of_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn milliseconds_and_seconds_agree() {
        let from_millis = to_calendar_date(1_700_000_000_000.0).unwrap();
        let from_seconds = to_calendar_date(1_700_000_000.0).unwrap();
        assert_eq!(from_millis, from_seconds);
        assert_eq!(from_seconds, date(2023, 11, 14));
    }

    #[test]
    fn dates_are_utc() {
        // 2023-11-14T23:59:59Z and 2023-11-15T00:00:00Z
        assert_eq!(to_calendar_date(1_700_006_399.0).unwrap(), date(2023, 11, 14));
        assert_eq!(to_calendar_date(1_700_006_400.0).unwrap(), date(2023, 11, 15));
    }

    #[test]
    fn fractional_milliseconds_are_floored() {
        assert_eq!(
            to_calendar_date(1_700_006_399_999.9).unwrap(),
            date(2023, 11, 14)
        );
    }

    #[test]
    fn threshold_value_itself_is_seconds() {
        // 1e10 seconds is 2286-11-20.
        assert_eq!(to_calendar_date(MILLIS_THRESHOLD).unwrap(), date(2286, 11, 20));
    }

    #[test]
    fn non_finite_is_rejected() {
        assert!(matches!(
            to_calendar_date(f64::NAN),
            Err(DomainError::TimestampOutOfRange { .. })
        ));
    }
}
