// Sources:
// - https://learn.microsoft.com/windows/win32/api/minwinbase/ns-minwinbase-filetime

use crate::err::{DecodeError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Seconds between 1601-01-01 and 1970-01-01.
pub const FILETIME_UNIX_DELTA_SECS: i64 = 11_644_473_600;

/// Latest year a decoded timestamp may land in (four digit years only).
pub const MAX_YEAR: i32 = 9999;

/// Textual form used by every projection of a timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f%z";

/// A FILETIME field as found on disk: either a calendar value or the raw
/// tick count that could not be mapped to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum FileTime {
    Valid(DateTime<Utc>),
    Invalid(u64),
}

impl FileTime {
    /// Convert a raw value, recording out-of-range values as `Invalid`.
    pub fn from_raw(raw: u64) -> Self {
        match filetime_to_datetime(raw) {
            Ok(dt) => FileTime::Valid(dt),
            Err(_) => FileTime::Invalid(raw),
        }
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FileTime::Valid(dt) => Some(*dt),
            FileTime::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, FileTime::Valid(_))
    }

    /// `None` for invalid values.
    pub fn format(&self) -> Option<String> {
        self.datetime()
            .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Seconds since the Unix epoch, with microseconds as the fraction.
    pub fn unix_seconds(&self) -> Option<f64> {
        self.datetime()
            .map(|dt| dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1e6)
    }
}

fn filetime_epoch() -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(1601, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or(DecodeError::InvalidTimestamp(0))
}

/// Convert 100ns ticks since 1601-01-01 UTC into a UTC timestamp,
/// truncating sub-microsecond precision.
pub fn filetime_to_datetime(raw: u64) -> Result<DateTime<Utc>> {
    let micros = i64::try_from(raw / 10).map_err(|_| DecodeError::InvalidTimestamp(raw))?;
    let dt = filetime_epoch()?
        .checked_add_signed(Duration::microseconds(micros))
        .ok_or(DecodeError::InvalidTimestamp(raw))?;
    if dt.year() > MAX_YEAR {
        return Err(DecodeError::InvalidTimestamp(raw));
    }
    Ok(dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_the_filetime_epoch() {
        let dt = filetime_to_datetime(0).unwrap();
        assert_eq!(dt.to_rfc3339(), "1601-01-01T00:00:00+00:00");
    }

    #[test]
    fn known_value_converts_exactly() {
        let dt = filetime_to_datetime(128_920_200_525_400_760).unwrap();
        assert_eq!(
            dt.format(TIMESTAMP_FORMAT).to_string(),
            "2009-07-14 04:40:52.540076+0000"
        );
    }

    #[test]
    fn sub_microsecond_ticks_are_truncated() {
        let exact = filetime_to_datetime(128_920_200_525_400_760).unwrap();
        let extra = filetime_to_datetime(128_920_200_525_400_769).unwrap();
        assert_eq!(exact, extra);
    }

    #[test]
    fn unix_epoch_lines_up() {
        let raw = (FILETIME_UNIX_DELTA_SECS as u64) * 10_000_000;
        assert_eq!(filetime_to_datetime(raw).unwrap().timestamp(), 0);
        assert_eq!(FileTime::from_raw(raw).unix_seconds(), Some(0.0));
    }

    #[test]
    fn values_past_year_9999_are_invalid() {
        assert_eq!(
            filetime_to_datetime(u64::MAX),
            Err(DecodeError::InvalidTimestamp(u64::MAX))
        );
        let ft = FileTime::from_raw(u64::MAX);
        assert_eq!(ft, FileTime::Invalid(u64::MAX));
        assert_eq!(ft.format(), None);
    }
}
