//! Wall-clock helpers shared by recurrence and bee mode.
//!
//! Instants are `DateTime<Utc>`; everything calendar-shaped (days, `HH:MM`
//! times, quiet hours) is evaluated in a caller-supplied timezone.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

pub const MINUTE_MS: i64 = 60 * 1000;

/// Local wall-clock time of day with minute precision, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// Compile-time constructor for known-good literals.
    pub const fn hm(hour: u8, minute: u8) -> Self {
        assert!(hour < 24 && minute < 60);
        Self { hour, minute }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Minutes since local midnight.
    pub fn minutes_of_day(&self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }

    pub fn to_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or(NaiveTime::MIN)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time of day '{0}', expected HH:MM")]
pub struct ParseClockTimeError(String);

impl FromStr for ClockTime {
    type Err = ParseClockTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseClockTimeError(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(err)?;
        let hour: u8 = h.parse().map_err(|_| err())?;
        let minute: u8 = m.parse().map_err(|_| err())?;
        ClockTime::new(hour, minute).ok_or_else(err)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ParseClockTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Resolve a local date and time of day to an instant in `tz`.
///
/// Ambiguous local times (DST fall-back) take the earlier instant. Local
/// times skipped by a DST jump resolve to the same wall time one hour later.
pub fn at_local<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: ClockTime) -> Option<DateTime<Tz>> {
    let naive = NaiveDateTime::new(date, time.to_naive());
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

/// Minutes since local midnight of an instant.
pub fn minutes_of_day<Tz: TimeZone>(at: &DateTime<Tz>) -> u32 {
    at.hour() * 60 + at.minute()
}

/// Whole minutes from `from` to `to`, rounded to nearest.
pub fn minutes_between<Tz: TimeZone>(from: &DateTime<Tz>, to: &DateTime<Tz>) -> i64 {
    let ms = to.timestamp_millis() - from.timestamp_millis();
    (ms as f64 / MINUTE_MS as f64).round() as i64
}

/// Last calendar day of the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| chrono::Datelike::day(&d))
        .unwrap_or(28)
}
