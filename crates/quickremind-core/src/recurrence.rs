//! Recurrence rules and next-occurrence evaluation.
//!
//! Pure functions: no state, no clock, no I/O. Every computation happens in
//! the timezone of the reference instant, so callers decide which wall clock
//! "09:00" refers to.
//!
//! ## Contract
//!
//! [`next_occurrence`] returns an instant strictly after the reference
//! instant, or `None` when the rule cannot produce one (calendar overflow).

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::time::{at_local, days_in_month, ClockTime};

/// Unit of a custom recurrence interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    #[default]
    Days,
    Weeks,
    Months,
}

/// Which day of the month a monthly rule fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthDay {
    /// Fixed day, clamped to the month's length.
    Day(u8),
    LastDay,
}

/// A recurrence rule, tagged by `type` in the persisted JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecurrenceRule {
    Daily,
    Weekly {
        /// 0 = Sunday .. 6 = Saturday.
        #[serde(rename = "daysOfWeek", default)]
        days_of_week: Vec<u8>,
    },
    Monthly {
        #[serde(rename = "dayOfMonth", default = "default_day_of_month")]
        day_of_month: u8,
        #[serde(rename = "isLastDayOfMonth", default)]
        is_last_day_of_month: bool,
    },
    Custom {
        #[serde(rename = "intervalValue", default = "default_interval_value")]
        interval_value: u32,
        #[serde(rename = "intervalUnit", default)]
        interval_unit: IntervalUnit,
    },
}

fn default_day_of_month() -> u8 {
    1
}

fn default_interval_value() -> u32 {
    1
}

impl RecurrenceRule {
    pub fn weekly<I: IntoIterator<Item = u8>>(days: I) -> Self {
        RecurrenceRule::Weekly {
            days_of_week: days.into_iter().collect(),
        }
    }

    pub fn monthly(day: MonthDay) -> Self {
        match day {
            MonthDay::Day(d) => RecurrenceRule::Monthly {
                day_of_month: d,
                is_last_day_of_month: false,
            },
            MonthDay::LastDay => RecurrenceRule::Monthly {
                day_of_month: 31,
                is_last_day_of_month: true,
            },
        }
    }

    pub fn every(interval_value: u32, interval_unit: IntervalUnit) -> Self {
        RecurrenceRule::Custom {
            interval_value,
            interval_unit,
        }
    }
}

/// Next instant strictly after `from` matching `rule` at wall-clock `time`.
///
/// `start_date` anchors custom intervals; other rules ignore it.
pub fn next_occurrence<Tz: TimeZone>(
    rule: &RecurrenceRule,
    time: ClockTime,
    start_date: NaiveDate,
    from: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    match rule {
        RecurrenceRule::Daily => next_daily(time, from),
        RecurrenceRule::Weekly { days_of_week } => next_weekly(days_of_week, time, from),
        RecurrenceRule::Monthly {
            day_of_month,
            is_last_day_of_month,
        } => {
            let day = if *is_last_day_of_month {
                MonthDay::LastDay
            } else {
                MonthDay::Day(*day_of_month)
            };
            next_monthly(day, time, from)
        }
        RecurrenceRule::Custom {
            interval_value,
            interval_unit,
        } => next_custom(*interval_value, *interval_unit, time, start_date, from),
    }
}

fn next_daily<Tz: TimeZone>(time: ClockTime, from: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let tz = from.timezone();
    let today = from.date_naive();
    let candidate = at_local(&tz, today, time)?;
    if candidate > *from {
        return Some(candidate);
    }
    at_local(&tz, today.succ_opt()?, time)
}

fn next_weekly<Tz: TimeZone>(
    days_of_week: &[u8],
    time: ClockTime,
    from: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    let mut mask = [false; 7];
    for &d in days_of_week.iter().filter(|d| **d < 7) {
        mask[d as usize] = true;
    }
    if !mask.iter().any(|m| *m) {
        return next_daily(time, from);
    }

    let tz = from.timezone();
    let today = from.date_naive();
    // Offset 7 is today's weekday next week, which covers the wrap.
    for offset in 0..=7u64 {
        let date = today.checked_add_days(Days::new(offset))?;
        if !mask[date.weekday().num_days_from_sunday() as usize] {
            continue;
        }
        let candidate = at_local(&tz, date, time)?;
        if candidate > *from {
            return Some(candidate);
        }
    }
    None
}

fn monthly_candidate<Tz: TimeZone>(
    tz: &Tz,
    year: i32,
    month: u32,
    day: MonthDay,
    time: ClockTime,
) -> Option<DateTime<Tz>> {
    let last = days_in_month(year, month);
    let d = match day {
        MonthDay::LastDay => last,
        MonthDay::Day(d) => (d.max(1) as u32).min(last),
    };
    at_local(tz, NaiveDate::from_ymd_opt(year, month, d)?, time)
}

fn next_monthly<Tz: TimeZone>(
    day: MonthDay,
    time: ClockTime,
    from: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    let tz = from.timezone();
    let (year, month) = (from.year(), from.month());
    let candidate = monthly_candidate(&tz, year, month, day, time)?;
    if candidate > *from {
        return Some(candidate);
    }
    let (year, month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    monthly_candidate(&tz, year, month, day, time)
}

fn next_custom<Tz: TimeZone>(
    interval_value: u32,
    unit: IntervalUnit,
    time: ClockTime,
    start_date: NaiveDate,
    from: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    let tz = from.timezone();
    let anchor = at_local(&tz, start_date, time)?;
    if anchor > *from {
        return Some(anchor);
    }

    let step = interval_value.max(1);
    // Each step is measured from the anchor so month clamping never drifts
    // (Jan 31 -> Feb 28 -> Mar 31, not Mar 28).
    let nth = |k: u64| -> Option<NaiveDate> {
        match unit {
            IntervalUnit::Days => start_date.checked_add_days(Days::new(k * step as u64)),
            IntervalUnit::Weeks => start_date.checked_add_days(Days::new(k * step as u64 * 7)),
            IntervalUnit::Months => {
                let months = u32::try_from(k * step as u64).ok()?;
                start_date.checked_add_months(Months::new(months))
            }
        }
    };

    // Jump close to `from` instead of walking one step at a time.
    let elapsed_days = (from.date_naive() - start_date).num_days().max(0) as u64;
    let step_days = match unit {
        IntervalUnit::Days => step as u64,
        IntervalUnit::Weeks => step as u64 * 7,
        IntervalUnit::Months => step as u64 * 31,
    };
    let mut k = (elapsed_days / step_days).saturating_sub(1).max(1);

    loop {
        let candidate = at_local(&tz, nth(k)?, time)?;
        if candidate > *from {
            return Some(candidate);
        }
        k += 1;
    }
}
