//! Recurring tasks: templates that materialize one reminder per occurrence.

mod generator;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::recurrence::RecurrenceRule;
use crate::reminder::DEFAULT_ICON;
use crate::time::ClockTime;

/// Completion history of one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecurringStats {
    pub total_generated: u32,
    pub total_completed: u32,
    pub total_missed: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl RecurringStats {
    /// A completion extends the streak; a miss resets it.
    pub fn record_outcome(&mut self, completed: bool, now: DateTime<Utc>) {
        if completed {
            self.total_completed += 1;
            self.current_streak += 1;
            self.longest_streak = self.longest_streak.max(self.current_streak);
            self.last_completed_at = Some(now);
        } else {
            self.total_missed += 1;
            self.current_streak = 0;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTask {
    pub id: String,
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub recurrence: RecurrenceRule,
    /// Local wall-clock time of each occurrence.
    pub time: ClockTime,
    /// No occurrence falls before this day.
    pub start_date: NaiveDate,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// `None` follows the global bee-mode setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bee_mode_enabled: Option<bool>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub stats: RecurringStats,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_true() -> bool {
    true
}

/// Fields the user provides for a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringTaskDraft {
    pub name: String,
    pub icon: String,
    pub note: Option<String>,
    pub recurrence: RecurrenceRule,
    pub time: ClockTime,
    pub start_date: NaiveDate,
    pub is_active: bool,
    pub bee_mode_enabled: Option<bool>,
}

impl RecurringTaskDraft {
    pub fn new(
        name: impl Into<String>,
        recurrence: RecurrenceRule,
        time: ClockTime,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            icon: default_icon(),
            note: None,
            recurrence,
            time,
            start_date,
            is_active: true,
            bee_mode_enabled: None,
        }
    }
}

/// Partial update; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurringTaskPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub note: Option<Option<String>>,
    pub recurrence: Option<RecurrenceRule>,
    pub time: Option<ClockTime>,
    pub start_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub bee_mode_enabled: Option<Option<bool>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn outcome_updates_streaks() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let mut stats = RecurringStats::default();
        stats.record_outcome(true, now);
        stats.record_outcome(true, now);
        stats.record_outcome(false, now);
        stats.record_outcome(true, now);

        assert_eq!(stats.total_completed, 3);
        assert_eq!(stats.total_missed, 1);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 2);
        assert_eq!(stats.last_completed_at, Some(now));
    }

    #[test]
    fn legacy_task_json_defaults() {
        let task: RecurringTask = serde_json::from_str(
            r#"{
                "id": "t1",
                "name": "Stretch",
                "recurrence": {"type": "weekly", "daysOfWeek": [1, 3, 5]},
                "time": "07:30",
                "startDate": "2025-01-01",
                "createdAt": 1735689600000
            }"#,
        )
        .unwrap();
        assert!(task.is_active);
        assert!(task.bee_mode_enabled.is_none());
        assert_eq!(task.stats, RecurringStats::default());
        assert_eq!(task.recurrence, RecurrenceRule::weekly([1, 3, 5]));
        assert_eq!(task.time, ClockTime::hm(7, 30));
    }
}
