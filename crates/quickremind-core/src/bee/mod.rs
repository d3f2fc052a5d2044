//! Bee Mode: escalating follow-up notifications for an unfinished reminder.
//!
//! For each pending reminder with bee mode on, a ladder of follow-up
//! triggers is planned for the rest of its day:
//!
//! ```text
//! target ──+10m──+30m──+60m──+120m──(+repeat ...)──| quiet hours start
//!          stage0 stage1 stage2 stage3  stage3      last one = "last chance"
//! ```
//!
//! Triggers in the past or inside quiet hours are dropped. The ladder is
//! never patched: any change to settings or to a reminder's flag cancels
//! every handle and plans again from scratch.

mod content;

pub use content::{stage_content, BeeStage};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::gateway::{NotificationContent, NotificationGateway, NotificationHandle};
use crate::time::{at_local, minutes_of_day, ClockTime};

/// Longest offset a single ladder step may use: one week.
pub const MAX_OFFSET_MINUTES: u32 = 7 * 24 * 60;

/// Global bee-mode policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeeModeSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minute offsets from the target time.
    #[serde(default = "default_intervals")]
    pub intervals: Vec<u32>,
    /// Minutes between repeats after the last interval; 0 disables repeats.
    #[serde(default = "default_repeat_interval")]
    pub repeat_interval: u32,
    #[serde(default = "default_true")]
    pub repeat_enabled: bool,
    #[serde(default = "default_quiet_start")]
    pub quiet_hours_start: ClockTime,
    #[serde(default = "default_quiet_end")]
    pub quiet_hours_end: ClockTime,
}

fn default_true() -> bool {
    true
}
fn default_intervals() -> Vec<u32> {
    vec![10, 30, 60, 120]
}
fn default_repeat_interval() -> u32 {
    120
}
fn default_quiet_start() -> ClockTime {
    ClockTime::hm(22, 0)
}
fn default_quiet_end() -> ClockTime {
    ClockTime::hm(8, 0)
}

impl Default for BeeModeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            intervals: default_intervals(),
            repeat_interval: default_repeat_interval(),
            repeat_enabled: true,
            quiet_hours_start: default_quiet_start(),
            quiet_hours_end: default_quiet_end(),
        }
    }
}

impl BeeModeSettings {
    /// Positive, deduplicated, ascending interval offsets, each capped at
    /// [`MAX_OFFSET_MINUTES`].
    pub fn normalized_intervals(&self) -> Vec<u32> {
        let mut intervals: Vec<u32> = self
            .intervals
            .iter()
            .filter(|i| **i > 0)
            .map(|i| (*i).min(MAX_OFFSET_MINUTES))
            .collect();
        intervals.sort_unstable();
        intervals.dedup();
        intervals
    }

    /// Normalize `intervals` and cap `repeat_interval` in place.
    pub fn normalize(&mut self) {
        self.intervals = self.normalized_intervals();
        self.repeat_interval = self.repeat_interval.min(MAX_OFFSET_MINUTES);
    }

    /// Whether `at` falls inside quiet hours in its own timezone.
    ///
    /// Equal start and end means there are no quiet hours.
    pub fn is_quiet<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        let clock = minutes_of_day(at);
        let start = self.quiet_hours_start.minutes_of_day();
        let end = self.quiet_hours_end.minutes_of_day();
        if start == end {
            return false;
        }
        if start < end {
            clock >= start && clock < end
        } else {
            clock >= start || clock < end
        }
    }

    /// Minute offsets of the day's ladder, before past/quiet filtering.
    pub fn ladder_offsets<Tz: TimeZone>(&self, target: &DateTime<Tz>) -> Vec<u32> {
        let mut offsets = self.normalized_intervals();
        if !self.repeat_enabled || self.repeat_interval == 0 {
            return offsets;
        }

        let tz = target.timezone();
        let date = target.date_naive();
        let mut day_end = match at_local(&tz, date, self.quiet_hours_start) {
            Some(end) => end,
            None => return offsets,
        };
        if day_end <= *target {
            match date.succ_opt().and_then(|next| at_local(&tz, next, self.quiet_hours_start)) {
                Some(end) => day_end = end,
                None => return offsets,
            }
        }

        let repeat = self.repeat_interval.min(MAX_OFFSET_MINUTES);
        let mut last = offsets.last().copied().unwrap_or(0);
        loop {
            let Some(next) = last.checked_add(repeat) else {
                break;
            };
            if target.clone() + Duration::minutes(next as i64) >= day_end {
                break;
            }
            offsets.push(next);
            last = next;
        }
        offsets
    }
}

/// One planned follow-up notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeeTrigger {
    pub at: DateTime<Utc>,
    pub offset_minutes: u32,
    pub stage: BeeStage,
    pub content: NotificationContent,
}

/// Plan the surviving triggers for a reminder targeting `target`.
///
/// `text` is the reminder's title (`None` for untitled). Triggers at or
/// before `now` and inside quiet hours are dropped; the last survivor
/// carries the "last chance" content.
pub fn plan_ladder<Tz: TimeZone>(
    text: Option<&str>,
    target: &DateTime<Tz>,
    settings: &BeeModeSettings,
    now: DateTime<Utc>,
) -> Vec<BeeTrigger> {
    let offsets = settings.ladder_offsets(target);
    let survivors: Vec<(usize, u32, DateTime<Tz>)> = offsets
        .iter()
        .enumerate()
        .filter_map(|(index, offset)| {
            let at = target.clone() + Duration::minutes(*offset as i64);
            if at.with_timezone(&Utc) <= now || settings.is_quiet(&at) {
                return None;
            }
            Some((index, *offset, at))
        })
        .collect();

    let last = survivors.len().saturating_sub(1);
    survivors
        .into_iter()
        .enumerate()
        .map(|(position, (index, offset, at))| {
            let stage = if position == last {
                BeeStage::LastChance
            } else {
                BeeStage::for_index(index)
            };
            BeeTrigger {
                at: at.with_timezone(&Utc),
                offset_minutes: offset,
                content: stage_content(stage, text, offset),
                stage,
            }
        })
        .collect()
}

/// Schedule planned triggers and return their handles in ladder order.
pub fn schedule_ladder(
    gateway: &dyn NotificationGateway,
    triggers: &[BeeTrigger],
) -> Vec<NotificationHandle> {
    triggers
        .iter()
        .map(|trigger| gateway.schedule(&trigger.content, trigger.at))
        .collect()
}

/// Cancel every handle. Already fired or cancelled handles are no-ops.
pub fn cancel_ladder(gateway: &dyn NotificationGateway, handles: &[NotificationHandle]) {
    for handle in handles {
        gateway.cancel(handle);
    }
}

/// Earliest trigger that would still be scheduled.
pub fn next_trigger_time<Tz: TimeZone>(
    target: &DateTime<Tz>,
    settings: &BeeModeSettings,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    settings
        .ladder_offsets(target)
        .into_iter()
        .map(|offset| target.clone() + Duration::minutes(offset as i64))
        .find(|at| at.with_timezone(&Utc) > now && !settings.is_quiet(at))
        .map(|at| at.with_timezone(&Utc))
}
