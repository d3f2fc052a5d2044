//! Points, levels, streaks and achievements.
//!
//! The ledger is plain data plus bookkeeping rules. It never looks at the
//! clock itself: every call gets today's date and the current instant
//! through a [`Tally`], which also carries the outbox events are pushed to.

pub mod achievements;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::events::{Event, PointReason, ToastKind, ToastMessage};

pub use achievements::{Achievement, AchievementCondition, Progress, ACHIEVEMENTS};

/// Per-day counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyStats {
    pub captured: u32,
    pub completed: u32,
    pub completed_on_time: u32,
    pub missed: u32,
    pub cp_earned: u64,
}

/// All-time counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub total_captured: u64,
    pub total_completed: u64,
    #[serde(rename = "totalCP")]
    pub total_cp: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(rename = "bestDayCP")]
    pub best_day_cp: u64,
    pub level: u32,
    pub achievements: Vec<String>,
    #[serde(with = "optional_date")]
    pub last_active_date: Option<NaiveDate>,
    /// Quickest capture from first keystroke to save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fastest_capture_ms: Option<u64>,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            total_captured: 0,
            total_completed: 0,
            total_cp: 0,
            current_streak: 0,
            longest_streak: 0,
            best_day_cp: 0,
            level: 1,
            achievements: Vec::new(),
            last_active_date: None,
            fastest_capture_ms: None,
        }
    }
}

impl UserStats {
    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a == id)
    }
}

/// `YYYY-MM-DD`, with an empty string meaning "never".
mod optional_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => s.collect_str(date),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some).map_err(D::Error::custom),
        }
    }
}

/// Context for one ledger update.
pub struct Tally<'a> {
    pub config: &'a EngineConfig,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
    pub events: &'a mut Vec<Event>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamificationLedger {
    #[serde(default)]
    pub daily_stats: BTreeMap<NaiveDate, DailyStats>,
    #[serde(default)]
    pub user_stats: UserStats,
}

impl GamificationLedger {
    pub fn day(&self, date: NaiveDate) -> DailyStats {
        self.daily_stats.get(&date).copied().unwrap_or_default()
    }

    pub fn day_mut(&mut self, date: NaiveDate) -> &mut DailyStats {
        self.daily_stats.entry(date).or_default()
    }

    pub fn record_capture(&mut self, date: NaiveDate) {
        self.day_mut(date).captured += 1;
        self.user_stats.total_captured += 1;
    }

    /// Remember a capture's typing duration if it is the quickest so far.
    pub fn record_capture_speed(&mut self, elapsed_ms: u64) {
        let fastest = &mut self.user_stats.fastest_capture_ms;
        if fastest.map(|f| elapsed_ms < f).unwrap_or(true) {
            *fastest = Some(elapsed_ms);
        }
    }

    pub fn record_completion(&mut self, date: NaiveDate, on_time: bool) {
        let day = self.day_mut(date);
        day.completed += 1;
        if on_time {
            day.completed_on_time += 1;
        }
        self.user_stats.total_completed += 1;
    }

    /// Undo [`record_completion`](Self::record_completion). Saturates at zero.
    pub fn revert_completion(&mut self, date: NaiveDate, on_time: bool) {
        let day = self.day_mut(date);
        day.completed = day.completed.saturating_sub(1);
        if on_time {
            day.completed_on_time = day.completed_on_time.saturating_sub(1);
        }
        self.user_stats.total_completed = self.user_stats.total_completed.saturating_sub(1);
    }

    pub fn record_missed(&mut self, date: NaiveDate) {
        self.day_mut(date).missed += 1;
    }

    /// Grant points for today. Zero amounts change nothing.
    pub fn add_points(&mut self, tally: &mut Tally<'_>, amount: u32, reason: PointReason) {
        if amount == 0 {
            return;
        }
        let day = self.day_mut(tally.today);
        day.cp_earned += u64::from(amount);
        let day_total = day.cp_earned;

        let stats = &mut self.user_stats;
        stats.total_cp += u64::from(amount);
        stats.best_day_cp = stats.best_day_cp.max(day_total);
        let previous_level = stats.level;
        stats.level = tally.config.levels.level_for(stats.total_cp);

        tally.events.push(Event::PointsAwarded {
            amount,
            reason,
            total: stats.total_cp,
            at: tally.now,
        });
        if stats.level > previous_level {
            tracing::info!(level = stats.level, total = stats.total_cp, "level up");
            tally.events.push(Event::LevelUp {
                level: stats.level,
                at: tally.now,
            });
        }
    }

    /// Advance the day streak. Runs at most once per calendar day.
    ///
    /// Yesterday active: +1, with bonus points on 7/14/30. Any gap, or no
    /// activity ever: the streak restarts at 1.
    pub fn update_streak(&mut self, tally: &mut Tally<'_>) {
        let today = tally.today;
        let last = self.user_stats.last_active_date;
        if last == Some(today) {
            return;
        }

        let continued = last.is_some() && last == today.pred_opt();
        let streak = if continued {
            self.user_stats.current_streak + 1
        } else {
            1
        };

        self.user_stats.current_streak = streak;
        self.user_stats.longest_streak = self.user_stats.longest_streak.max(streak);
        self.user_stats.last_active_date = Some(today);

        if continued {
            if let Some(bonus) = tally.config.points.streak_bonus(streak) {
                tracing::info!(streak, bonus, "streak milestone");
                tally.events.push(Event::StreakMilestone {
                    streak,
                    bonus,
                    at: tally.now,
                });
                self.add_points(tally, bonus, PointReason::StreakMilestone);
            }
        }
    }

    pub fn progress(&self, today: NaiveDate, user_commands: usize) -> Progress {
        let stats = &self.user_stats;
        Progress {
            total_captured: stats.total_captured,
            total_completed: stats.total_completed,
            current_streak: stats.current_streak,
            user_commands,
            fastest_capture_ms: stats.fastest_capture_ms,
            today_points: self.day(today).cp_earned,
            total_points: stats.total_cp,
        }
    }

    /// Unlock every achievement whose condition now holds.
    ///
    /// Conditions are evaluated once against the current totals; points
    /// granted by the unlocks themselves are not re-checked until the next
    /// call. Each unlock awards its reward and gets its own toast.
    pub fn check_achievements(
        &mut self,
        tally: &mut Tally<'_>,
        user_commands: usize,
    ) -> Vec<&'static str> {
        let progress = self.progress(tally.today, user_commands);
        let unlocked: Vec<&'static Achievement> = ACHIEVEMENTS
            .iter()
            .filter(|a| !self.user_stats.has_achievement(a.id))
            .filter(|a| a.condition.is_met(&progress))
            .collect();

        for achievement in &unlocked {
            tracing::info!(achievement = achievement.id, "achievement unlocked");
            self.user_stats.achievements.push(achievement.id.to_string());
            tally.events.push(Event::AchievementUnlocked {
                achievement_id: achievement.id.to_string(),
                reward: achievement.reward,
                at: tally.now,
            });
            tally.events.push(Event::Toast {
                kind: ToastKind::Achievement,
                message: ToastMessage::AchievementUnlocked {
                    achievement_id: achievement.id.to_string(),
                },
                icon: Some(achievement.icon.to_string()),
                points: Some(achievement.reward),
                at: tally.now,
            });
            self.add_points(tally, achievement.reward, PointReason::Achievement);
        }

        unlocked.into_iter().map(|a| a.id).collect()
    }
}
