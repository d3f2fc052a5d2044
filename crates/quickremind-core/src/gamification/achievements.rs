//! Achievement catalog.

use serde::{Deserialize, Serialize};

/// Single unlock condition, compared with `>=` (or `<=` for speed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum AchievementCondition {
    TotalCaptured(u64),
    TotalCompleted(u64),
    Streak(u32),
    /// Commands created by the user, built-ins excluded.
    CommandsCreated(usize),
    /// A capture finished within this many seconds of starting to type.
    SpeedCapture(u64),
    #[serde(rename = "dailyCP")]
    DailyPoints(u64),
    #[serde(rename = "totalCP")]
    TotalPoints(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub icon: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub reward: u32,
    pub condition: AchievementCondition,
}

const fn achievement(
    id: &'static str,
    icon: &'static str,
    name: &'static str,
    description: &'static str,
    reward: u32,
    condition: AchievementCondition,
) -> Achievement {
    Achievement {
        id,
        icon,
        name,
        description,
        reward,
        condition,
    }
}

use AchievementCondition::*;

/// Every achievement, in evaluation order.
pub const ACHIEVEMENTS: &[Achievement] = &[
    achievement(
        "first_capture",
        "🌱",
        "First Capture",
        "Caught your first thought",
        5,
        TotalCaptured(1),
    ),
    achievement(
        "speed_demon",
        "⚡",
        "Speed Demon",
        "Created a reminder in 3 seconds",
        10,
        SpeedCapture(3),
    ),
    achievement("week_warrior", "🔥", "Week Warrior", "7-day streak", 25, Streak(7)),
    achievement("two_weeks", "💪", "Two Weeks Strong", "14-day streak", 50, Streak(14)),
    achievement("month_master", "🏆", "Month Master", "30-day streak", 100, Streak(30)),
    achievement("precision_10", "🎯", "Precision", "10 reminders completed", 15, TotalCompleted(10)),
    achievement(
        "precision_50",
        "🎯",
        "Sharp Shooter",
        "50 reminders completed",
        30,
        TotalCompleted(50),
    ),
    achievement(
        "precision_100",
        "🎯",
        "Bullseye Master",
        "100 reminders completed",
        50,
        TotalCompleted(100),
    ),
    achievement(
        "mind_organizer_50",
        "🧠",
        "Mind Organizer",
        "50 thoughts captured",
        20,
        TotalCaptured(50),
    ),
    achievement(
        "mind_organizer_100",
        "🧠",
        "Thought Collector",
        "100 thoughts captured",
        40,
        TotalCaptured(100),
    ),
    achievement(
        "mind_organizer_500",
        "🧠",
        "Memory Master",
        "500 thoughts captured",
        100,
        TotalCaptured(500),
    ),
    achievement(
        "command_creator_5",
        "⌨️",
        "Command Creator",
        "Created 5 quick commands",
        20,
        CommandsCreated(5),
    ),
    achievement(
        "command_creator_10",
        "⌨️",
        "Automation Pro",
        "Created 10 quick commands",
        40,
        CommandsCreated(10),
    ),
    achievement("superstar", "🌟", "Superstar", "100 points in a single day", 50, DailyPoints(100)),
    achievement("cp_500", "💎", "Rising Star", "Earned 500 points", 25, TotalPoints(500)),
    achievement("cp_1000", "💎", "Shining Gem", "Earned 1000 points", 50, TotalPoints(1000)),
    achievement("cp_5000", "💎", "Diamond Mind", "Earned 5000 points", 100, TotalPoints(5000)),
];

pub fn find(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Values an achievement condition is checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub total_captured: u64,
    pub total_completed: u64,
    pub current_streak: u32,
    pub user_commands: usize,
    pub fastest_capture_ms: Option<u64>,
    pub today_points: u64,
    pub total_points: u64,
}

impl AchievementCondition {
    pub fn is_met(&self, progress: &Progress) -> bool {
        match *self {
            TotalCaptured(n) => progress.total_captured >= n,
            TotalCompleted(n) => progress.total_completed >= n,
            Streak(n) => progress.current_streak >= n,
            CommandsCreated(n) => progress.user_commands >= n,
            SpeedCapture(secs) => progress
                .fastest_capture_ms
                .map(|ms| ms <= secs * 1000)
                .unwrap_or(false),
            DailyPoints(n) => progress.today_points >= n,
            TotalPoints(n) => progress.total_points >= n,
        }
    }
}
