use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a transient user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
    Achievement,
}

/// What a toast says. Hosts turn these into localized copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", rename_all = "snake_case")]
pub enum ToastMessage {
    CaptureSuccess { minutes: i64 },
    MaxReminders { limit: usize },
    MinMinutes { min: i64 },
    Completed,
    CompletedOnTime,
    Postponed { minutes: i64 },
    AchievementUnlocked { achievement_id: String },
    MaxCommands { limit: usize },
    MaxCategories { limit: usize },
    InvalidTimeOptions { limit: usize },
    CommandCreated,
    EmptyName,
    UnknownCommand,
}

/// Why points were granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointReason {
    Capture,
    Completion,
    OnTimeCompletion,
    StreakMilestone,
    QuickCommandUsed,
    QuickCommandCreated,
    Achievement,
}

/// Every observable outcome of a scheduler operation produces an Event.
/// The host drains them after each call; nothing here is delivered later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    Toast {
        kind: ToastKind,
        message: ToastMessage,
        icon: Option<String>,
        points: Option<u32>,
        at: DateTime<Utc>,
    },
    ReminderCaptured {
        reminder_id: String,
        target_time: DateTime<Utc>,
        /// Background materialization of a recurring instance.
        recurring: bool,
        at: DateTime<Utc>,
    },
    ReminderCompleted {
        reminder_id: String,
        on_time: bool,
        at: DateTime<Utc>,
    },
    ReminderReopened {
        reminder_id: String,
        target_time: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    ReminderPostponed {
        reminder_id: String,
        target_time: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    ReminderMissed {
        reminder_id: String,
        at: DateTime<Utc>,
    },
    ReminderRemoved {
        reminder_id: String,
        at: DateTime<Utc>,
    },
    PointsAwarded {
        amount: u32,
        reason: PointReason,
        total: u64,
        at: DateTime<Utc>,
    },
    LevelUp {
        level: u32,
        at: DateTime<Utc>,
    },
    StreakMilestone {
        streak: u32,
        bonus: u32,
        at: DateTime<Utc>,
    },
    AchievementUnlocked {
        achievement_id: String,
        reward: u32,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn toast(kind: ToastKind, message: ToastMessage, at: DateTime<Utc>) -> Self {
        Event::Toast {
            kind,
            message,
            icon: None,
            points: None,
            at,
        }
    }

    pub fn is_toast(&self) -> bool {
        matches!(self, Event::Toast { .. })
    }
}
