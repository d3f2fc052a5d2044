//! Reminders: data model and capture requests.
//!
//! The state machine itself lives in [`lifecycle`]:
//!
//! ```text
//!            complete            expire
//! pending ─────────────▶ completed     pending ──────▶ missed
//!    ▲  │◀──────────────────┘
//!    │  │     reopen
//!    └──┘ postpone
//! ```
//!
//! `remove` deletes a reminder in any status.

mod lifecycle;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::gateway::{NotificationContent, NotificationHandle};

pub(crate) const DEFAULT_ICON: &str = "⏰";
const UNTITLED: &str = "Reminder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Completed,
    Missed,
    /// Only found in older snapshots; treated as terminal.
    Cancelled,
}

/// A single scheduled alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    /// `None` means untitled.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub target_time: DateTime<Utc>,
    /// Local calendar day of `target_time`.
    pub target_date: NaiveDate,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub status: ReminderStatus,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on_time: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_command_id: Option<String>,
    #[serde(default)]
    pub bee_mode_enabled: bool,
    /// Live bee handles. Empty unless pending with bee mode on.
    #[serde(default)]
    pub bee_notification_ids: Vec<NotificationHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_task_id: Option<String>,
    #[serde(default)]
    pub is_recurring_instance: bool,
    /// Handle of the at-target-time notification.
    #[serde(default)]
    pub notification_id: Option<NotificationHandle>,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

impl Reminder {
    pub fn is_pending(&self) -> bool {
        self.status == ReminderStatus::Pending
    }

    /// The recurring task this reminder was generated from, if any.
    pub fn recurring_task(&self) -> Option<&str> {
        if self.is_recurring_instance {
            self.recurring_task_id.as_deref()
        } else {
            None
        }
    }

    pub fn title(&self) -> &str {
        self.text.as_deref().unwrap_or(UNTITLED)
    }
}

/// Content of the primary notification fired at the target time.
pub fn primary_content(text: Option<&str>) -> NotificationContent {
    NotificationContent {
        title: text.filter(|t| !t.is_empty()).unwrap_or(UNTITLED).to_string(),
        body: "It's time!".to_string(),
    }
}

/// When a captured reminder should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTime {
    InMinutes(i64),
    At(DateTime<Utc>),
}

/// A user's "remind me" intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub text: Option<String>,
    pub note: Option<String>,
    pub icon: Option<String>,
    pub when: CaptureTime,
    /// Overrides the global bee-mode default.
    pub bee_mode: Option<bool>,
    pub source_command_id: Option<String>,
    /// When the user started typing, for the speed achievement.
    pub started_at: Option<DateTime<Utc>>,
}

impl CaptureRequest {
    pub fn new(text: impl Into<String>, when: CaptureTime) -> Self {
        Self {
            text: Some(text.into()),
            note: None,
            icon: None,
            when,
            bee_mode: None,
            source_command_id: None,
            started_at: None,
        }
    }

    pub fn in_minutes(text: impl Into<String>, minutes: i64) -> Self {
        Self::new(text, CaptureTime::InMinutes(minutes))
    }

    pub fn at(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(text, CaptureTime::At(at))
    }

    pub fn untitled(when: CaptureTime) -> Self {
        Self {
            text: None,
            ..Self::new("", when)
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_bee_mode(mut self, enabled: bool) -> Self {
        self.bee_mode = Some(enabled);
        self
    }

    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }
}

/// Trim and cap free text; blank becomes `None`.
pub(crate) fn normalize_text(text: Option<&str>, max_chars: usize) -> Option<String> {
    let trimmed = text?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_chars).collect::<String>().trim_end().to_string())
}
