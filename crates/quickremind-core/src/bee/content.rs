use serde::{Deserialize, Serialize};

use crate::gateway::NotificationContent;

/// Escalation tier of a bee notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeeStage {
    Nudge,
    StillNotDone,
    HourPassed,
    TwoHours,
    LastChance,
}

impl BeeStage {
    /// Tier for a ladder position. Positions past the fourth stay at the top tier.
    pub fn for_index(index: usize) -> Self {
        match index {
            0 => BeeStage::Nudge,
            1 => BeeStage::StillNotDone,
            2 => BeeStage::HourPassed,
            _ => BeeStage::TwoHours,
        }
    }
}

const UNTITLED: &str = "Reminder";

pub fn stage_content(stage: BeeStage, text: Option<&str>, minutes: u32) -> NotificationContent {
    let text = text.filter(|t| !t.is_empty()).unwrap_or(UNTITLED);
    let (title, body) = match stage {
        BeeStage::Nudge => (
            format!("🐝 Reminder: {text}"),
            format!("{minutes} min have passed"),
        ),
        BeeStage::StillNotDone => (
            format!("🐝 Still not done: {text}"),
            format!("Already {minutes} min"),
        ),
        BeeStage::HourPassed => (
            format!("🐝 An hour passed! {text}"),
            "Finish it to keep your streak 🔥".to_string(),
        ),
        BeeStage::TwoHours => (
            format!("🐝🐝 Seriously? {text}"),
            "Two hours of waiting!".to_string(),
        ),
        BeeStage::LastChance => ("🐝 🌙 Last chance today".to_string(), text.to_string()),
    };
    NotificationContent { title, body }
}
