//! Quick commands: one-tap reminder templates grouped into categories.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::events::{PointReason, ToastKind, ToastMessage};
use crate::reminder::{CaptureRequest, CaptureTime, Reminder};
use crate::state::SchedulerState;
use crate::time::{at_local, ClockTime};

/// Id prefix reserved for built-in commands.
pub const BUILTIN_PREFIX: &str = "cmd_";

/// One selectable time on a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimeOption {
    /// Minutes from now.
    Relative {
        value: u32,
        #[serde(default)]
        label: String,
    },
    /// Next occurrence of a wall-clock time.
    Absolute {
        value: ClockTime,
        #[serde(default)]
        label: String,
    },
}

impl TimeOption {
    pub fn relative(minutes: u32) -> Self {
        let label = if minutes >= 60 && minutes % 60 == 0 {
            format!("+{} h", minutes / 60)
        } else {
            format!("+{minutes} min")
        };
        TimeOption::Relative {
            value: minutes,
            label,
        }
    }

    pub fn absolute(time: ClockTime) -> Self {
        TimeOption::Absolute {
            value: time,
            label: time.to_string(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TimeOption::Relative { label, .. } | TimeOption::Absolute { label, .. } => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCommand {
    pub id: String,
    pub icon: String,
    pub name: String,
    pub category_id: String,
    pub time_options: Vec<TimeOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub usage_count: u32,
}

impl QuickCommand {
    pub fn is_builtin(&self) -> bool {
        self.id.starts_with(BUILTIN_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub order: u32,
}

/// Fields the user provides for a new command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDraft {
    pub icon: String,
    pub name: String,
    pub category_id: String,
    pub time_options: Vec<TimeOption>,
    pub note: Option<String>,
}

/// Partial update; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPatch {
    pub icon: Option<String>,
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub time_options: Option<Vec<TimeOption>>,
    pub note: Option<Option<String>>,
}

fn builtin(
    id: &str,
    icon: &str,
    name: &str,
    category_id: &str,
    time_options: Vec<TimeOption>,
    created_at: DateTime<Utc>,
) -> QuickCommand {
    QuickCommand {
        id: format!("{BUILTIN_PREFIX}{id}"),
        icon: icon.to_string(),
        name: name.to_string(),
        category_id: category_id.to_string(),
        time_options,
        note: None,
        created_at,
        usage_count: 0,
    }
}

/// Commands every new install starts with.
pub fn builtin_commands(created_at: DateTime<Utc>) -> Vec<QuickCommand> {
    use TimeOption as T;
    let at = |h, m| T::absolute(ClockTime::hm(h, m));
    vec![
        builtin(
            "vitamins",
            "💊",
            "Take vitamins",
            "daily",
            vec![at(9, 0), at(14, 0), at(21, 0)],
            created_at,
        ),
        builtin(
            "water",
            "💧",
            "Drink water",
            "daily",
            vec![T::relative(30), T::relative(60), T::relative(120)],
            created_at,
        ),
        builtin(
            "call",
            "📞",
            "Make a call",
            "work",
            vec![T::relative(15), T::relative(30), T::relative(60)],
            created_at,
        ),
        builtin(
            "email",
            "📧",
            "Check email",
            "work",
            vec![T::relative(60), T::relative(120), at(17, 0)],
            created_at,
        ),
        builtin(
            "laundry",
            "🧺",
            "Check the laundry",
            "home",
            vec![T::relative(30), T::relative(45), T::relative(60)],
            created_at,
        ),
        builtin(
            "exercise",
            "🏃",
            "Workout",
            "health",
            vec![at(7, 0), at(18, 0), at(20, 0)],
            created_at,
        ),
    ]
}

pub fn builtin_categories() -> Vec<Category> {
    [
        ("daily", "Daily", "☀️"),
        ("work", "Work", "💼"),
        ("home", "Home", "🏠"),
        ("health", "Health", "❤️"),
        ("personal", "Personal", "👤"),
    ]
    .into_iter()
    .enumerate()
    .map(|(order, (id, name, icon))| Category {
        id: id.to_string(),
        name: name.to_string(),
        icon: Some(icon.to_string()),
        order: order as u32,
    })
    .collect()
}

impl SchedulerState {
    fn command_index(&self, id: &str) -> Option<usize> {
        self.data.commands.iter().position(|c| c.id == id)
    }

    fn validate_time_options(&self, options: &[TimeOption]) -> Result<(), Rejection> {
        let limit = self.config.limits.max_time_options;
        if options.is_empty() || options.len() > limit {
            return Err(Rejection::InvalidTimeOptions { limit });
        }
        Ok(())
    }

    /// Currently selected time option for a command (defaults to the first).
    pub fn selected_time(&self, command_id: &str) -> usize {
        self.selected_times.get(command_id).copied().unwrap_or(0)
    }

    pub fn select_command_time(&mut self, command_id: &str, index: usize) -> Result<(), Rejection> {
        let Some(idx) = self.command_index(command_id) else {
            return Err(Rejection::UnknownCommand(command_id.to_string()));
        };
        if index >= self.data.commands[idx].time_options.len() {
            return Err(Rejection::UnknownTimeOption {
                command_id: command_id.to_string(),
                index,
            });
        }
        self.selected_times.insert(command_id.to_string(), index);
        Ok(())
    }

    /// Capture a reminder from a command at its selected time option.
    ///
    /// Absolute times that already passed today roll over to tomorrow.
    /// Usage count and the command point award only apply when the
    /// capture itself succeeds.
    pub fn execute_command(&mut self, command_id: &str) -> Result<Reminder, Rejection> {
        let Some(idx) = self.command_index(command_id) else {
            let rejection = Rejection::UnknownCommand(command_id.to_string());
            return Err(self.reject(rejection));
        };
        let index = self.selected_time(command_id);
        let command = self.data.commands[idx].clone();
        let Some(option) = command.time_options.get(index) else {
            let rejection = Rejection::UnknownTimeOption {
                command_id: command_id.to_string(),
                index,
            };
            return Err(self.reject(rejection));
        };

        let when = match option {
            TimeOption::Relative { value, .. } => CaptureTime::InMinutes(i64::from(*value)),
            TimeOption::Absolute { value, .. } => CaptureTime::At(self.next_wall_clock(*value)),
        };

        let mut request =
            CaptureRequest::new(command.name.clone(), when).with_icon(command.icon.clone());
        request.note = command.note.clone();
        request.source_command_id = Some(command.id.clone());

        let reminder = self.create_user_reminder(request)?;

        if let Some(cmd) = self.data.commands.get_mut(idx) {
            cmd.usage_count += 1;
        }
        let points = self.config.points.use_quick_command;
        self.add_points(points, PointReason::QuickCommandUsed);
        tracing::debug!(command_id, reminder_id = %reminder.id, "quick command executed");
        self.persist();
        Ok(reminder)
    }

    /// Next instant showing `time` on the local wall clock, strictly after now.
    fn next_wall_clock(&self, time: ClockTime) -> DateTime<Utc> {
        let now = self.now();
        let today = self.local_date(now);
        let candidate = at_local(&self.tz, today, time)
            .map(|t| t.with_timezone(&Utc))
            .filter(|t| *t > now);
        match candidate {
            Some(t) => t,
            None => today
                .succ_opt()
                .and_then(|tomorrow| at_local(&self.tz, tomorrow, time))
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or(now + Duration::days(1)),
        }
    }

    pub fn add_command(&mut self, draft: CommandDraft) -> Result<String, Rejection> {
        let limit = self.config.limits.max_commands;
        if self.data.commands.len() >= limit {
            return Err(self.reject(Rejection::TooManyCommands { limit }));
        }
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(self.reject(Rejection::EmptyName));
        }
        if let Err(rejection) = self.validate_time_options(&draft.time_options) {
            return Err(self.reject(rejection));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let command = QuickCommand {
            id: id.clone(),
            icon: draft.icon,
            name: name.to_string(),
            category_id: draft.category_id,
            time_options: draft.time_options,
            note: draft.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            created_at: self.now(),
            usage_count: 0,
        };
        self.data.commands.push(command);

        let points = self.config.points.create_quick_command;
        self.add_points(points, PointReason::QuickCommandCreated);
        self.check_achievements();
        self.toast(ToastKind::Success, ToastMessage::CommandCreated, Some("⚡"), Some(points));
        tracing::debug!(command_id = %id, "quick command created");
        self.persist();
        Ok(id)
    }

    /// Returns `Ok(false)` when no such command exists.
    pub fn update_command(&mut self, id: &str, patch: CommandPatch) -> Result<bool, Rejection> {
        let Some(idx) = self.command_index(id) else {
            return Ok(false);
        };
        let name = match patch.name.as_deref().map(str::trim) {
            Some("") => return Err(self.reject(Rejection::EmptyName)),
            other => other.map(str::to_string),
        };
        if let Some(options) = &patch.time_options {
            if let Err(rejection) = self.validate_time_options(options) {
                return Err(self.reject(rejection));
            }
        }

        let command = &mut self.data.commands[idx];
        if let Some(name) = name {
            command.name = name;
        }
        if let Some(icon) = patch.icon {
            command.icon = icon;
        }
        if let Some(category_id) = patch.category_id {
            command.category_id = category_id;
        }
        if let Some(options) = patch.time_options {
            command.time_options = options;
            let len = command.time_options.len();
            if self.selected_times.get(id).is_some_and(|i| *i >= len) {
                self.selected_times.remove(id);
            }
        }
        if let Some(note) = patch.note {
            command.note = note;
        }
        self.persist();
        Ok(true)
    }

    pub fn delete_command(&mut self, id: &str) -> bool {
        let Some(idx) = self.command_index(id) else {
            return false;
        };
        self.data.commands.remove(idx);
        self.selected_times.remove(id);
        self.persist();
        true
    }

    pub fn add_category(&mut self, name: &str, icon: Option<&str>) -> Result<String, Rejection> {
        let limit = self.config.limits.max_categories;
        if self.data.categories.len() >= limit {
            return Err(self.reject(Rejection::TooManyCategories { limit }));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(self.reject(Rejection::EmptyName));
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.data.categories.push(Category {
            id: id.clone(),
            name: name.to_string(),
            icon: icon.map(str::to_string),
            order: self.data.categories.len() as u32,
        });
        self.persist();
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::config::EngineConfig;
    use crate::events::Event;
    use crate::gateway::MemoryGateway;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn state_at(h: u32, m: u32) -> (SchedulerState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 10, h, m, 0).unwrap(),
        ));
        let state = SchedulerState::new(EngineConfig::default(), clock.clone(), MemoryGateway::new())
            .unwrap();
        (state, clock)
    }

    fn draft(name: &str, options: Vec<TimeOption>) -> CommandDraft {
        CommandDraft {
            icon: "📚".into(),
            name: name.into(),
            category_id: "personal".into(),
            time_options: options,
            note: None,
        }
    }

    #[test]
    fn builtins_use_reserved_prefix() {
        let commands = builtin_commands(Utc::now());
        assert!(commands.iter().all(QuickCommand::is_builtin));
        assert!(commands.iter().all(|c| !c.time_options.is_empty()));
    }

    #[test]
    fn time_option_json_shape() {
        let json = serde_json::to_value(TimeOption::relative(60)).unwrap();
        assert_eq!(json["type"], "relative");
        assert_eq!(json["value"], 60);
        assert_eq!(json["label"], "+1 h");

        let opt: TimeOption =
            serde_json::from_str(r#"{"type":"absolute","value":"09:30","label":"09:30"}"#).unwrap();
        assert_eq!(opt, TimeOption::absolute(ClockTime::hm(9, 30)));
    }

    #[test]
    fn execute_relative_command() {
        let (mut state, clock) = state_at(10, 0);
        state.select_command_time("cmd_water", 1).unwrap();
        let reminder = state.execute_command("cmd_water").unwrap();

        assert_eq!(reminder.target_time, clock.now() + Duration::minutes(60));
        assert_eq!(reminder.source_command_id.as_deref(), Some("cmd_water"));
        assert_eq!(reminder.text.as_deref(), Some("Drink water"));
        let cmd = state.commands().iter().find(|c| c.id == "cmd_water").unwrap();
        assert_eq!(cmd.usage_count, 1);
        // Capture (1) plus command use (1), plus first_capture reward (5).
        assert_eq!(state.ledger().user_stats.total_cp, 7);
    }

    #[test]
    fn absolute_time_rolls_to_tomorrow_when_passed() {
        let (mut state, _) = state_at(10, 0);
        // First option of cmd_vitamins is 09:00.
        let reminder = state.execute_command("cmd_vitamins").unwrap();
        assert_eq!(
            reminder.target_time,
            Utc.with_ymd_and_hms(2025, 6, 11, 9, 0, 0).unwrap()
        );

        state.select_command_time("cmd_vitamins", 1).unwrap();
        let later = state.execute_command("cmd_vitamins").unwrap();
        assert_eq!(
            later.target_time,
            Utc.with_ymd_and_hms(2025, 6, 10, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn unknown_command_and_option_are_rejected() {
        let (mut state, _) = state_at(10, 0);
        assert_eq!(
            state.execute_command("cmd_nope"),
            Err(Rejection::UnknownCommand("cmd_nope".into()))
        );
        assert!(matches!(
            state.select_command_time("cmd_water", 9),
            Err(Rejection::UnknownTimeOption { index: 9, .. })
        ));
        assert_eq!(state.selected_time("cmd_water"), 0);
    }

    #[test]
    fn failed_capture_does_not_count_usage() {
        let mut config = EngineConfig::default();
        config.limits.max_pending_reminders = 1;
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 10, 10, 0, 0).unwrap());
        let mut state = SchedulerState::new(config, clock, MemoryGateway::new()).unwrap();

        state.execute_command("cmd_call").unwrap();
        let err = state.execute_command("cmd_call").unwrap_err();
        assert_eq!(err, Rejection::TooManyReminders { limit: 1 });
        let cmd = state.commands().iter().find(|c| c.id == "cmd_call").unwrap();
        assert_eq!(cmd.usage_count, 1);
    }

    #[test]
    fn add_command_validates_and_rewards() {
        let (mut state, _) = state_at(10, 0);
        assert_eq!(
            state.add_command(draft("  ", vec![TimeOption::relative(5)])),
            Err(Rejection::EmptyName)
        );
        assert_eq!(
            state.add_command(draft("Read", vec![])),
            Err(Rejection::InvalidTimeOptions { limit: 4 })
        );
        let five = (1..=5).map(TimeOption::relative).collect();
        assert!(state.add_command(draft("Read", five)).is_err());

        state.drain_events();
        let id = state.add_command(draft(" Read ", vec![TimeOption::relative(20)])).unwrap();
        let cmd = state.commands().iter().find(|c| c.id == id).unwrap();
        assert_eq!(cmd.name, "Read");
        assert!(!cmd.is_builtin());
        assert_eq!(state.ledger().user_stats.total_cp, 5);
        assert!(state.drain_events().iter().any(|e| matches!(
            e,
            Event::Toast {
                message: ToastMessage::CommandCreated,
                ..
            }
        )));
    }

    #[test]
    fn fifth_user_command_unlocks_creator_achievement() {
        let (mut state, _) = state_at(10, 0);
        for i in 0..5 {
            state
                .add_command(draft(&format!("Cmd {i}"), vec![TimeOption::relative(10)]))
                .unwrap();
        }
        assert!(state.ledger().user_stats.has_achievement("command_creator_5"));
    }

    #[test]
    fn command_capacity_is_enforced() {
        let mut config = EngineConfig::default();
        config.limits.max_commands = 6;
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 10, 10, 0, 0).unwrap());
        let mut state = SchedulerState::new(config, clock, MemoryGateway::new()).unwrap();
        assert_eq!(
            state.add_command(draft("Extra", vec![TimeOption::relative(10)])),
            Err(Rejection::TooManyCommands { limit: 6 })
        );
    }

    #[test]
    fn update_and_delete_command() {
        let (mut state, _) = state_at(10, 0);
        state.select_command_time("cmd_email", 2).unwrap();
        let patch = CommandPatch {
            name: Some("Inbox zero".into()),
            time_options: Some(vec![TimeOption::relative(15)]),
            ..Default::default()
        };
        assert_eq!(state.update_command("cmd_email", patch), Ok(true));
        assert_eq!(state.selected_time("cmd_email"), 0);
        assert_eq!(
            state.update_command("missing", CommandPatch::default()),
            Ok(false)
        );
        assert_eq!(
            state.update_command(
                "cmd_email",
                CommandPatch {
                    name: Some(" ".into()),
                    ..Default::default()
                }
            ),
            Err(Rejection::EmptyName)
        );

        assert!(state.delete_command("cmd_email"));
        assert!(!state.delete_command("cmd_email"));
    }

    #[test]
    fn categories_are_capped() {
        let (mut state, _) = state_at(10, 0);
        for i in 0..5 {
            let id = state.add_category(&format!("Cat {i}"), None).unwrap();
            let cat = state.categories().iter().find(|c| c.id == id).unwrap();
            assert_eq!(cat.order as usize, 5 + i);
        }
        assert_eq!(
            state.add_category("One too many", None),
            Err(Rejection::TooManyCategories { limit: 10 })
        );
    }
}
