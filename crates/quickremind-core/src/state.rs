//! Scheduler state: the single owner of every reminder, task, command and
//! statistic.
//!
//! Each public operation is a synchronous transaction. Notification
//! scheduling, statistics, streak and achievement updates all finish
//! before the call returns, and the new snapshot is written through to the
//! attached [`SnapshotStore`] (if any). Observable outcomes are appended to
//! an outbox the host drains with [`SchedulerState::drain_events`].
//!
//! ## Usage
//!
//! ```ignore
//! let store = JsonFileStore::open_default()?;
//! let mut state = SchedulerState::open(EngineConfig::load()?, SystemClock, gateway, store)?;
//! state.create_user_reminder(CaptureRequest::in_minutes("Tea", 15))?;
//! // Every minute or so:
//! state.tick();
//! for event in state.drain_events() { /* render */ }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::bee::BeeModeSettings;
use crate::clock::Clock;
use crate::commands::{builtin_categories, builtin_commands, Category, QuickCommand};
use crate::config::EngineConfig;
use crate::error::{ConfigError, Rejection, Result};
use crate::events::{Event, PointReason, ToastKind, ToastMessage};
use crate::gamification::{GamificationLedger, Tally};
use crate::gateway::NotificationGateway;
use crate::recurring::RecurringTask;
use crate::reminder::{Reminder, ReminderStatus};
use crate::storage::SnapshotStore;

/// Display preferences carried in the snapshot for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub notification_sound: bool,
    pub vibration_enabled: bool,
    pub dark_mode: bool,
    pub language: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            notification_sound: true,
            vibration_enabled: true,
            dark_mode: false,
            language: "en".to_string(),
        }
    }
}

/// Everything that survives a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default = "default_commands")]
    pub commands: Vec<QuickCommand>,
    #[serde(default = "builtin_categories")]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub recurring_tasks: Vec<RecurringTask>,
    #[serde(flatten)]
    pub ledger: GamificationLedger,
    #[serde(default)]
    pub settings: AppSettings,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub bee_mode_settings: BeeModeSettings,
}

fn default_commands() -> Vec<QuickCommand> {
    builtin_commands(DateTime::<Utc>::UNIX_EPOCH)
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            reminders: Vec::new(),
            commands: default_commands(),
            categories: builtin_categories(),
            recurring_tasks: Vec::new(),
            ledger: GamificationLedger::default(),
            settings: AppSettings::default(),
            is_premium: false,
            bee_mode_settings: BeeModeSettings::default(),
        }
    }
}

impl Snapshot {
    /// First-run state.
    pub fn fresh(config: &EngineConfig, now: DateTime<Utc>) -> Self {
        let mut bee_mode_settings = config.bee_defaults.clone();
        bee_mode_settings.normalize();
        Self {
            commands: builtin_commands(now),
            bee_mode_settings,
            ..Self::default()
        }
    }
}

/// What one [`SchedulerState::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub expired: usize,
    pub generated: usize,
}

pub struct SchedulerState {
    pub(crate) config: EngineConfig,
    pub(crate) tz: Tz,
    clock: Box<dyn Clock>,
    pub(crate) gateway: Box<dyn NotificationGateway>,
    store: Option<Box<dyn SnapshotStore>>,
    pub(crate) events: Vec<Event>,
    pub(crate) data: Snapshot,
    /// Per-command selected time option. Not persisted.
    pub(crate) selected_times: HashMap<String, usize>,
}

impl std::fmt::Debug for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerState")
            .field("tz", &self.tz)
            .field("reminders", &self.data.reminders.len())
            .field("recurring_tasks", &self.data.recurring_tasks.len())
            .field("pending_events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl SchedulerState {
    fn build(
        config: EngineConfig,
        clock: Box<dyn Clock>,
        gateway: Box<dyn NotificationGateway>,
        data: Snapshot,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tz = config.tz()?;
        Ok(Self {
            config,
            tz,
            clock,
            gateway,
            store: None,
            events: Vec::new(),
            data,
            selected_times: HashMap::new(),
        })
    }

    /// Fresh state with built-in commands and categories, no store.
    pub fn new<C, G>(config: EngineConfig, clock: C, gateway: G) -> Result<Self, ConfigError>
    where
        C: Clock + 'static,
        G: NotificationGateway + 'static,
    {
        let data = Snapshot::fresh(&config, clock.now());
        Self::build(config, Box::new(clock), Box::new(gateway), data)
    }

    /// Rebuild from a snapshot and reconcile it with the current time.
    ///
    /// No timers survive a restart, so every handle in the snapshot is
    /// stale. Past-due pending reminders are swept to missed, surviving
    /// ones get a fresh primary notification (delivered at once when the
    /// target already passed) and a freshly planned bee ladder, then
    /// today's recurring instances are generated.
    pub fn restore<C, G>(
        config: EngineConfig,
        clock: C,
        gateway: G,
        snapshot: Snapshot,
    ) -> Result<Self, ConfigError>
    where
        C: Clock + 'static,
        G: NotificationGateway + 'static,
    {
        let mut state = Self::build(config, Box::new(clock), Box::new(gateway), snapshot)?;
        state.rehydrate();
        Ok(state)
    }

    /// Load from `store` (or start fresh if it is empty) and keep writing
    /// through to it.
    pub fn open<C, G, S>(config: EngineConfig, clock: C, gateway: G, store: S) -> Result<Self>
    where
        C: Clock + 'static,
        G: NotificationGateway + 'static,
        S: SnapshotStore + 'static,
    {
        let loaded = store.load()?;
        let mut state = match loaded {
            Some(snapshot) => Self::build(config, Box::new(clock), Box::new(gateway), snapshot)?,
            None => {
                tracing::info!("no snapshot found, starting fresh");
                Self::new(config, clock, gateway)?
            }
        };
        state.store = Some(Box::new(store));
        state.rehydrate();
        Ok(state)
    }

    /// Attach a store. The current snapshot is written immediately.
    pub fn with_store<S: SnapshotStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Box::new(store));
        self.persist();
        self
    }

    fn rehydrate(&mut self) {
        self.data.bee_mode_settings.normalize();
        for reminder in &mut self.data.reminders {
            reminder.notification_id = None;
            reminder.bee_notification_ids.clear();
        }
        self.sort_reminders();

        let expired = self.clear_expired();

        let pending: Vec<usize> = self
            .data
            .reminders
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_pending())
            .map(|(i, _)| i)
            .collect();
        for &idx in &pending {
            self.schedule_primary(idx);
            self.arm_bee(idx);
        }

        let generated = self.generate_for_today();
        tracing::info!(
            reminders = self.data.reminders.len(),
            rescheduled = pending.len(),
            expired,
            generated,
            "state rehydrated"
        );
        self.persist();
    }

    /// Periodic maintenance: sweep expired reminders and materialize
    /// today's recurring instances.
    pub fn tick(&mut self) -> TickSummary {
        TickSummary {
            expired: self.clear_expired(),
            generated: self.generate_for_today(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn snapshot(&self) -> Snapshot {
        self.data.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Today's calendar date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        self.local_date(self.now())
    }

    pub(crate) fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.tz).date_naive()
    }

    /// Reminders sorted by target time.
    pub fn reminders(&self) -> &[Reminder] {
        &self.data.reminders
    }

    pub fn reminder(&self, id: &str) -> Option<&Reminder> {
        self.data.reminders.iter().find(|r| r.id == id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Reminder> {
        self.data.reminders.iter().filter(|r| r.is_pending())
    }

    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    pub fn recurring_tasks(&self) -> &[RecurringTask] {
        &self.data.recurring_tasks
    }

    pub fn recurring_task(&self, id: &str) -> Option<&RecurringTask> {
        self.data.recurring_tasks.iter().find(|t| t.id == id)
    }

    pub fn commands(&self) -> &[QuickCommand] {
        &self.data.commands
    }

    pub fn categories(&self) -> &[Category] {
        &self.data.categories
    }

    pub fn ledger(&self) -> &GamificationLedger {
        &self.data.ledger
    }

    pub fn bee_settings(&self) -> &BeeModeSettings {
        &self.data.bee_mode_settings
    }

    pub fn settings(&self) -> &AppSettings {
        &self.data.settings
    }

    pub fn update_settings(&mut self, settings: AppSettings) {
        self.data.settings = settings;
        self.persist();
    }

    pub fn is_premium(&self) -> bool {
        self.data.is_premium
    }

    pub fn set_premium(&mut self, premium: bool) {
        self.data.is_premium = premium;
        self.persist();
    }

    /// Mutable access for hosts and tests that need to seed statistics.
    pub fn ledger_mut(&mut self) -> &mut GamificationLedger {
        &mut self.data.ledger
    }

    // ── ledger plumbing ────────────────────────────────────────────────

    fn tally(&mut self) -> (&mut GamificationLedger, Tally<'_>) {
        let now = self.clock.now();
        let today = now.with_timezone(&self.tz).date_naive();
        (
            &mut self.data.ledger,
            Tally {
                config: &self.config,
                today,
                now,
                events: &mut self.events,
            },
        )
    }

    /// Commands created by the user; built-ins carry a `cmd_` prefix.
    pub(crate) fn user_command_count(&self) -> usize {
        self.data
            .commands
            .iter()
            .filter(|c| !c.is_builtin())
            .count()
    }

    /// Grant points for today.
    pub fn add_points(&mut self, amount: u32, reason: PointReason) {
        let (ledger, mut tally) = self.tally();
        ledger.add_points(&mut tally, amount, reason);
    }

    pub fn update_streak(&mut self) {
        let (ledger, mut tally) = self.tally();
        ledger.update_streak(&mut tally);
    }

    /// Unlock newly satisfied achievements and return their ids.
    pub fn check_achievements(&mut self) -> Vec<&'static str> {
        let user_commands = self.user_command_count();
        let (ledger, mut tally) = self.tally();
        ledger.check_achievements(&mut tally, user_commands)
    }

    // ── outbox ─────────────────────────────────────────────────────────

    pub(crate) fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn toast(
        &mut self,
        kind: ToastKind,
        message: ToastMessage,
        icon: Option<&str>,
        points: Option<u32>,
    ) {
        let at = self.now();
        self.events.push(Event::Toast {
            kind,
            message,
            icon: icon.map(str::to_string),
            points,
            at,
        });
    }

    /// Surface a rejection as a toast and hand it back.
    pub(crate) fn reject(&mut self, rejection: Rejection) -> Rejection {
        tracing::debug!(%rejection, "intent rejected");
        let event = Event::toast(rejection.toast_kind(), rejection.toast_message(), self.now());
        self.push_event(event);
        rejection
    }

    // ── persistence ────────────────────────────────────────────────────

    /// Write the snapshot through to the store. Failures are logged.
    pub(crate) fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(&self.data) {
            tracing::warn!(error = %e, "failed to persist snapshot");
        }
    }

    pub(crate) fn sort_reminders(&mut self) {
        self.data.reminders.sort_by_key(|r| r.target_time);
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.data.reminders.iter().position(|r| r.id == id)
    }

    pub(crate) fn index_with_status(&self, id: &str, status: ReminderStatus) -> Option<usize> {
        self.index_of(id)
            .filter(|&idx| self.data.reminders[idx].status == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::gateway::MemoryGateway;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn fresh_state_has_builtins() {
        let state = SchedulerState::new(
            EngineConfig::default(),
            ManualClock::new(t0()),
            MemoryGateway::new(),
        )
        .unwrap();
        assert!(!state.commands().is_empty());
        assert!(state.commands().iter().all(|c| c.is_builtin()));
        assert_eq!(state.categories().len(), 5);
        assert_eq!(state.user_command_count(), 0);
        assert_eq!(state.today(), NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
    }

    #[test]
    fn invalid_timezone_fails_construction() {
        let config = EngineConfig {
            timezone: "Nowhere/Special".into(),
            ..Default::default()
        };
        let err = SchedulerState::new(config, ManualClock::new(t0()), MemoryGateway::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTimezone(_)));
    }

    #[test]
    fn today_uses_configured_timezone() {
        let config = EngineConfig {
            timezone: "Pacific/Auckland".into(),
            ..Default::default()
        };
        let late = Utc.with_ymd_and_hms(2025, 6, 10, 20, 0, 0).unwrap();
        let state =
            SchedulerState::new(config, ManualClock::new(late), MemoryGateway::new()).unwrap();
        assert_eq!(state.today(), NaiveDate::from_ymd_opt(2025, 6, 11).unwrap());
    }

    #[test]
    fn rejection_is_mirrored_as_plain_toast() {
        let mut state = SchedulerState::new(
            EngineConfig::default(),
            ManualClock::new(t0()),
            MemoryGateway::new(),
        )
        .unwrap();
        let rejection = state.reject(Rejection::TooSoon { minutes: 0, min: 1 });
        let events = state.drain_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Toast {
                kind,
                message,
                icon,
                points,
                at,
            } => {
                assert_eq!(*kind, rejection.toast_kind());
                assert_eq!(*message, rejection.toast_message());
                assert!(icon.is_none());
                assert!(points.is_none());
                assert_eq!(*at, t0());
            }
            other => panic!("expected a toast, got {other:?}"),
        }
    }

    #[test]
    fn empty_json_snapshot_takes_defaults() {
        let snapshot: Snapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.reminders.is_empty());
        assert_eq!(snapshot.commands.len(), builtin_commands(t0()).len());
        assert_eq!(snapshot.ledger.user_stats.level, 1);
        assert!(snapshot.bee_mode_settings.enabled);
        assert!(!snapshot.is_premium);
    }

    #[test]
    fn snapshot_keys_are_camel_case_and_flat() {
        let json = serde_json::to_value(Snapshot::default()).unwrap();
        for key in [
            "reminders",
            "commands",
            "categories",
            "recurringTasks",
            "dailyStats",
            "userStats",
            "settings",
            "isPremium",
            "beeModeSettings",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
