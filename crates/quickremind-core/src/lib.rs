//! # QuickRemind Core Library
//!
//! Scheduling and recurrence engine behind QuickRemind: one-tap reminders,
//! recurring tasks, the escalating "bee mode" follow-ups, and the points and
//! streak bookkeeping that rewards finishing things on time.
//!
//! ## Architecture
//!
//! - **State**: [`SchedulerState`] owns every reminder, command, task and
//!   stat. Operations are synchronous methods; side effects reach the host
//!   through an [`Event`] outbox and an injected [`NotificationGateway`].
//! - **Time**: all instants are UTC; calendar days and wall-clock times are
//!   resolved in the configured IANA time zone. A [`Clock`] is injected so
//!   tests control "now".
//! - **Storage**: the state persists as a single JSON [`Snapshot`] through a
//!   [`SnapshotStore`]; engine settings live in a TOML [`EngineConfig`].
//! - **Runtime**: [`runtime::spawn_maintenance`] drives periodic expiry and
//!   recurring generation on tokio.
//!
//! ## Key Components
//!
//! - [`next_occurrence`]: recurrence arithmetic
//! - [`bee::plan_ladder`]: bee-mode trigger planning
//! - [`GamificationLedger`]: points, levels, streaks, achievements

pub mod bee;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod gamification;
pub mod gateway;
pub mod recurrence;
pub mod recurring;
pub mod reminder;
pub mod runtime;
pub mod state;
pub mod storage;
pub mod time;

pub use bee::{BeeModeSettings, BeeStage, BeeTrigger};
pub use clock::{Clock, ManualClock, SystemClock};
pub use commands::{Category, CommandDraft, CommandPatch, QuickCommand, TimeOption};
pub use config::EngineConfig;
pub use error::{ConfigError, CoreError, Rejection, Result};
pub use events::{Event, PointReason, ToastKind, ToastMessage};
pub use gamification::{DailyStats, GamificationLedger, UserStats};
pub use gateway::{
    MemoryGateway, NotificationContent, NotificationGateway, NotificationHandle, Permission,
    TimerGateway,
};
pub use recurrence::{next_occurrence, IntervalUnit, MonthDay, RecurrenceRule};
pub use recurring::{RecurringStats, RecurringTask, RecurringTaskDraft, RecurringTaskPatch};
pub use reminder::{CaptureRequest, CaptureTime, Reminder, ReminderStatus};
pub use state::{AppSettings, SchedulerState, Snapshot, TickSummary};
pub use storage::{JsonFileStore, MemoryStore, SnapshotStore};
pub use time::ClockTime;
