//! Reminder transitions.
//!
//! Two creation paths exist. [`SchedulerState::create_user_reminder`] is a
//! user capture: it awards points, advances the streak, checks achievements
//! and shows a toast. [`SchedulerState::materialize_recurring_instance`] is
//! background generation and does none of that. Both enforce the capacity
//! and minimum-distance rules and both count as a capture in the stats.
//!
//! Missing ids and transitions from the wrong status are silent no-ops
//! that return `false`.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::{
    normalize_text, primary_content, CaptureRequest, CaptureTime, Reminder, ReminderStatus,
    DEFAULT_ICON,
};
use crate::bee::{self, BeeModeSettings};
use crate::error::Rejection;
use crate::events::{Event, PointReason, ToastKind, ToastMessage};
use crate::recurring::RecurringTask;
use crate::state::SchedulerState;
use crate::time::minutes_between;

/// Upper bound for relative captures (about a century).
const MAX_CAPTURE_MINUTES: i64 = 60 * 24 * 366 * 100;

struct Draft {
    text: Option<String>,
    note: Option<String>,
    icon: String,
    target: DateTime<Utc>,
    minutes: i64,
    bee_mode: bool,
    source_command_id: Option<String>,
    recurring_task_id: Option<String>,
}

impl SchedulerState {
    // ── notification plumbing ──────────────────────────────────────────

    pub(crate) fn schedule_primary(&mut self, idx: usize) {
        let reminder = &self.data.reminders[idx];
        let content = primary_content(reminder.text.as_deref());
        let handle = self.gateway.schedule(&content, reminder.target_time);
        self.data.reminders[idx].notification_id = Some(handle);
    }

    fn bee_active(&self, reminder: &Reminder) -> bool {
        reminder.is_pending() && reminder.bee_mode_enabled && self.data.bee_mode_settings.enabled
    }

    /// Plan and schedule the bee ladder if bee mode applies.
    pub(crate) fn arm_bee(&mut self, idx: usize) {
        let reminder = &self.data.reminders[idx];
        if !self.bee_active(reminder) {
            return;
        }
        let target = reminder.target_time.with_timezone(&self.tz);
        let triggers = bee::plan_ladder(
            reminder.text.as_deref(),
            &target,
            &self.data.bee_mode_settings,
            self.now(),
        );
        let handles = bee::schedule_ladder(self.gateway.as_ref(), &triggers);
        tracing::debug!(
            reminder_id = %reminder.id,
            triggers = handles.len(),
            "bee ladder scheduled"
        );
        self.data.reminders[idx].bee_notification_ids = handles;
    }

    fn disarm_bee(&mut self, idx: usize) {
        let handles = std::mem::take(&mut self.data.reminders[idx].bee_notification_ids);
        bee::cancel_ladder(self.gateway.as_ref(), &handles);
    }

    /// Cancel the primary notification and every bee handle.
    fn disarm(&mut self, idx: usize) {
        if let Some(handle) = self.data.reminders[idx].notification_id.take() {
            self.gateway.cancel(&handle);
        }
        self.disarm_bee(idx);
    }

    fn rearm_bee_all(&mut self) {
        for idx in 0..self.data.reminders.len() {
            if self.data.reminders[idx].is_pending() {
                self.disarm_bee(idx);
                self.arm_bee(idx);
            }
        }
    }

    // ── creation ───────────────────────────────────────────────────────

    fn insert_reminder(&mut self, draft: Draft) -> Result<Reminder, Rejection> {
        let limit = self.config.limits.max_pending_reminders;
        if self.pending_count() >= limit {
            return Err(Rejection::TooManyReminders { limit });
        }
        let min = self.config.limits.min_minutes;
        if draft.minutes < min {
            return Err(Rejection::TooSoon {
                minutes: draft.minutes,
                min,
            });
        }

        let now = self.now();
        let reminder = Reminder {
            id: uuid::Uuid::new_v4().to_string(),
            text: draft.text,
            note: draft.note,
            icon: draft.icon,
            target_time: draft.target,
            target_date: self.local_date(draft.target),
            created_at: now,
            status: ReminderStatus::Pending,
            completed_at: None,
            completed_on_time: None,
            source_command_id: draft.source_command_id,
            bee_mode_enabled: draft.bee_mode,
            bee_notification_ids: Vec::new(),
            is_recurring_instance: draft.recurring_task_id.is_some(),
            recurring_task_id: draft.recurring_task_id,
            notification_id: None,
        };

        self.data.reminders.push(reminder);
        let idx = self.data.reminders.len() - 1;
        self.schedule_primary(idx);
        self.arm_bee(idx);
        let stored = self.data.reminders[idx].clone();
        self.sort_reminders();

        let today = self.today();
        self.data.ledger.record_capture(today);
        Ok(stored)
    }

    /// Capture a reminder on the user's behalf.
    ///
    /// Rejected when the pending capacity is reached or the target is less
    /// than the minimum distance away. Rejections change nothing except
    /// for a toast.
    pub fn create_user_reminder(&mut self, request: CaptureRequest) -> Result<Reminder, Rejection> {
        let now = self.now();
        let (target, minutes) = match request.when {
            CaptureTime::InMinutes(minutes) => {
                let minutes = minutes.min(MAX_CAPTURE_MINUTES);
                (now + Duration::minutes(minutes.max(0)), minutes)
            }
            CaptureTime::At(at) => (at, minutes_between(&now, &at)),
        };

        let max_len = self.config.limits.max_text_length;
        let draft = Draft {
            text: normalize_text(request.text.as_deref(), max_len),
            note: normalize_text(request.note.as_deref(), usize::MAX),
            icon: request.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            target,
            minutes,
            bee_mode: request.bee_mode.unwrap_or(self.data.bee_mode_settings.enabled),
            source_command_id: request.source_command_id,
            recurring_task_id: None,
        };

        let reminder = match self.insert_reminder(draft) {
            Ok(reminder) => reminder,
            Err(rejection) => return Err(self.reject(rejection)),
        };

        self.push_event(Event::ReminderCaptured {
            reminder_id: reminder.id.clone(),
            target_time: target,
            recurring: false,
            at: now,
        });

        if let Some(started) = request.started_at.filter(|s| *s <= now) {
            let elapsed = (now - started).num_milliseconds().max(0) as u64;
            self.data.ledger.record_capture_speed(elapsed);
        }

        let points = self.config.points.create_reminder;
        self.add_points(points, PointReason::Capture);
        self.update_streak();
        self.check_achievements();
        self.toast(
            ToastKind::Success,
            ToastMessage::CaptureSuccess { minutes },
            Some("🎯"),
            Some(points),
        );

        tracing::debug!(reminder_id = %reminder.id, target = %target, "reminder captured");
        self.persist();
        Ok(reminder)
    }

    /// Create the reminder for one occurrence of a recurring task.
    ///
    /// No toast, points, streak or achievement side effects. A rejection is
    /// logged and returned; the task's generated count only grows on
    /// success.
    pub fn materialize_recurring_instance(
        &mut self,
        task: &RecurringTask,
        target: DateTime<Utc>,
    ) -> Result<Reminder, Rejection> {
        let now = self.now();
        let max_len = self.config.limits.max_text_length;
        let draft = Draft {
            text: normalize_text(Some(&task.name), max_len),
            note: normalize_text(task.note.as_deref(), usize::MAX),
            icon: task.icon.clone(),
            target,
            minutes: minutes_between(&now, &target),
            bee_mode: task
                .bee_mode_enabled
                .unwrap_or(self.data.bee_mode_settings.enabled),
            source_command_id: None,
            recurring_task_id: Some(task.id.clone()),
        };

        let reminder = match self.insert_reminder(draft) {
            Ok(reminder) => reminder,
            Err(rejection) => {
                tracing::warn!(task_id = %task.id, %rejection, "recurring instance not generated");
                return Err(rejection);
            }
        };

        if let Some(stored) = self.data.recurring_tasks.iter_mut().find(|t| t.id == task.id) {
            stored.stats.total_generated += 1;
        }
        self.push_event(Event::ReminderCaptured {
            reminder_id: reminder.id.clone(),
            target_time: target,
            recurring: true,
            at: now,
        });
        tracing::debug!(
            reminder_id = %reminder.id,
            task_id = %task.id,
            target = %target,
            "recurring instance created"
        );
        self.persist();
        Ok(reminder)
    }

    // ── transitions ────────────────────────────────────────────────────

    /// pending → completed.
    ///
    /// On time means within the on-time window of the target, either side.
    pub fn complete(&mut self, id: &str) -> bool {
        let Some(idx) = self.index_with_status(id, ReminderStatus::Pending) else {
            return false;
        };
        let now = self.now();
        let window = self.config.timing.on_time_window();
        let on_time = (now - self.data.reminders[idx].target_time).abs() <= window;

        self.disarm(idx);
        let reminder = &mut self.data.reminders[idx];
        reminder.status = ReminderStatus::Completed;
        reminder.completed_at = Some(now);
        reminder.completed_on_time = Some(on_time);
        let task_id = reminder.recurring_task().map(str::to_string);

        if let Some(task_id) = &task_id {
            self.record_task_outcome(task_id, true);
        }

        let today = self.today();
        self.data.ledger.record_completion(today, on_time);
        let (points, reason) = if on_time {
            (self.config.points.complete_on_time, PointReason::OnTimeCompletion)
        } else {
            (self.config.points.complete_reminder, PointReason::Completion)
        };
        self.add_points(points, reason);
        self.update_streak();
        self.check_achievements();

        self.push_event(Event::ReminderCompleted {
            reminder_id: id.to_string(),
            on_time,
            at: now,
        });
        let message = if on_time {
            ToastMessage::CompletedOnTime
        } else {
            ToastMessage::Completed
        };
        self.toast(ToastKind::Success, message, Some("✅"), Some(points));

        tracing::debug!(reminder_id = id, on_time, "reminder completed");
        self.persist();
        true
    }

    /// completed → pending.
    ///
    /// Completion counters are decremented on the day the completion was
    /// recorded. Points already granted stay granted. A target in the past
    /// moves to one minute from now.
    ///
    /// A recurring instance is not reopened onto a day its task already
    /// has another reminder for.
    pub fn reopen(&mut self, id: &str) -> bool {
        let Some(idx) = self.index_with_status(id, ReminderStatus::Completed) else {
            return false;
        };
        let now = self.now();
        let reminder = &self.data.reminders[idx];
        let completed_day: NaiveDate = reminder
            .completed_at
            .map(|at| self.local_date(at))
            .unwrap_or_else(|| self.today());
        let was_on_time = reminder.completed_on_time.unwrap_or(false);
        let target = if reminder.target_time < now {
            now + Duration::minutes(1)
        } else {
            reminder.target_time
        };
        let target_date = self.local_date(target);

        if let Some(task_id) = &reminder.recurring_task_id {
            if target_date != reminder.target_date && self.has_instance(task_id, target_date) {
                tracing::debug!(
                    reminder_id = id,
                    %target_date,
                    "reopen would duplicate a recurring instance"
                );
                return false;
            }
        }

        self.disarm(idx);
        let reminder = &mut self.data.reminders[idx];
        reminder.status = ReminderStatus::Pending;
        reminder.completed_at = None;
        reminder.completed_on_time = None;
        reminder.target_time = target;
        reminder.target_date = target_date;

        self.schedule_primary(idx);
        self.arm_bee(idx);
        self.sort_reminders();
        self.data.ledger.revert_completion(completed_day, was_on_time);

        self.push_event(Event::ReminderReopened {
            reminder_id: id.to_string(),
            target_time: target,
            at: now,
        });
        tracing::debug!(reminder_id = id, target = %target, "reminder reopened");
        self.persist();
        true
    }

    /// Delete a reminder in any status. Statistics are left alone.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        self.disarm(idx);
        self.data.reminders.remove(idx);

        let at = self.now();
        self.push_event(Event::ReminderRemoved {
            reminder_id: id.to_string(),
            at,
        });
        tracing::debug!(reminder_id = id, "reminder removed");
        self.persist();
        true
    }

    /// Move a pending reminder to `minutes` from now.
    pub fn postpone(&mut self, id: &str, minutes: u32) -> bool {
        if minutes == 0 {
            return false;
        }
        let Some(idx) = self.index_with_status(id, ReminderStatus::Pending) else {
            return false;
        };
        let now = self.now();
        let target = now + Duration::minutes(i64::from(minutes));

        self.disarm(idx);
        let target_date = self.local_date(target);
        let reminder = &mut self.data.reminders[idx];
        reminder.target_time = target;
        reminder.target_date = target_date;
        self.schedule_primary(idx);
        self.arm_bee(idx);
        self.sort_reminders();

        self.push_event(Event::ReminderPostponed {
            reminder_id: id.to_string(),
            target_time: target,
            at: now,
        });
        self.toast(
            ToastKind::Info,
            ToastMessage::Postponed {
                minutes: i64::from(minutes),
            },
            Some("⏰"),
            None,
        );
        tracing::debug!(reminder_id = id, target = %target, "reminder postponed");
        self.persist();
        true
    }

    /// Sweep pending reminders more than the grace window past their target
    /// into missed. Returns how many were swept.
    pub fn clear_expired(&mut self) -> usize {
        let now = self.now();
        let grace = self.config.timing.expiry_grace();
        let expired: Vec<usize> = self
            .data
            .reminders
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_pending() && now - r.target_time > grace)
            .map(|(idx, _)| idx)
            .collect();

        for &idx in &expired {
            self.disarm(idx);
            let reminder = &mut self.data.reminders[idx];
            reminder.status = ReminderStatus::Missed;
            let id = reminder.id.clone();
            let day = reminder.target_date;
            let task_id = reminder.recurring_task().map(str::to_string);

            self.data.ledger.record_missed(day);
            if let Some(task_id) = &task_id {
                self.record_task_outcome(task_id, false);
            }
            self.push_event(Event::ReminderMissed {
                reminder_id: id,
                at: now,
            });
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired reminders marked missed");
            self.persist();
        }
        expired.len()
    }

    // ── bee mode ───────────────────────────────────────────────────────

    /// Change one reminder's bee flag and rebuild its ladder.
    pub fn set_reminder_bee_mode(&mut self, id: &str, enabled: bool) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        self.disarm_bee(idx);
        self.data.reminders[idx].bee_mode_enabled = enabled;
        self.arm_bee(idx);
        tracing::debug!(reminder_id = id, enabled, "reminder bee mode changed");
        self.persist();
        true
    }

    /// Replace the global bee settings and rebuild every pending ladder.
    pub fn update_bee_settings(&mut self, mut settings: BeeModeSettings) {
        settings.normalize();
        self.data.bee_mode_settings = settings;
        self.rearm_bee_all();
        tracing::info!("bee mode settings updated");
        self.persist();
    }

    /// Flip bee mode globally. Every pending reminder takes the new value.
    pub fn toggle_bee_mode(&mut self) -> bool {
        let enabled = !self.data.bee_mode_settings.enabled;
        self.data.bee_mode_settings.enabled = enabled;
        for reminder in self.data.reminders.iter_mut().filter(|r| r.is_pending()) {
            reminder.bee_mode_enabled = enabled;
        }
        self.rearm_bee_all();
        tracing::info!(enabled, "bee mode toggled");
        self.persist();
        enabled
    }

    /// Earliest bee trigger still ahead for a reminder.
    pub fn next_bee_time(&self, id: &str) -> Option<DateTime<Utc>> {
        let reminder = self.reminder(id)?;
        if !self.bee_active(reminder) {
            return None;
        }
        let target = reminder.target_time.with_timezone(&self.tz);
        bee::next_trigger_time(&target, &self.data.bee_mode_settings, self.now())
    }
}
