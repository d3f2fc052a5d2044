//! Materializing recurring tasks into reminders, and task CRUD.
//!
//! At most one reminder exists per `(task, calendar day)`, whatever its
//! status. Generation goes through the silent creation path, so capacity
//! and minimum-distance rules still apply.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::{RecurringStats, RecurringTask, RecurringTaskDraft, RecurringTaskPatch};
use crate::error::Rejection;
use crate::recurrence::next_occurrence;
use crate::reminder::{Reminder, ReminderStatus};
use crate::state::SchedulerState;
use crate::time::{at_local, ClockTime};

impl SchedulerState {
    fn task_index(&self, id: &str) -> Option<usize> {
        self.data.recurring_tasks.iter().position(|t| t.id == id)
    }

    /// Next occurrence of `task` after `now`, never before its start date.
    fn occurrence_after(&self, task: &RecurringTask, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = at_local(&self.tz, task.start_date, ClockTime::hm(0, 0))
            .map(|t| t.with_timezone(&Utc) - Duration::milliseconds(1));
        let baseline = match start {
            Some(start) if start > now => start,
            _ => now,
        };
        next_occurrence(
            &task.recurrence,
            task.time,
            task.start_date,
            &baseline.with_timezone(&self.tz),
        )
        .map(|t| t.with_timezone(&Utc))
    }

    /// When the task fires next, if it is active.
    pub fn next_task_occurrence(&self, task_id: &str) -> Option<DateTime<Utc>> {
        let task = self.recurring_task(task_id).filter(|t| t.is_active)?;
        self.occurrence_after(task, self.now())
    }

    pub(crate) fn has_instance(&self, task_id: &str, date: NaiveDate) -> bool {
        self.data
            .reminders
            .iter()
            .any(|r| r.recurring_task_id.as_deref() == Some(task_id) && r.target_date == date)
    }

    /// Create today's reminder for every active task whose next occurrence
    /// falls today. Returns how many were created.
    pub fn generate_for_today(&mut self) -> usize {
        let now = self.now();
        let today = self.local_date(now);
        let tasks: Vec<RecurringTask> = self
            .data
            .recurring_tasks
            .iter()
            .filter(|t| t.is_active)
            .cloned()
            .collect();

        let mut generated = 0;
        for task in &tasks {
            let Some(next) = self.occurrence_after(task, now) else {
                continue;
            };
            if self.local_date(next) != today || self.has_instance(&task.id, today) {
                continue;
            }
            if self.materialize_recurring_instance(task, next).is_ok() {
                generated += 1;
            }
        }

        if generated > 0 {
            tracing::info!(generated, %today, "recurring reminders generated");
        }
        generated
    }

    /// Materialize a task's next occurrence whatever day it falls on.
    pub fn generate_next(&mut self, task_id: &str) -> Option<Reminder> {
        let task = self.recurring_task(task_id).filter(|t| t.is_active)?.clone();
        let next = self.occurrence_after(&task, self.now())?;
        if self.has_instance(&task.id, self.local_date(next)) {
            return None;
        }
        self.materialize_recurring_instance(&task, next).ok()
    }

    fn remove_pending_instances(&mut self, task_id: &str) -> usize {
        let ids: Vec<String> = self
            .data
            .reminders
            .iter()
            .filter(|r| r.status == ReminderStatus::Pending)
            .filter(|r| r.recurring_task_id.as_deref() == Some(task_id))
            .map(|r| r.id.clone())
            .collect();
        for id in &ids {
            self.remove(id);
        }
        ids.len()
    }

    /// Pause or resume a task. Returns the new state, or `None` if unknown.
    ///
    /// Pausing removes the task's pending reminders; history is kept.
    /// Resuming generates today's reminder.
    pub fn toggle_active(&mut self, task_id: &str) -> Option<bool> {
        let idx = self.task_index(task_id)?;
        let active = !self.data.recurring_tasks[idx].is_active;
        self.data.recurring_tasks[idx].is_active = active;

        if active {
            tracing::info!(task_id, "recurring task resumed");
            self.generate_for_today();
        } else {
            let removed = self.remove_pending_instances(task_id);
            tracing::info!(task_id, removed, "recurring task paused");
        }
        self.persist();
        Some(active)
    }

    pub fn add_recurring_task(&mut self, draft: RecurringTaskDraft) -> Result<String, Rejection> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(self.reject(Rejection::EmptyName));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let task = RecurringTask {
            id: id.clone(),
            name: name.to_string(),
            icon: draft.icon,
            note: draft.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            recurrence: draft.recurrence,
            time: draft.time,
            start_date: draft.start_date,
            is_active: draft.is_active,
            bee_mode_enabled: draft.bee_mode_enabled,
            created_at: self.now(),
            stats: RecurringStats::default(),
        };
        self.data.recurring_tasks.push(task);
        tracing::info!(task_id = %id, "recurring task added");
        self.persist();
        self.generate_for_today();
        Ok(id)
    }

    /// Apply a patch. `Ok(false)` when the task does not exist.
    ///
    /// Pausing through a patch removes pending instances like
    /// [`toggle_active`](Self::toggle_active) does.
    pub fn update_recurring_task(
        &mut self,
        task_id: &str,
        patch: RecurringTaskPatch,
    ) -> Result<bool, Rejection> {
        let Some(idx) = self.task_index(task_id) else {
            return Ok(false);
        };
        let name = match patch.name.as_deref().map(str::trim) {
            Some("") => return Err(self.reject(Rejection::EmptyName)),
            other => other.map(str::to_string),
        };

        let task = &mut self.data.recurring_tasks[idx];
        let was_active = task.is_active;
        if let Some(name) = name {
            task.name = name;
        }
        if let Some(icon) = patch.icon {
            task.icon = icon;
        }
        if let Some(note) = patch.note {
            task.note = note;
        }
        if let Some(recurrence) = patch.recurrence {
            task.recurrence = recurrence;
        }
        if let Some(time) = patch.time {
            task.time = time;
        }
        if let Some(start_date) = patch.start_date {
            task.start_date = start_date;
        }
        if let Some(active) = patch.is_active {
            task.is_active = active;
        }
        if let Some(bee) = patch.bee_mode_enabled {
            task.bee_mode_enabled = bee;
        }
        let paused = was_active && !task.is_active;

        if paused {
            self.remove_pending_instances(task_id);
        }
        tracing::info!(task_id, "recurring task updated");
        self.persist();
        self.generate_for_today();
        Ok(true)
    }

    /// Delete a task and its pending reminders.
    pub fn delete_recurring_task(&mut self, task_id: &str) -> bool {
        let Some(idx) = self.task_index(task_id) else {
            return false;
        };
        let removed = self.remove_pending_instances(task_id);
        self.data.recurring_tasks.remove(idx);
        tracing::info!(task_id, removed, "recurring task deleted");
        self.persist();
        true
    }

    pub(crate) fn record_task_outcome(&mut self, task_id: &str, completed: bool) -> bool {
        let now = self.now();
        let Some(idx) = self.task_index(task_id) else {
            return false;
        };
        self.data.recurring_tasks[idx]
            .stats
            .record_outcome(completed, now);
        true
    }

    /// Record an occurrence's outcome on its task.
    pub fn report_outcome(&mut self, task_id: &str, completed: bool) -> bool {
        let found = self.record_task_outcome(task_id, completed);
        if found {
            self.persist();
        }
        found
    }
}
