//! Integration tests for the reminder lifecycle.
//!
//! Drives a full `SchedulerState` with a manual clock and an in-memory
//! gateway, checking what gets scheduled, cancelled and counted.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use quickremind_core::bee::{BeeStage, MAX_OFFSET_MINUTES};
use quickremind_core::{
    BeeModeSettings, CaptureRequest, Clock, ClockTime, EngineConfig, Event, ManualClock,
    MemoryGateway, RecurrenceRule, RecurringTaskDraft, Rejection, ReminderStatus, SchedulerState,
};

// ============================================================================
// Test Helpers
// ============================================================================

struct Harness {
    state: SchedulerState,
    clock: Arc<ManualClock>,
    gateway: Arc<MemoryGateway>,
}

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, h, m, s).unwrap()
}

fn harness(config: EngineConfig, start: DateTime<Utc>) -> Harness {
    let clock = Arc::new(ManualClock::new(start));
    let gateway = Arc::new(MemoryGateway::new());
    let state = SchedulerState::new(config, clock.clone(), gateway.clone()).unwrap();
    Harness {
        state,
        clock,
        gateway,
    }
}

fn without_bee() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.bee_defaults.enabled = false;
    config
}

fn single_day_ladder() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.bee_defaults.repeat_enabled = false;
    config
}

// ============================================================================
// Capture and expiry
// ============================================================================

#[test]
fn test_expired_reminder_is_missed_and_cancelled_once() {
    let mut h = harness(without_bee(), at(9, 0, 0));
    let reminder = h
        .state
        .create_user_reminder(CaptureRequest::in_minutes("Call mom", 10))
        .unwrap();
    let handle = reminder.notification_id.clone().unwrap();
    assert_eq!(h.gateway.active_count(), 1);

    // Exactly at the grace boundary: still pending.
    h.clock.set(at(9, 40, 0));
    assert_eq!(h.state.clear_expired(), 0);

    h.clock.set(at(9, 40, 1));
    assert_eq!(h.state.clear_expired(), 1);
    assert_eq!(
        h.state.reminder(&reminder.id).unwrap().status,
        ReminderStatus::Missed
    );
    assert_eq!(h.gateway.cancel_calls(&handle), 1);
    assert_eq!(h.gateway.active_count(), 0);

    let today = h.state.today();
    assert_eq!(h.state.ledger().day(today).missed, 1);

    // A second sweep finds nothing.
    assert_eq!(h.state.clear_expired(), 0);
    assert_eq!(h.gateway.cancel_calls(&handle), 1);
}

#[test]
fn test_capture_rejections_surface_as_toasts() {
    let mut h = harness(without_bee(), at(9, 0, 0));
    assert_eq!(
        h.state
            .create_user_reminder(CaptureRequest::in_minutes("Now", 0))
            .unwrap_err(),
        Rejection::TooSoon { minutes: 0, min: 1 }
    );
    let events = h.state.drain_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].is_toast());
    assert!(h.state.reminders().is_empty());
    assert_eq!(h.gateway.scheduled().len(), 0);
}

// ============================================================================
// Bee mode
// ============================================================================

#[test]
fn test_bee_ladder_follows_intervals_and_ends_with_last_chance() {
    let mut h = harness(single_day_ladder(), at(9, 0, 0));
    let reminder = h
        .state
        .create_user_reminder(CaptureRequest::in_minutes("Vitamins", 5).with_bee_mode(true))
        .unwrap();
    let target = reminder.target_time;

    let bee: Vec<_> = reminder
        .bee_notification_ids
        .iter()
        .map(|handle| h.gateway.get(handle).unwrap())
        .collect();
    let offsets: Vec<i64> = bee.iter().map(|n| (n.at - target).num_minutes()).collect();
    assert_eq!(offsets, vec![10, 30, 60, 120]);
    assert!(bee[0].content.title.contains("Vitamins"));
    assert_eq!(
        bee[3].content,
        quickremind_core::bee::stage_content(BeeStage::LastChance, Some("Vitamins"), 120)
    );

    assert_eq!(
        h.state.next_bee_time(&reminder.id),
        Some(target + Duration::minutes(10))
    );
}

#[test]
fn test_completion_cancels_whole_ladder() {
    let mut h = harness(single_day_ladder(), at(9, 0, 0));
    let reminder = h
        .state
        .create_user_reminder(CaptureRequest::in_minutes("Stretch", 5).with_bee_mode(true))
        .unwrap();
    assert_eq!(h.gateway.active_count(), 5);

    h.clock.set(at(9, 20, 0));
    h.gateway.fire_due(h.clock.now());
    assert!(h.state.complete(&reminder.id));
    assert_eq!(h.gateway.active_count(), 0);
    assert!(h
        .state
        .reminder(&reminder.id)
        .unwrap()
        .bee_notification_ids
        .is_empty());
}

#[test]
fn test_quiet_hours_trim_the_ladder() {
    let mut h = harness(single_day_ladder(), at(20, 0, 0));
    let reminder = h
        .state
        .create_user_reminder(CaptureRequest::in_minutes("Dishes", 60).with_bee_mode(true))
        .unwrap();
    // Target 21:00; 21:10 and 21:30 survive, 22:00 and 23:00 are quiet.
    let times: Vec<_> = reminder
        .bee_notification_ids
        .iter()
        .map(|handle| h.gateway.get(handle).unwrap().at)
        .collect();
    assert_eq!(times, vec![at(21, 10, 0), at(21, 30, 0)]);
    let last = h.gateway.get(&reminder.bee_notification_ids[1]).unwrap();
    assert!(last.content.title.contains("Last chance"));
}

#[test]
fn test_global_toggle_rearms_pending_reminders() {
    let mut h = harness(single_day_ladder(), at(9, 0, 0));
    let reminder = h
        .state
        .create_user_reminder(CaptureRequest::in_minutes("Plants", 30).with_bee_mode(true))
        .unwrap();
    assert!(!h.state.toggle_bee_mode());
    assert!(h
        .state
        .reminder(&reminder.id)
        .unwrap()
        .bee_notification_ids
        .is_empty());
    assert_eq!(h.gateway.active_count(), 1);

    assert!(h.state.toggle_bee_mode());
    assert_eq!(
        h.state
            .reminder(&reminder.id)
            .unwrap()
            .bee_notification_ids
            .len(),
        4
    );
}

#[test]
fn test_oversized_bee_settings_are_capped() {
    let mut h = harness(single_day_ladder(), at(9, 0, 0));
    let reminder = h
        .state
        .create_user_reminder(CaptureRequest::in_minutes("Taxes", 5).with_bee_mode(true))
        .unwrap();
    let target = reminder.target_time;
    let week = i64::from(MAX_OFFSET_MINUTES);

    h.state.update_bee_settings(BeeModeSettings {
        intervals: vec![u32::MAX],
        repeat_interval: u32::MAX,
        repeat_enabled: true,
        ..Default::default()
    });
    assert_eq!(h.state.bee_settings().intervals, vec![MAX_OFFSET_MINUTES]);
    assert_eq!(h.state.bee_settings().repeat_interval, MAX_OFFSET_MINUTES);
    let ladder = &h.state.reminder(&reminder.id).unwrap().bee_notification_ids;
    assert_eq!(ladder.len(), 1);
    let only = h.gateway.get(&ladder[0]).unwrap();
    assert_eq!(only.at, target + Duration::minutes(week));
    assert!(only.content.title.contains("Last chance"));

    // Default intervals with a repeat step that would overflow.
    h.state.update_bee_settings(BeeModeSettings {
        repeat_interval: u32::MAX,
        ..Default::default()
    });
    let ladder = &h.state.reminder(&reminder.id).unwrap().bee_notification_ids;
    assert_eq!(ladder.len(), 4);
}

// ============================================================================
// Completion, reopen, postpone
// ============================================================================

#[test]
fn test_on_time_window_boundary() {
    let mut h = harness(without_bee(), at(9, 0, 0));
    let early = h
        .state
        .create_user_reminder(CaptureRequest::in_minutes("A", 10))
        .unwrap();
    let late = h
        .state
        .create_user_reminder(CaptureRequest::in_minutes("B", 10))
        .unwrap();

    h.clock.set(at(9, 15, 0));
    assert!(h.state.complete(&early.id));
    assert_eq!(
        h.state.reminder(&early.id).unwrap().completed_on_time,
        Some(true)
    );

    h.clock.set(at(9, 15, 1));
    assert!(h.state.complete(&late.id));
    assert_eq!(
        h.state.reminder(&late.id).unwrap().completed_on_time,
        Some(false)
    );

    let today = h.state.today();
    let day = h.state.ledger().day(today);
    assert_eq!(day.completed, 2);
    assert_eq!(day.completed_on_time, 1);
}

#[test]
fn test_complete_then_reopen_restores_counters() {
    let mut h = harness(without_bee(), at(9, 0, 0));
    let reminder = h
        .state
        .create_user_reminder(CaptureRequest::in_minutes("Email", 10))
        .unwrap();
    let today = h.state.today();

    h.clock.set(at(9, 10, 0));
    assert!(h.state.complete(&reminder.id));
    let points_after_complete = h.state.ledger().user_stats.total_cp;
    assert_eq!(h.state.ledger().user_stats.total_completed, 1);

    h.clock.set(at(9, 30, 0));
    assert!(h.state.reopen(&reminder.id));
    let reopened = h.state.reminder(&reminder.id).unwrap().clone();
    assert_eq!(reopened.status, ReminderStatus::Pending);
    assert_eq!(reopened.target_time, at(9, 31, 0));
    assert!(reopened.completed_at.is_none());
    assert!(reopened.notification_id.is_some());

    let ledger = h.state.ledger();
    assert_eq!(ledger.user_stats.total_completed, 0);
    assert_eq!(ledger.day(today).completed, 0);
    assert_eq!(ledger.day(today).completed_on_time, 0);
    assert_eq!(ledger.user_stats.total_cp, points_after_complete);

    // Only completed reminders reopen.
    assert!(!h.state.reopen(&reminder.id));
}

#[test]
fn test_reopen_never_duplicates_a_recurring_day() {
    let mut h = harness(without_bee(), at(8, 0, 0));
    let task_id = h
        .state
        .add_recurring_task(RecurringTaskDraft::new(
            "Pills",
            RecurrenceRule::Daily,
            ClockTime::hm(9, 0),
            at(0, 0, 0).date_naive(),
        ))
        .unwrap();
    let first = h.state.reminders()[0].id.clone();
    h.clock.set(at(9, 0, 0));
    assert!(h.state.complete(&first));

    h.clock.set(at(8, 0, 0) + Duration::days(1));
    assert_eq!(h.state.tick().generated, 1);
    let tomorrow = h.state.today();

    assert!(!h.state.reopen(&first));
    assert_eq!(
        h.state.reminder(&first).unwrap().status,
        ReminderStatus::Completed
    );
    let live_today = h
        .state
        .reminders()
        .iter()
        .filter(|r| r.recurring_task_id.as_deref() == Some(task_id.as_str()))
        .filter(|r| r.target_date == tomorrow && r.status != ReminderStatus::Completed)
        .count();
    assert_eq!(live_today, 1);
    assert_eq!(h.state.ledger().user_stats.total_completed, 1);

    // Once the day is free again, the reopen goes through.
    let today_instance = h
        .state
        .pending()
        .find(|r| r.target_date == tomorrow)
        .map(|r| r.id.clone())
        .unwrap();
    assert!(h.state.remove(&today_instance));
    assert!(h.state.reopen(&first));
    assert_eq!(h.state.reminder(&first).unwrap().target_date, tomorrow);
}

#[test]
fn test_postpone_reschedules_pending_only() {
    let mut h = harness(without_bee(), at(9, 0, 0));
    let reminder = h
        .state
        .create_user_reminder(CaptureRequest::in_minutes("Laundry", 10))
        .unwrap();
    let old_handle = reminder.notification_id.clone().unwrap();

    assert!(!h.state.postpone(&reminder.id, 0));
    assert!(h.state.postpone(&reminder.id, 15));
    let moved = h.state.reminder(&reminder.id).unwrap();
    assert_eq!(moved.target_time, at(9, 15, 0));
    assert_eq!(h.gateway.cancel_calls(&old_handle), 1);
    assert_eq!(h.gateway.active_count(), 1);

    h.clock.set(at(9, 15, 0));
    h.state.complete(&reminder.id);
    assert!(!h.state.postpone(&reminder.id, 15));
}

// ============================================================================
// Gamification
// ============================================================================

#[test]
fn test_seventh_consecutive_day_pays_streak_bonus() {
    let mut h = harness(without_bee(), at(9, 0, 0));
    let mut milestones = Vec::new();

    for day in 0..7 {
        h.clock.set(at(9, 0, 0) + Duration::days(day));
        h.state
            .create_user_reminder(CaptureRequest::in_minutes("Daily", 30))
            .unwrap();
        milestones.extend(h.state.drain_events().into_iter().filter_map(|e| match e {
            Event::StreakMilestone { streak, bonus, .. } => Some((streak, bonus)),
            _ => None,
        }));
    }

    assert_eq!(h.state.ledger().user_stats.current_streak, 7);
    assert_eq!(milestones, vec![(7, 10)]);
}

#[test]
fn test_gap_day_resets_streak() {
    let mut h = harness(without_bee(), at(9, 0, 0));
    h.state
        .create_user_reminder(CaptureRequest::in_minutes("One", 30))
        .unwrap();
    h.clock.set(at(9, 0, 0) + Duration::days(1));
    h.state
        .create_user_reminder(CaptureRequest::in_minutes("Two", 30))
        .unwrap();
    assert_eq!(h.state.ledger().user_stats.current_streak, 2);

    h.clock.set(at(9, 0, 0) + Duration::days(3));
    h.state
        .create_user_reminder(CaptureRequest::in_minutes("Three", 30))
        .unwrap();
    let stats = &h.state.ledger().user_stats;
    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.longest_streak, 2);
}

#[test]
fn test_streak_milestone_from_seeded_state() {
    let mut h = harness(without_bee(), at(9, 0, 0));
    let yesterday = h.state.today().pred_opt().unwrap();
    {
        let stats = &mut h.state.ledger_mut().user_stats;
        stats.last_active_date = Some(yesterday);
        stats.current_streak = 6;
    }

    h.state.update_streak();
    h.state.update_streak();

    let stats = &h.state.ledger().user_stats;
    assert_eq!(stats.current_streak, 7);
    assert_eq!(stats.total_cp, 10);
    let milestones = h
        .state
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, Event::StreakMilestone { .. }))
        .count();
    assert_eq!(milestones, 1);
}
