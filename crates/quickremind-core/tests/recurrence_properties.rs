//! Property tests for recurrence arithmetic and the points ledger.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;
use quickremind_core::time::days_in_month;
use quickremind_core::{
    next_occurrence, CaptureRequest, ClockTime, EngineConfig, IntervalUnit, ManualClock,
    MemoryGateway, MonthDay, RecurrenceRule, SchedulerState,
};

// ============================================================================
// Strategies
// ============================================================================

fn arb_tz() -> impl Strategy<Value = Tz> {
    prop_oneof![
        Just(Tz::UTC),
        Just(Tz::Asia__Tokyo),
        Just(Tz::America__New_York),
        Just(Tz::Europe__Berlin),
    ]
}

fn arb_time() -> impl Strategy<Value = ClockTime> {
    (0u8..24, 0u8..60).prop_map(|(h, m)| ClockTime::hm(h, m))
}

fn arb_unit() -> impl Strategy<Value = IntervalUnit> {
    prop_oneof![
        Just(IntervalUnit::Days),
        Just(IntervalUnit::Weeks),
        Just(IntervalUnit::Months),
    ]
}

fn arb_rule() -> impl Strategy<Value = RecurrenceRule> {
    prop_oneof![
        Just(RecurrenceRule::Daily),
        proptest::collection::btree_set(0u8..7, 1..=7).prop_map(RecurrenceRule::weekly),
        (1u8..=31).prop_map(|d| RecurrenceRule::monthly(MonthDay::Day(d))),
        Just(RecurrenceRule::monthly(MonthDay::LastDay)),
        (1u32..=12, arb_unit()).prop_map(|(v, u)| RecurrenceRule::every(v, u)),
    ]
}

/// Any instant between 2020 and 2030.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (1_577_836_800i64..1_893_456_000i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

// ============================================================================
// Recurrence
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The next occurrence is always strictly in the future.
    #[test]
    fn prop_next_occurrence_moves_forward(
        rule in arb_rule(),
        time in arb_time(),
        tz in arb_tz(),
        from in arb_instant(),
        start_offset in -400i64..400,
    ) {
        let from = from.with_timezone(&tz);
        let start_date = (from + Duration::days(start_offset)).date_naive();
        if let Some(next) = next_occurrence(&rule, time, start_date, &from) {
            prop_assert!(next > from, "{next} is not after {from}");
        }
    }

    /// Daily rules fire within a day, at the requested wall clock.
    #[test]
    fn prop_daily_lands_on_wall_clock(time in arb_time(), from in arb_instant()) {
        let tz = Tz::Asia__Tokyo;
        let from = from.with_timezone(&tz);
        let next = next_occurrence(&RecurrenceRule::Daily, time, from.date_naive(), &from).unwrap();
        prop_assert!(next - from <= Duration::days(1));
        prop_assert_eq!(next.hour(), u32::from(time.hour()));
        prop_assert_eq!(next.minute(), u32::from(time.minute()));
    }

    /// Weekly rules only fire on listed weekdays, within a week.
    #[test]
    fn prop_weekly_hits_listed_day(
        days in proptest::collection::btree_set(0u8..7, 1..=7),
        time in arb_time(),
        from in arb_instant(),
    ) {
        let from = from.with_timezone(&Tz::UTC);
        let rule = RecurrenceRule::weekly(days.iter().copied());
        let next = next_occurrence(&rule, time, from.date_naive(), &from).unwrap();
        let weekday = next.weekday().num_days_from_sunday() as u8;
        prop_assert!(days.contains(&weekday));
        prop_assert!(next - from <= Duration::days(7));
    }

    /// Monthly days past the end of a month clamp to its last day.
    #[test]
    fn prop_monthly_clamps_to_month_length(
        day in 1u8..=31,
        time in arb_time(),
        from in arb_instant(),
    ) {
        let from = from.with_timezone(&Tz::UTC);
        let rule = RecurrenceRule::monthly(MonthDay::Day(day));
        let next = next_occurrence(&rule, time, from.date_naive(), &from).unwrap();
        let expected = u32::from(day).min(days_in_month(next.year(), next.month()));
        prop_assert_eq!(next.day(), expected);
    }
}

// ============================================================================
// Points ledger
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Capture(i64),
    CompleteFirst,
    ReopenLast,
    PostponeFirst(u32),
    Advance(i64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..600).prop_map(Op::Capture),
        Just(Op::CompleteFirst),
        Just(Op::ReopenLast),
        (1u32..120).prop_map(Op::PostponeFirst),
        (1i64..2000).prop_map(Op::Advance),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Total points and level never go down, whatever the user does.
    #[test]
    fn prop_points_and_level_are_monotonic(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()));
        let mut state =
            SchedulerState::new(EngineConfig::default(), clock.clone(), MemoryGateway::new())
                .unwrap();

        let mut last_points = 0;
        let mut last_level = 1;
        for op in ops {
            match op {
                Op::Capture(minutes) => {
                    let _ = state.create_user_reminder(CaptureRequest::in_minutes("p", minutes));
                }
                Op::CompleteFirst => {
                    let id = state.pending().next().map(|r| r.id.clone());
                    if let Some(id) = id {
                        state.complete(&id);
                    }
                }
                Op::ReopenLast => {
                    let id = state
                        .reminders()
                        .iter()
                        .rev()
                        .find(|r| r.completed_at.is_some())
                        .map(|r| r.id.clone());
                    if let Some(id) = id {
                        state.reopen(&id);
                    }
                }
                Op::PostponeFirst(minutes) => {
                    let id = state.pending().next().map(|r| r.id.clone());
                    if let Some(id) = id {
                        state.postpone(&id, minutes);
                    }
                }
                Op::Advance(minutes) => {
                    clock.advance(Duration::minutes(minutes));
                    state.tick();
                }
            }

            let stats = &state.ledger().user_stats;
            prop_assert!(stats.total_cp >= last_points);
            prop_assert!(stats.level >= last_level);
            prop_assert!(stats.longest_streak >= stats.current_streak);
            last_points = stats.total_cp;
            last_level = stats.level;
            state.drain_events();
        }
    }
}
