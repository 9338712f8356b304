//! Reminder Scheduler Integration Tests
//!
//! Tests for trigger firing, same-minute de-duplication, recurrence modes,
//! and delivery failure handling.

mod common;

use std::sync::atomic::Ordering;

use chrono::{Duration, NaiveDate, NaiveTime};
use common::{monday_at, Harness};
use voicetask::core::{Recurrence, TickReport};
use voicetask::domain::Task;

fn rent_due_tuesday_at_nine() -> Task {
    Task::new(
        "pay rent",
        NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_fires_once_at_deadline_minute() {
    let harness = Harness::new(&[], monday_at(8, 59));
    let mut scheduler = harness.scheduler(Recurrence::Daily);
    scheduler.register(&rent_due_tuesday_at_nine());

    assert_eq!(scheduler.run_pending().await, TickReport::default());
    assert!(harness.sent().is_empty());

    harness.clock.set(monday_at(9, 0));
    let report = scheduler.run_pending().await;
    assert_eq!(report.fired, 1);

    let sent = harness.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("pay rent"));
    assert!(sent[0].contains("2026-10-20"));
    assert!(sent[0].contains("09:00"));
    assert_eq!(
        sent[0],
        "Reminder: Task 'pay rent' is due on 2026-10-20 at 09:00"
    );
}

#[tokio::test]
async fn test_repeated_polls_in_same_minute_do_not_refire() {
    let harness = Harness::new(&[], monday_at(9, 0));
    let mut scheduler = harness.scheduler(Recurrence::Daily);
    scheduler.register(&rent_due_tuesday_at_nine());

    for _ in 0..30 {
        scheduler.run_pending().await;
        harness.clock.advance(Duration::seconds(1));
    }

    assert_eq!(harness.sent().len(), 1);
}

#[tokio::test]
async fn test_daily_recurrence_fires_every_day() {
    let harness = Harness::new(&[], monday_at(9, 0));
    let mut scheduler = harness.scheduler(Recurrence::Daily);
    scheduler.register(&rent_due_tuesday_at_nine());

    for _ in 0..3 {
        scheduler.run_pending().await;
        harness.clock.advance(Duration::days(1));
    }

    // Monday, Tuesday (due date) and Wednesday (after it)
    assert_eq!(harness.sent().len(), 3);
    assert_eq!(scheduler.len(), 1);
}

#[tokio::test]
async fn test_on_due_date_fires_once_then_deregisters() {
    let harness = Harness::new(&[], monday_at(9, 0));
    let mut scheduler = harness.scheduler(Recurrence::OnDueDate);
    scheduler.register(&rent_due_tuesday_at_nine());

    // Monday: not the due date
    assert_eq!(scheduler.run_pending().await.fired, 0);

    harness.clock.advance(Duration::days(1));
    let report = scheduler.run_pending().await;
    assert_eq!(report.fired, 1);
    assert_eq!(report.removed, 1);
    assert!(scheduler.is_empty());

    harness.clock.advance(Duration::days(1));
    scheduler.run_pending().await;
    assert_eq!(harness.sent().len(), 1);
}

#[tokio::test]
async fn test_missed_minute_is_not_caught_up() {
    let harness = Harness::new(&[], monday_at(8, 59));
    let mut scheduler = harness.scheduler(Recurrence::Daily);
    scheduler.register(&rent_due_tuesday_at_nine());

    scheduler.run_pending().await;
    harness.clock.set(monday_at(9, 1));
    scheduler.run_pending().await;

    assert!(harness.sent().is_empty());
}

#[tokio::test]
async fn test_delivery_failure_is_counted_and_not_retried() {
    let harness = Harness::new(&[], monday_at(9, 0));
    harness.dispatcher.fail.store(true, Ordering::SeqCst);
    let mut scheduler = harness.scheduler(Recurrence::Daily);
    scheduler.register(&rent_due_tuesday_at_nine());

    let other = Task::new(
        "water plants",
        NaiveDate::from_ymd_opt(2026, 10, 25).unwrap(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    )
    .unwrap();
    scheduler.register(&other);

    let report = scheduler.run_pending().await;
    assert_eq!(report.failed, 2);
    assert_eq!(report.fired, 0);

    // Already marked for today, so a recovered channel does not resend
    harness.dispatcher.fail.store(false, Ordering::SeqCst);
    assert_eq!(scheduler.run_pending().await, TickReport::default());
    assert!(harness.sent().is_empty());
}

#[tokio::test]
async fn test_triggers_are_independent() {
    let harness = Harness::new(&[], monday_at(9, 0));
    let mut scheduler = harness.scheduler(Recurrence::Daily);
    scheduler.register(&rent_due_tuesday_at_nine());
    scheduler.register(
        &Task::new(
            "standup",
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        )
        .unwrap(),
    );

    scheduler.run_pending().await;
    harness.clock.set(monday_at(9, 30));
    scheduler.run_pending().await;

    let sent = harness.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("pay rent"));
    assert!(sent[1].contains("standup"));
    assert_eq!(scheduler.triggers()[1].fire_at(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
}
