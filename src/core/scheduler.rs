//! Reminder scheduling.
//!
//! The scheduler holds one trigger per registered task and is polled with
//! [`ReminderScheduler::run_pending`]. A trigger fires when the clock's
//! hour:minute matches its fire time, at most once per calendar day.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapters::NotificationDispatcher;
use crate::core::clock::Clock;
use crate::domain::Task;

/// How often a trigger fires
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// Every day at the deadline time, forever
    #[default]
    Daily,
    /// Once, on the due date at the deadline time; then removed
    OnDueDate,
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::OnDueDate => write!(f, "on_due_date"),
        }
    }
}

/// A registered reminder
#[derive(Debug, Clone)]
pub struct ReminderTrigger {
    task: Task,
    fire_at: NaiveTime,
    message: String,
    last_fired: Option<NaiveDate>,
}

impl ReminderTrigger {
    fn new(task: &Task) -> Self {
        let deadline = task.deadline_time();
        let fire_at = NaiveTime::from_hms_opt(deadline.hour(), deadline.minute(), 0)
            .unwrap_or(deadline);
        Self {
            task: task.clone(),
            fire_at,
            message: task.reminder_message(),
            last_fired: None,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn fire_at(&self) -> NaiveTime {
        self.fire_at
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn last_fired(&self) -> Option<NaiveDate> {
        self.last_fired
    }

    /// Whether this trigger should fire at `now`
    pub fn is_due(&self, now: NaiveDateTime, recurrence: Recurrence) -> bool {
        let today = now.date();
        if now.hour() != self.fire_at.hour() || now.minute() != self.fire_at.minute() {
            return false;
        }
        if self.last_fired == Some(today) {
            return false;
        }
        match recurrence {
            Recurrence::Daily => true,
            Recurrence::OnDueDate => today == self.task.due_date(),
        }
    }

    /// A one-shot trigger that can never fire again
    fn is_spent(&self, today: NaiveDate, recurrence: Recurrence) -> bool {
        match recurrence {
            Recurrence::Daily => false,
            Recurrence::OnDueDate => {
                self.last_fired.is_some() || today > self.task.due_date()
            }
        }
    }
}

/// Result of one [`ReminderScheduler::run_pending`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Reminders delivered
    pub fired: usize,
    /// Reminders whose delivery failed
    pub failed: usize,
    /// One-shot triggers removed after this pass
    pub removed: usize,
}

/// Registry of reminder triggers plus the channel they fire through
pub struct ReminderScheduler {
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    recurrence: Recurrence,
    triggers: Vec<ReminderTrigger>,
}

impl ReminderScheduler {
    pub fn new(
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        recurrence: Recurrence,
    ) -> Self {
        Self {
            dispatcher,
            clock,
            recurrence,
            triggers: Vec::new(),
        }
    }

    pub fn recurrence(&self) -> Recurrence {
        self.recurrence
    }

    /// Register a reminder at the task's deadline time
    pub fn register(&mut self, task: &Task) {
        let trigger = ReminderTrigger::new(task);
        info!(
            task = %task.name(),
            at = %trigger.fire_at.format("%H:%M"),
            recurrence = %self.recurrence,
            "Reminder registered"
        );
        self.triggers.push(trigger);
    }

    pub fn triggers(&self) -> &[ReminderTrigger] {
        &self.triggers
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Fire every due trigger once.
    ///
    /// Each due trigger is marked as fired for today before its message is
    /// sent, so a failed or slow delivery is never repeated in the same
    /// minute. Delivery failures are logged and counted.
    pub async fn run_pending(&mut self) -> TickReport {
        let now = self.clock.now();
        let today = now.date();
        let recurrence = self.recurrence;
        let mut report = TickReport::default();

        for trigger in self.triggers.iter_mut() {
            if !trigger.is_due(now, recurrence) {
                continue;
            }
            trigger.last_fired = Some(today);

            match self.dispatcher.send(&trigger.message).await {
                Ok(()) => {
                    info!(
                        task = %trigger.task.name(),
                        channel = self.dispatcher.name(),
                        "Reminder sent"
                    );
                    report.fired += 1;
                }
                Err(e) => {
                    warn!(
                        task = %trigger.task.name(),
                        channel = self.dispatcher.name(),
                        error = %e,
                        "Reminder delivery failed"
                    );
                    report.failed += 1;
                }
            }
        }

        let before = self.triggers.len();
        self.triggers.retain(|t| !t.is_spent(today, recurrence));
        report.removed = before - self.triggers.len();

        report
    }
}
