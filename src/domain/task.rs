//! The reminder task value.
//!
//! A task is only ever constructed from a fully resolved date and time, so
//! every `Task` in the system has a well-formed due date and deadline.

use chrono::{NaiveDate, NaiveTime, Timelike};
use thiserror::Error;

/// Date format used in the task log and in outbound messages
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time-of-day format (24h, minute precision)
pub const TIME_FORMAT: &str = "%H:%M";

/// Errors raised when building a task
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Task name cannot be empty")]
    EmptyName,
}

/// A named reminder with a due date and a deadline time-of-day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// What to be reminded of (never empty)
    name: String,

    /// Calendar date the task is due
    due_date: NaiveDate,

    /// Time of day the reminder fires (seconds are always zero)
    deadline_time: NaiveTime,
}

impl Task {
    /// Create a task. The name is trimmed and must not be empty.
    pub fn new(
        name: impl Into<String>,
        due_date: NaiveDate,
        deadline_time: NaiveTime,
    ) -> Result<Self, TaskError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(TaskError::EmptyName);
        }

        // Minute precision only
        let deadline_time = deadline_time
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(deadline_time);

        Ok(Self {
            name,
            due_date,
            deadline_time,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn deadline_time(&self) -> NaiveTime {
        self.deadline_time
    }

    /// Due date as `YYYY-MM-DD`
    pub fn due_date_string(&self) -> String {
        self.due_date.format(DATE_FORMAT).to_string()
    }

    /// Deadline as `HH:MM`
    pub fn deadline_string(&self) -> String {
        self.deadline_time.format(TIME_FORMAT).to_string()
    }

    /// Text sent when the daily reminder fires
    pub fn reminder_message(&self) -> String {
        format!(
            "Reminder: Task '{}' is due on {} at {}",
            self.name,
            self.due_date_string(),
            self.deadline_string()
        )
    }

    /// Text sent right after the task is created
    pub fn confirmation_message(&self) -> String {
        format!(
            "Task Created: '{}' has been scheduled. It is due on {} at {}",
            self.name,
            self.due_date_string(),
            self.deadline_string()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(
            Task::new("   ", date(2026, 10, 20), time(9, 0)),
            Err(TaskError::EmptyName)
        );
    }

    #[test]
    fn test_name_is_trimmed() {
        let task = Task::new("  pay rent ", date(2026, 10, 20), time(9, 0)).unwrap();
        assert_eq!(task.name(), "pay rent");
    }

    #[test]
    fn test_seconds_are_dropped() {
        let task = Task::new(
            "call mom",
            date(2026, 10, 20),
            NaiveTime::from_hms_opt(9, 30, 45).unwrap(),
        )
        .unwrap();
        assert_eq!(task.deadline_time(), time(9, 30));
        assert_eq!(task.deadline_string(), "09:30");
    }

    #[test]
    fn test_messages_reference_all_fields() {
        let task = Task::new("pay rent", date(2026, 10, 20), time(9, 0)).unwrap();

        assert_eq!(
            task.reminder_message(),
            "Reminder: Task 'pay rent' is due on 2026-10-20 at 09:00"
        );
        assert_eq!(
            task.confirmation_message(),
            "Task Created: 'pay rent' has been scheduled. It is due on 2026-10-20 at 09:00"
        );
    }
}
