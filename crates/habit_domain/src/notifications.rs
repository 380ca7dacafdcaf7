use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::habit::{Habit, HabitId};

pub const REMINDER_TITLE: &str = "Habit Reminder";

/// Key under which the primary habit's widget payload is published.
pub const WIDGET_PRIMARY_KEY: &str = "widget.primaryHabit";

/// A daily repeating reminder at a local hour and minute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderRequest {
    pub habit_id: HabitId,
    pub key: String,
    pub hour: u8,
    pub minute: u8,
    pub title: String,
    pub body: String,
}

impl ReminderRequest {
    pub fn for_habit(habit: &Habit) -> Self {
        Self {
            habit_id: habit.id,
            key: habit.id.reminder_key(),
            hour: habit.reminder.hour,
            minute: habit.reminder.minute,
            title: REMINDER_TITLE.to_string(),
            body: format!("Mark {} for today.", habit.title),
        }
    }
}

/// Platform-specific reminder adapters will implement this trait.
///
/// At most one schedule is active per habit id; scheduling again replaces it.
/// Calls are fire-and-forget and failures stay inside the adapter.
pub trait ReminderScheduler: Send + Sync {
    fn schedule(&self, request: ReminderRequest);
    fn cancel(&self, habit_id: &HabitId);
}

/// Payload shown by the home-screen widget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub id: HabitId,
    pub title: String,
    pub icon: String,
    pub color_hex: String,
    pub date: DateTime<Utc>,
    pub today_count: usize,
    pub target_per_day: u32,
}

impl WidgetSnapshot {
    pub fn for_habit(habit: &Habit, today: NaiveDate, calendar: &Calendar) -> Self {
        Self {
            id: habit.id,
            title: habit.title.clone(),
            icon: habit.icon.clone(),
            color_hex: habit.color.as_str().to_string(),
            date: calendar.start_of(today),
            today_count: habit.count_on(today, calendar),
            target_per_day: habit.target_per_day,
        }
    }
}

/// Shared state surface read by widgets in another process.
///
/// Implementations store the payload under [`WIDGET_PRIMARY_KEY`] and ask the
/// host to refresh its widgets. No acknowledgment is expected.
pub trait WidgetPublisher: Send + Sync {
    fn publish(&self, snapshot: WidgetSnapshot);
}

/// Schedules the habit's reminder when enabled, cancels it otherwise.
pub fn sync_reminder(scheduler: &dyn ReminderScheduler, habit: &Habit) {
    if habit.reminder.enabled {
        scheduler.schedule(ReminderRequest::for_habit(habit));
    } else {
        scheduler.cancel(&habit.id);
    }
}
