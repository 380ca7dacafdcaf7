use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    calendar::{Calendar, Clock, SystemClock},
    error::{HabitError, HabitResult, PersistenceError},
    habit::{DayProgress, Habit, HabitEdit, HabitId, NewHabit},
    merge::{self, ImportReport},
    notifications::{self, ReminderScheduler, WidgetPublisher, WidgetSnapshot},
    query::{self, HabitQuery, LeaderboardEntry},
    repository::HabitRepository,
    snapshot::HabitSnapshot,
};

pub const DEFAULT_LEADERBOARD_SIZE: usize = 3;
pub const DEFAULT_CHART_DAYS: usize = 30;

/// Derived metrics for one habit as of today.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitStats {
    pub habit_id: HabitId,
    pub today_count: usize,
    pub target_per_day: u32,
    pub is_done_today: bool,
    pub current_streak: u32,
    pub weekly_rate: f64,
    pub monthly_rate: f64,
    pub week: [DayProgress; 7],
}

/// Entry point for every habit use case.
///
/// The repository sits behind a lock, so each operation (mutation plus
/// commit) is atomic with respect to other callers sharing the service.
pub struct HabitService<R: HabitRepository> {
    repository: RwLock<R>,
    calendar: Calendar,
    clock: Box<dyn Clock>,
    reminder_scheduler: Option<Box<dyn ReminderScheduler>>,
    widget_publisher: Option<Box<dyn WidgetPublisher>>,
    primary_habit: RwLock<Option<HabitId>>,
}

pub struct HabitServiceBuilder<R: HabitRepository> {
    repository: R,
    calendar: Calendar,
    clock: Box<dyn Clock>,
    reminder_scheduler: Option<Box<dyn ReminderScheduler>>,
    widget_publisher: Option<Box<dyn WidgetPublisher>>,
    primary_habit: Option<HabitId>,
}

impl<R: HabitRepository> HabitServiceBuilder<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            calendar: Calendar::local(),
            clock: Box::new(SystemClock),
            reminder_scheduler: None,
            widget_publisher: None,
            primary_habit: None,
        }
    }

    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_reminder_scheduler(mut self, scheduler: Box<dyn ReminderScheduler>) -> Self {
        self.reminder_scheduler = Some(scheduler);
        self
    }

    pub fn with_widget_publisher(mut self, publisher: Box<dyn WidgetPublisher>) -> Self {
        self.widget_publisher = Some(publisher);
        self
    }

    pub fn with_primary_habit(mut self, id: Option<HabitId>) -> Self {
        self.primary_habit = id;
        self
    }

    pub fn build(self) -> HabitService<R> {
        HabitService {
            repository: RwLock::new(self.repository),
            calendar: self.calendar,
            clock: self.clock,
            reminder_scheduler: self.reminder_scheduler,
            widget_publisher: self.widget_publisher,
            primary_habit: RwLock::new(self.primary_habit),
        }
    }
}

impl<R: HabitRepository> HabitService<R> {
    pub fn builder(repository: R) -> HabitServiceBuilder<R> {
        HabitServiceBuilder::new(repository)
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.calendar.today(&self.clock.now())
    }

    pub fn habit(&self, id: &HabitId) -> HabitResult<Habit> {
        self.repository
            .read()
            .get(id)
            .ok_or(HabitError::NotFound(*id))
    }

    pub fn list(&self, query: &HabitQuery) -> Vec<Habit> {
        self.repository
            .read()
            .list(query, self.today(), &self.calendar)
    }

    pub fn leaderboard(&self, size: usize) -> Vec<LeaderboardEntry> {
        let habits = self.repository.read().all();
        query::leaderboard(&habits, size, self.today(), &self.calendar)
    }

    pub fn stats(&self, id: &HabitId) -> HabitResult<HabitStats> {
        let habit = self.habit(id)?;
        let today = self.today();
        let cal = &self.calendar;
        Ok(HabitStats {
            habit_id: habit.id,
            today_count: habit.count_on(today, cal),
            target_per_day: habit.target_per_day,
            is_done_today: habit.is_completed_on(today, cal),
            current_streak: habit.current_streak(today, cal),
            weekly_rate: habit.weekly_rate(today, cal),
            monthly_rate: habit.monthly_rate(today, cal),
            week: habit.weekly_progress(today, cal),
        })
    }

    pub fn daily_counts(&self, id: &HabitId, days: usize) -> HabitResult<Vec<(NaiveDate, usize)>> {
        let habit = self.habit(id)?;
        Ok(habit.daily_counts(days, self.today(), &self.calendar))
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub fn create_habit(&self, draft: NewHabit) -> HabitResult<Habit> {
        let draft = draft.validated()?;
        let habit = Habit::new_at(draft, self.clock.now());
        {
            let mut repo = self.repository.write();
            repo.upsert(habit.clone());
            commit_or_rollback(&mut *repo)?;
        }
        info!(habit_id = %habit.id, "habit created");
        if habit.reminder.enabled {
            self.sync_reminder(&habit);
        }
        self.publish_widget(&habit);
        Ok(habit)
    }

    #[instrument(skip(self, edit))]
    pub fn edit_habit(&self, id: &HabitId, mut edit: HabitEdit) -> HabitResult<Habit> {
        if let Some(title) = edit.title.as_mut() {
            *title = title.trim().to_string();
            if title.is_empty() {
                return Err(HabitError::Validation("title must not be empty".into()));
            }
        }
        let updated = {
            let mut repo = self.repository.write();
            let mut habit = repo.get(id).ok_or(HabitError::NotFound(*id))?;
            habit.apply_edit(edit);
            repo.upsert(habit.clone());
            commit_or_rollback(&mut *repo)?;
            habit
        };
        debug!(habit_id = %id, "habit edited");
        self.sync_reminder(&updated);
        self.publish_widget(&updated);
        Ok(updated)
    }

    /// Deletes the habit and cancels its reminder.
    #[instrument(skip(self))]
    pub fn delete_habit(&self, id: &HabitId) -> HabitResult<Habit> {
        let removed = {
            let mut repo = self.repository.write();
            let removed = repo.delete(id).ok_or(HabitError::NotFound(*id))?;
            commit_or_rollback(&mut *repo)?;
            removed
        };
        if let Some(scheduler) = &self.reminder_scheduler {
            scheduler.cancel(id);
        }
        {
            let mut primary = self.primary_habit.write();
            if primary.as_ref() == Some(id) {
                *primary = None;
            }
        }
        info!(habit_id = %id, "habit deleted");
        Ok(removed)
    }

    /// Records one completion unit on `day` (today when `None`); returns the new count.
    #[instrument(skip(self))]
    pub fn increment(&self, id: &HabitId, day: Option<NaiveDate>) -> HabitResult<usize> {
        let day = day.unwrap_or_else(|| self.today());
        let habit = self.mutate(id, |habit, cal| {
            habit.increment(day, cal);
            true
        })?;
        self.publish_widget(&habit);
        Ok(habit.count_on(day, &self.calendar))
    }

    /// Removes one completion unit on `day`; a day without entries is left as is.
    #[instrument(skip(self))]
    pub fn decrement(&self, id: &HabitId, day: Option<NaiveDate>) -> HabitResult<usize> {
        let day = day.unwrap_or_else(|| self.today());
        let mut removed = false;
        let habit = self.mutate(id, |habit, cal| {
            removed = habit.decrement(day, cal);
            removed
        })?;
        if removed {
            self.publish_widget(&habit);
        }
        Ok(habit.count_on(day, &self.calendar))
    }

    /// Pins the habit shown by the widget; `None` follows the last mutated habit.
    pub fn set_primary_habit(&self, id: Option<HabitId>) -> HabitResult<()> {
        if let Some(id) = &id {
            self.habit(id)?;
        }
        *self.primary_habit.write() = id;
        Ok(())
    }

    pub fn primary_habit(&self) -> Option<HabitId> {
        *self.primary_habit.read()
    }

    /// Republishes the widget payload without mutating anything.
    pub fn refresh_widget(&self, id: &HabitId) -> HabitResult<()> {
        let habit = self.habit(id)?;
        self.publish_widget(&habit);
        Ok(())
    }

    pub fn export(&self) -> HabitSnapshot {
        let habits = self.repository.read().all();
        HabitSnapshot::from_habits(&habits, self.clock.now())
    }

    pub fn export_json(&self) -> HabitResult<Vec<u8>> {
        self.export().to_json_pretty().map_err(HabitError::Encode)
    }

    #[instrument(skip(self, snapshot), fields(items = snapshot.len()))]
    pub fn import(&self, snapshot: &HabitSnapshot) -> HabitResult<ImportReport> {
        let mut repo = self.repository.write();
        merge::import_snapshot(&mut *repo, snapshot, self.reminder_scheduler.as_deref())
    }

    pub fn import_json(&self, bytes: &[u8]) -> HabitResult<ImportReport> {
        let snapshot = HabitSnapshot::parse(bytes)?;
        self.import(&snapshot)
    }

    /// Runs `f` against the repository under the write lock.
    pub fn with_repository<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        f(&mut *self.repository.write())
    }

    fn mutate(
        &self,
        id: &HabitId,
        change: impl FnOnce(&mut Habit, &Calendar) -> bool,
    ) -> HabitResult<Habit> {
        let mut repo = self.repository.write();
        let mut habit = repo.get(id).ok_or(HabitError::NotFound(*id))?;
        if change(&mut habit, &self.calendar) {
            repo.upsert(habit.clone());
            commit_or_rollback(&mut *repo)?;
        }
        Ok(habit)
    }

    fn sync_reminder(&self, habit: &Habit) {
        if let Some(scheduler) = &self.reminder_scheduler {
            notifications::sync_reminder(scheduler.as_ref(), habit);
        }
    }

    fn publish_widget(&self, mutated: &Habit) {
        let Some(publisher) = &self.widget_publisher else {
            return;
        };
        let pinned = self.primary_habit();
        let primary = match pinned {
            Some(id) if id != mutated.id => match self.repository.read().get(&id) {
                Some(habit) => habit,
                None => {
                    warn!(habit_id = %id, "pinned widget habit no longer exists");
                    return;
                }
            },
            _ => mutated.clone(),
        };
        publisher.publish(WidgetSnapshot::for_habit(
            &primary,
            self.today(),
            &self.calendar,
        ));
    }
}

fn commit_or_rollback<R: HabitRepository + ?Sized>(repo: &mut R) -> Result<(), PersistenceError> {
    repo.commit().map_err(|err| {
        warn!(%err, "commit failed, rolling back");
        repo.rollback();
        err
    })
}
