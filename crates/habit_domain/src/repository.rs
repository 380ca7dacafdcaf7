//! Storage contract for the habit collection.
//!
//! Writes are staged: `upsert` and `delete` change the working set, `commit`
//! persists every pending change at once and `rollback` discards them. Reads
//! observe the working set.

use chrono::NaiveDate;

use crate::calendar::Calendar;
use crate::error::PersistenceError;
use crate::habit::{Habit, HabitId};
use crate::query::HabitQuery;

pub trait HabitRepository {
    fn get(&self, id: &HabitId) -> Option<Habit>;

    /// Every habit in insertion order.
    fn all(&self) -> Vec<Habit>;

    fn list(&self, query: &HabitQuery, today: NaiveDate, calendar: &Calendar) -> Vec<Habit> {
        query.apply(self.all(), today, calendar)
    }

    /// Inserts the habit, or replaces the one with the same id in place.
    fn upsert(&mut self, habit: Habit);

    fn delete(&mut self, id: &HabitId) -> Option<Habit>;

    fn commit(&mut self) -> Result<(), PersistenceError>;

    fn rollback(&mut self);
}

/// Keeps a committed collection plus a working copy of pending changes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHabitRepository {
    committed: Vec<Habit>,
    working: Vec<Habit>,
}

impl InMemoryHabitRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `habits` already committed. Later duplicates of an id win.
    pub fn with_habits(habits: impl IntoIterator<Item = Habit>) -> Self {
        let mut repo = Self::new();
        for habit in habits {
            repo.upsert(habit);
        }
        repo.committed = repo.working.clone();
        repo
    }

    pub fn committed(&self) -> &[Habit] {
        &self.committed
    }

    pub fn has_pending_changes(&self) -> bool {
        self.committed != self.working
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    fn position(&self, id: &HabitId) -> Option<usize> {
        self.working.iter().position(|habit| habit.id == *id)
    }
}

impl HabitRepository for InMemoryHabitRepository {
    fn get(&self, id: &HabitId) -> Option<Habit> {
        self.position(id).map(|idx| self.working[idx].clone())
    }

    fn all(&self) -> Vec<Habit> {
        self.working.clone()
    }

    fn upsert(&mut self, habit: Habit) {
        match self.position(&habit.id) {
            Some(idx) => self.working[idx] = habit,
            None => self.working.push(habit),
        }
    }

    fn delete(&mut self, id: &HabitId) -> Option<Habit> {
        self.position(id).map(|idx| self.working.remove(idx))
    }

    fn commit(&mut self) -> Result<(), PersistenceError> {
        self.committed = self.working.clone();
        Ok(())
    }

    fn rollback(&mut self) {
        self.working = self.committed.clone();
    }
}
