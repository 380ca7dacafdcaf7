use std::cmp::Reverse;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::habit::{Habit, HabitId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Most recently created first.
    #[default]
    Newest,
    /// Longest current streak first.
    Streak,
    /// Highest seven-day completion rate first.
    Weekly,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitQuery {
    pub search: Option<String>,
    pub sort: SortKey,
}

impl HabitQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn sorted_by(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn apply(&self, habits: Vec<Habit>, today: NaiveDate, calendar: &Calendar) -> Vec<Habit> {
        let mut selected: Vec<Habit> = match self.search.as_deref() {
            Some(needle) => habits
                .into_iter()
                .filter(|habit| habit.matches_search(needle))
                .collect(),
            None => habits,
        };
        match self.sort {
            SortKey::Newest => selected.sort_by_key(|habit| Reverse(habit.created_at)),
            SortKey::Streak => {
                selected.sort_by_cached_key(|habit| Reverse(habit.current_streak(today, calendar)))
            }
            SortKey::Weekly => {
                let mut keyed: Vec<(f64, Habit)> = selected
                    .into_iter()
                    .map(|habit| (habit.weekly_rate(today, calendar), habit))
                    .collect();
                keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
                selected = keyed.into_iter().map(|(_, habit)| habit).collect();
            }
        }
        selected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub habit_id: HabitId,
    pub title: String,
    pub streak: u32,
}

/// The `size` habits with the longest current streak.
pub fn leaderboard(
    habits: &[Habit],
    size: usize,
    today: NaiveDate,
    calendar: &Calendar,
) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = habits
        .iter()
        .map(|habit| LeaderboardEntry {
            habit_id: habit.id,
            title: habit.title.clone(),
            streak: habit.current_streak(today, calendar),
        })
        .collect();
    entries.sort_by_key(|entry| Reverse(entry.streak));
    entries.truncate(size);
    entries
}
