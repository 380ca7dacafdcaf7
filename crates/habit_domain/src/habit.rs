use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{self, Calendar};
use crate::color::HexColor;
use crate::error::{HabitError, HabitResult};

pub const DEFAULT_ICON: &str = "checkmark.circle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(Uuid);

impl HabitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Identifier of the daily reminder registered for this habit.
    pub fn reminder_key(&self) -> String {
        format!("habit-{}", self.0.to_string().to_uppercase())
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for HabitId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Daily reminder settings. Independent of completion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub enabled: bool,
    pub hour: u8,
    pub minute: u8,
}

impl Reminder {
    /// Returns `None` unless `hour` is 0-23 and `minute` is 0-59.
    pub fn new(enabled: bool, hour: u8, minute: u8) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self {
            enabled,
            hour,
            minute,
        })
    }

    pub fn daily_at(hour: u8, minute: u8) -> Option<Self> {
        Self::new(true, hour, minute)
    }

    pub fn time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
    }
}

impl Default for Reminder {
    fn default() -> Self {
        Self {
            enabled: false,
            hour: 9,
            minute: 0,
        }
    }
}

/// Everything a caller chooses when creating a habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHabit {
    pub title: String,
    pub icon: String,
    pub color: HexColor,
    pub notes: String,
    pub target_per_day: u32,
    pub tags: Vec<String>,
    pub reminder: Reminder,
}

impl NewHabit {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Trims free text and rejects an empty title.
    pub fn validated(mut self) -> HabitResult<Self> {
        self.title = self.title.trim().to_string();
        self.notes = self.notes.trim().to_string();
        if self.title.is_empty() {
            return Err(HabitError::Validation("title must not be empty".into()));
        }
        Ok(self)
    }
}

impl Default for NewHabit {
    fn default() -> Self {
        Self {
            title: String::new(),
            icon: DEFAULT_ICON.to_string(),
            color: HexColor::default(),
            notes: String::new(),
            target_per_day: 1,
            tags: Vec::new(),
            reminder: Reminder::default(),
        }
    }
}

/// Field edits; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitEdit {
    pub title: Option<String>,
    pub icon: Option<String>,
    pub color: Option<HexColor>,
    pub notes: Option<String>,
    pub target_per_day: Option<u32>,
    pub tags: Option<Vec<String>>,
    pub reminder: Option<Reminder>,
}

impl HabitEdit {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayProgress {
    pub date: NaiveDate,
    pub done: bool,
}

/// A tracked habit and its completion log.
///
/// `completions` is a multiset: each element is one completion unit on the
/// calendar day it falls in. Entries on the same day are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    pub icon: String,
    pub color: HexColor,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub target_per_day: u32,
    pub completions: Vec<DateTime<Utc>>,
    pub reminder: Reminder,
    pub tags: Vec<String>,
}

impl Habit {
    pub fn new(draft: NewHabit) -> Self {
        Self::new_at(draft, Utc::now())
    }

    pub fn new_at(draft: NewHabit, created_at: DateTime<Utc>) -> Self {
        Self {
            id: HabitId::new(),
            title: draft.title,
            icon: draft.icon,
            color: draft.color,
            notes: draft.notes,
            created_at,
            target_per_day: draft.target_per_day.max(1),
            completions: Vec::new(),
            reminder: draft.reminder,
            tags: draft.tags,
        }
    }

    /// Replaces the generated identity with an imported one.
    pub fn adopt_identity(&mut self, id: HabitId, created_at: DateTime<Utc>) {
        self.id = id;
        self.created_at = created_at;
    }

    /// Overwrites every stored field except `id` with the values of `other`.
    pub fn overwrite_from(&mut self, other: Habit) {
        self.title = other.title;
        self.icon = other.icon;
        self.color = other.color;
        self.notes = other.notes;
        self.created_at = other.created_at;
        self.target_per_day = other.target_per_day.max(1);
        self.completions = other.completions;
        self.reminder = other.reminder;
        self.tags = other.tags;
    }

    pub fn apply_edit(&mut self, edit: HabitEdit) {
        if let Some(title) = edit.title {
            self.title = title;
        }
        if let Some(icon) = edit.icon {
            self.icon = icon;
        }
        if let Some(color) = edit.color {
            self.color = color;
        }
        if let Some(notes) = edit.notes {
            self.notes = notes;
        }
        if let Some(target) = edit.target_per_day {
            self.target_per_day = target.max(1);
        }
        if let Some(tags) = edit.tags {
            self.tags = tags;
        }
        if let Some(reminder) = edit.reminder {
            self.reminder = reminder;
        }
    }

    pub fn tags_display(&self) -> String {
        self.tags.join(", ")
    }

    /// Case-insensitive match against the title or the comma-joined tags.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.tags.join(",").to_lowercase().contains(&needle)
    }

    /// Records one completion unit on `day`. No upper bound is enforced.
    pub fn increment(&mut self, day: NaiveDate, calendar: &Calendar) {
        self.completions.push(calendar.start_of(day));
    }

    /// Removes one completion unit on `day`; returns `false` when there was none.
    ///
    /// The most recently inserted entry is removed. Same-day entries are
    /// fungible, so the choice is not observable through any other operation.
    pub fn decrement(&mut self, day: NaiveDate, calendar: &Calendar) -> bool {
        let position = self
            .completions
            .iter()
            .rposition(|entry| calendar.day_of(entry) == day);
        match position {
            Some(idx) => {
                self.completions.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn count_on(&self, day: NaiveDate, calendar: &Calendar) -> usize {
        self.completions
            .iter()
            .filter(|entry| calendar.day_of(entry) == day)
            .count()
    }

    pub fn is_completed_on(&self, day: NaiveDate, calendar: &Calendar) -> bool {
        self.count_on(day, calendar) >= self.target() as usize
    }

    /// Consecutive completed days walking back from `today`.
    pub fn current_streak(&self, today: NaiveDate, calendar: &Calendar) -> u32 {
        let counts = self.day_counts(calendar);
        let mut streak = 0;
        let mut day = today;
        while self.meets_target(&counts, day) {
            streak += 1;
            match day.pred_opt() {
                Some(previous) => day = previous,
                None => break,
            }
        }
        streak
    }

    /// The seven days ending at `ending_at`, oldest first.
    pub fn weekly_progress(&self, ending_at: NaiveDate, calendar: &Calendar) -> [DayProgress; 7] {
        let counts = self.day_counts(calendar);
        std::array::from_fn(|idx| {
            let date = calendar::days_before(ending_at, 6 - idx as u64);
            DayProgress {
                date,
                done: self.meets_target(&counts, date),
            }
        })
    }

    /// Share of completed days in `[start, end]`, both ends inclusive.
    pub fn completion_rate(&self, start: NaiveDate, end: NaiveDate, calendar: &Calendar) -> f64 {
        let days = calendar::days_inclusive(start, end);
        if days == 0 {
            return 0.0;
        }
        let counts = self.day_counts(calendar);
        let completed = (0..days)
            .filter_map(|offset| start.checked_add_days(Days::new(offset as u64)))
            .filter(|day| self.meets_target(&counts, *day))
            .count();
        completed as f64 / days as f64
    }

    pub fn weekly_rate(&self, reference: NaiveDate, calendar: &Calendar) -> f64 {
        self.completion_rate(calendar::days_before(reference, 6), reference, calendar)
    }

    pub fn monthly_rate(&self, reference: NaiveDate, calendar: &Calendar) -> f64 {
        let (first, last) = calendar::month_bounds(reference);
        self.completion_rate(first, last, calendar)
    }

    /// Per-day completion counts for the `days` days ending at `ending_at`, oldest first.
    pub fn daily_counts(
        &self,
        days: usize,
        ending_at: NaiveDate,
        calendar: &Calendar,
    ) -> Vec<(NaiveDate, usize)> {
        let counts = self.day_counts(calendar);
        (0..days as u64)
            .rev()
            .filter_map(|offset| ending_at.checked_sub_days(Days::new(offset)))
            .map(|day| (day, counts.get(&day).copied().unwrap_or(0)))
            .collect()
    }

    fn target(&self) -> u32 {
        self.target_per_day.max(1)
    }

    fn day_counts(&self, calendar: &Calendar) -> HashMap<NaiveDate, usize> {
        let mut counts = HashMap::new();
        for entry in &self.completions {
            *counts.entry(calendar.day_of(entry)).or_insert(0) += 1;
        }
        counts
    }

    fn meets_target(&self, counts: &HashMap<NaiveDate, usize>, day: NaiveDate) -> bool {
        counts.get(&day).copied().unwrap_or(0) >= self.target() as usize
    }
}

/// Splits comma-separated tag input, trimming and dropping empty entries.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn habit_with_target(target: u32) -> Habit {
        Habit::new(NewHabit {
            target_per_day: target,
            ..NewHabit::titled("Read")
        })
    }

    #[test]
    fn target_is_clamped_to_one() {
        let habit = habit_with_target(0);
        assert_eq!(habit.target_per_day, 1);

        let mut edited = habit_with_target(3);
        edited.apply_edit(HabitEdit {
            target_per_day: Some(0),
            ..HabitEdit::default()
        });
        assert_eq!(edited.target_per_day, 1);
    }

    #[test]
    fn increment_and_decrement_against_target() {
        let cal = Calendar::utc();
        let day1 = date(2025, 5, 1);
        let mut habit = habit_with_target(2);

        habit.increment(day1, &cal);
        habit.increment(day1, &cal);
        assert_eq!(habit.count_on(day1, &cal), 2);
        assert!(habit.is_completed_on(day1, &cal));

        assert!(habit.decrement(day1, &cal));
        assert_eq!(habit.count_on(day1, &cal), 1);
        assert!(!habit.is_completed_on(day1, &cal));
    }

    #[test]
    fn decrement_without_match_is_a_no_op() {
        let cal = Calendar::utc();
        let mut habit = habit_with_target(1);
        habit.increment(date(2025, 5, 1), &cal);
        assert!(!habit.decrement(date(2025, 5, 2), &cal));
        assert_eq!(habit.completions.len(), 1);
    }

    #[test]
    fn increments_are_stored_at_start_of_day() {
        let cal = Calendar::from_offset_minutes(120).unwrap();
        let mut habit = habit_with_target(1);
        habit.increment(date(2025, 5, 1), &cal);
        assert_eq!(
            habit.completions[0],
            Utc.with_ymd_and_hms(2025, 4, 30, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn excess_increments_are_kept() {
        let cal = Calendar::utc();
        let day = date(2025, 5, 1);
        let mut habit = habit_with_target(1);
        for _ in 0..4 {
            habit.increment(day, &cal);
        }
        assert_eq!(habit.count_on(day, &cal), 4);
        assert!(habit.is_completed_on(day, &cal));
    }

    #[test]
    fn raw_timestamps_count_by_calendar_day() {
        let cal = Calendar::utc();
        let mut habit = habit_with_target(2);
        habit.completions = vec![
            Utc.with_ymd_and_hms(2025, 5, 1, 6, 15, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 5, 1, 21, 40, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 1).unwrap(),
        ];
        assert_eq!(habit.count_on(date(2025, 5, 1), &cal), 2);
        assert_eq!(habit.count_on(date(2025, 5, 2), &cal), 1);
    }

    #[test]
    fn streak_stops_at_first_gap() {
        let cal = Calendar::utc();
        let today = date(2025, 6, 10);
        let mut habit = habit_with_target(1);
        for offset in 0..3 {
            habit.increment(today - Duration::days(offset), &cal);
        }
        habit.increment(today - Duration::days(4), &cal);
        assert_eq!(habit.current_streak(today, &cal), 3);
    }

    #[test]
    fn streak_is_zero_when_today_is_open() {
        let cal = Calendar::utc();
        let today = date(2025, 6, 10);
        let mut habit = habit_with_target(1);
        habit.increment(today - Duration::days(1), &cal);
        habit.increment(today - Duration::days(2), &cal);
        assert_eq!(habit.current_streak(today, &cal), 0);
        assert_eq!(habit.current_streak(today - Duration::days(1), &cal), 2);
    }

    #[test]
    fn streak_never_grows_as_days_pass_without_completions() {
        let cal = Calendar::utc();
        let start = date(2025, 6, 10);
        let mut habit = habit_with_target(1);
        for offset in 0..5 {
            habit.increment(start - Duration::days(offset), &cal);
        }
        let mut previous = habit.current_streak(start, &cal);
        for day in 1..4 {
            let streak = habit.current_streak(start + Duration::days(day), &cal);
            assert!(streak <= previous);
            assert_eq!(streak, 0);
            previous = streak;
        }
    }

    #[test]
    fn weekly_progress_is_oldest_first() {
        let cal = Calendar::utc();
        let end = date(2025, 6, 10);
        let mut habit = habit_with_target(1);
        habit.increment(end, &cal);
        habit.increment(date(2025, 6, 4), &cal);

        let week = habit.weekly_progress(end, &cal);
        assert_eq!(week[0].date, date(2025, 6, 4));
        assert_eq!(week[6].date, end);
        let done: Vec<bool> = week.iter().map(|d| d.done).collect();
        assert_eq!(done, vec![true, false, false, false, false, false, true]);
    }

    #[test]
    fn completion_rate_edges() {
        let cal = Calendar::utc();
        let start = date(2025, 1, 1);
        let end = date(2025, 1, 4);
        let mut habit = habit_with_target(1);

        assert_eq!(habit.completion_rate(end, start, &cal), 0.0);
        assert_eq!(habit.completion_rate(start, end, &cal), 0.0);

        habit.increment(date(2025, 1, 2), &cal);
        assert_eq!(habit.completion_rate(start, end, &cal), 0.25);

        for day in 1..=4 {
            habit.increment(date(2025, 1, day), &cal);
        }
        assert_eq!(habit.completion_rate(start, end, &cal), 1.0);
        assert_eq!(habit.completion_rate(start, start, &cal), 1.0);
    }

    #[test]
    fn weekly_rate_covers_reference_and_six_prior_days() {
        let cal = Calendar::utc();
        let reference = date(2025, 3, 10);
        let mut habit = habit_with_target(1);
        habit.increment(reference, &cal);
        habit.increment(date(2025, 3, 4), &cal);
        habit.increment(date(2025, 3, 3), &cal);
        assert!((habit.weekly_rate(reference, &cal) - 2.0 / 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn monthly_rate_for_thirty_day_month() {
        let cal = Calendar::utc();
        let mut habit = habit_with_target(1);
        for day in (1..=30).step_by(2) {
            habit.increment(date(2025, 9, day), &cal);
        }
        assert_eq!(habit.monthly_rate(date(2025, 9, 18), &cal), 0.5);
    }

    #[test]
    fn monthly_rate_uses_leap_february() {
        let cal = Calendar::utc();
        let mut habit = habit_with_target(1);
        for day in 1..=29 {
            habit.increment(date(2024, 2, day), &cal);
        }
        assert_eq!(habit.monthly_rate(date(2024, 2, 1), &cal), 1.0);
    }

    #[test]
    fn daily_counts_series() {
        let cal = Calendar::utc();
        let end = date(2025, 6, 10);
        let mut habit = habit_with_target(3);
        habit.increment(end, &cal);
        habit.increment(end, &cal);
        habit.increment(date(2025, 6, 8), &cal);
        let series = habit.daily_counts(3, end, &cal);
        assert_eq!(
            series,
            vec![(date(2025, 6, 8), 1), (date(2025, 6, 9), 0), (end, 2)]
        );
    }

    #[test]
    fn search_matches_title_and_tags() {
        let habit = Habit::new(NewHabit {
            tags: vec!["Health".into(), "morning".into()],
            ..NewHabit::titled("Stretch")
        });
        assert!(habit.matches_search("stret"));
        assert!(habit.matches_search("HEALTH"));
        assert!(habit.matches_search("health,morn"));
        assert!(!habit.matches_search("evening"));
        assert!(habit.matches_search("  "));
        assert_eq!(habit.tags_display(), "Health, morning");
    }

    #[test]
    fn tag_parsing_drops_blanks() {
        assert_eq!(parse_tags(" a, b ,, c ,"), vec!["a", "b", "c"]);
        assert!(parse_tags(" , ").is_empty());
    }

    #[test]
    fn validated_rejects_blank_titles() {
        assert!(NewHabit::titled("   ").validated().is_err());
        let draft = NewHabit::titled("  Walk ").validated().unwrap();
        assert_eq!(draft.title, "Walk");
    }

    #[test]
    fn reminder_bounds() {
        assert!(Reminder::new(true, 24, 0).is_none());
        assert!(Reminder::new(true, 23, 60).is_none());
        let reminder = Reminder::daily_at(7, 30).unwrap();
        assert_eq!(reminder.time(), NaiveTime::from_hms_opt(7, 30, 0));
    }

    #[test]
    fn reminder_key_uses_uppercase_uuid() {
        let id: HabitId = "6f9619ff-8b86-d011-b42d-00c04fc964ff".parse().unwrap();
        assert_eq!(id.reminder_key(), "habit-6F9619FF-8B86-D011-B42D-00C04FC964FF");
    }

    #[test]
    fn earliest_date_does_not_underflow() {
        let cal = Calendar::utc();
        let mut habit = Habit::new(NewHabit::titled("Ancient"));
        habit.increment(NaiveDate::MIN, &cal);

        assert_eq!(habit.count_on(NaiveDate::MIN, &cal), 1);
        assert_eq!(habit.weekly_rate(NaiveDate::MIN, &cal), 1.0);
        let week = habit.weekly_progress(NaiveDate::MIN, &cal);
        assert!(week.iter().all(|day| day.date == NaiveDate::MIN));
        assert_eq!(habit.daily_counts(3, NaiveDate::MIN, &cal), vec![(NaiveDate::MIN, 1)]);
        assert_eq!(habit.current_streak(NaiveDate::MIN, &cal), 1);
    }
}
