use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::color::HexColor;
use crate::error::DecodeError;
use crate::habit::{Habit, HabitId, NewHabit, Reminder};

/// One flattened habit as it appears in an export file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    pub id: HabitId,
    pub title: String,
    pub icon: String,
    pub color_hex: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub target_per_day: i64,
    pub completions: Vec<DateTime<Utc>>,
    pub remind_enabled: bool,
    pub reminder_hour: i64,
    pub reminder_minute: i64,
    pub tags: Vec<String>,
}

impl HabitRecord {
    pub fn from_habit(habit: &Habit) -> Self {
        Self {
            id: habit.id,
            title: habit.title.clone(),
            icon: habit.icon.clone(),
            color_hex: habit.color.as_str().to_string(),
            notes: habit.notes.clone(),
            created_at: habit.created_at,
            target_per_day: i64::from(habit.target_per_day),
            completions: habit.completions.clone(),
            remind_enabled: habit.reminder.enabled,
            reminder_hour: i64::from(habit.reminder.hour),
            reminder_minute: i64::from(habit.reminder.minute),
            tags: habit.tags.clone(),
        }
    }

    /// Builds a habit carrying this record's identity and every stored field.
    ///
    /// `targetPerDay` below one is clamped; an unparseable color or an
    /// out-of-range reminder time is rejected.
    pub fn to_habit(&self) -> Result<Habit, DecodeError> {
        let color = HexColor::parse(&self.color_hex)
            .map_err(|err| self.invalid("colorHex", err))?;
        let hour = bounded(self.reminder_hour, 23).ok_or_else(|| {
            self.invalid("reminderHour", format!("{} is outside 0-23", self.reminder_hour))
        })?;
        let minute = bounded(self.reminder_minute, 59).ok_or_else(|| {
            self.invalid(
                "reminderMinute",
                format!("{} is outside 0-59", self.reminder_minute),
            )
        })?;
        let reminder = Reminder {
            enabled: self.remind_enabled,
            hour,
            minute,
        };
        let target_per_day = self.target_per_day.clamp(1, i64::from(u32::MAX)) as u32;

        let mut habit = Habit::new_at(
            NewHabit {
                title: self.title.clone(),
                icon: self.icon.clone(),
                color,
                notes: self.notes.clone(),
                target_per_day,
                tags: self.tags.clone(),
                reminder,
            },
            self.created_at,
        );
        habit.adopt_identity(self.id, self.created_at);
        habit.completions = self.completions.clone();
        Ok(habit)
    }

    fn invalid(&self, field: &'static str, reason: impl ToString) -> DecodeError {
        DecodeError::InvalidField {
            id: self.id,
            field,
            reason: reason.to_string(),
        }
    }
}

fn bounded(value: i64, max: u8) -> Option<u8> {
    u8::try_from(value).ok().filter(|v| *v <= max)
}

/// Point-in-time export of the whole habit collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSnapshot {
    pub exported_at: DateTime<Utc>,
    pub items: Vec<HabitRecord>,
}

impl HabitSnapshot {
    pub fn from_habits<'a>(
        habits: impl IntoIterator<Item = &'a Habit>,
        exported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            exported_at,
            items: habits.into_iter().map(HabitRecord::from_habit).collect(),
        }
    }

    /// Unknown extra fields are ignored; missing or mistyped ones are errors.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn to_json_pretty(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Decodes every record, failing on the first invalid one.
    pub fn decode_habits(&self) -> Result<Vec<Habit>, DecodeError> {
        self.items.iter().map(HabitRecord::to_habit).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Suggested file name for an export taken on `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("HabitExport-{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;
    use chrono::TimeZone;

    fn sample_habit() -> Habit {
        let cal = Calendar::utc();
        let mut habit = Habit::new_at(
            NewHabit {
                color: HexColor::parse("FF8800").unwrap(),
                notes: "after lunch".into(),
                target_per_day: 2,
                tags: vec!["health".into()],
                reminder: Reminder::daily_at(21, 15).unwrap(),
                ..NewHabit::titled("Walk")
            },
            Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        );
        habit.increment(NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(), &cal);
        habit
            .completions
            .push(Utc.with_ymd_and_hms(2025, 1, 3, 17, 45, 12).unwrap());
        habit
    }

    #[test]
    fn export_uses_the_documented_field_names() {
        let habit = sample_habit();
        let snapshot = HabitSnapshot::from_habits(
            [&habit],
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        );
        let value: serde_json::Value =
            serde_json::from_slice(&snapshot.to_json().unwrap()).unwrap();
        assert!(value["exportedAt"].is_string());
        let item = &value["items"][0];
        for key in [
            "id",
            "title",
            "icon",
            "colorHex",
            "notes",
            "createdAt",
            "targetPerDay",
            "completions",
            "remindEnabled",
            "reminderHour",
            "reminderMinute",
            "tags",
        ] {
            assert!(item.get(key).is_some(), "missing {key}");
        }
        assert_eq!(item["colorHex"], "FF8800");
        assert_eq!(item["reminderHour"], 21);
        assert_eq!(item["completions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn records_preserve_raw_completion_timestamps() {
        let habit = sample_habit();
        let snapshot = HabitSnapshot::from_habits([&habit], Utc::now());
        let bytes = snapshot.to_json_pretty().unwrap();
        let parsed = HabitSnapshot::parse(&bytes).unwrap();
        let decoded = parsed.decode_habits().unwrap();
        assert_eq!(decoded, vec![habit]);
    }

    #[test]
    fn parse_ignores_unknown_fields() {
        let raw = r#"{
            "exportedAt": "2025-02-01T00:00:00Z",
            "schemaVersion": 3,
            "items": [{
                "id": "0b1e7c1e-4d9a-4f4e-9a43-0c6b1f3f1a22",
                "title": "Meditate",
                "icon": "leaf",
                "colorHex": "00AA88",
                "notes": "",
                "createdAt": "2024-12-31T08:00:00Z",
                "targetPerDay": 1,
                "completions": ["2025-01-01T00:00:00Z"],
                "remindEnabled": false,
                "reminderHour": 9,
                "reminderMinute": 0,
                "tags": [],
                "archived": true
            }]
        }"#;
        let snapshot = HabitSnapshot::parse(raw.as_bytes()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.items[0].title, "Meditate");
    }

    #[test]
    fn parse_rejects_missing_fields_wrong_types_and_truncation() {
        let missing = r#"{"exportedAt":"2025-02-01T00:00:00Z","items":[{"id":"0b1e7c1e-4d9a-4f4e-9a43-0c6b1f3f1a22","title":"x"}]}"#;
        assert!(matches!(
            HabitSnapshot::parse(missing.as_bytes()),
            Err(DecodeError::Malformed(_))
        ));

        let wrong_type = r#"{"exportedAt":"2025-02-01T00:00:00Z","items":"nope"}"#;
        assert!(HabitSnapshot::parse(wrong_type.as_bytes()).is_err());

        let bytes = HabitSnapshot::from_habits([&sample_habit()], Utc::now())
            .to_json()
            .unwrap();
        assert!(HabitSnapshot::parse(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn decode_rejects_out_of_range_reminders_and_bad_colors() {
        let mut record = HabitRecord::from_habit(&sample_habit());
        record.reminder_hour = 24;
        assert!(matches!(
            record.to_habit(),
            Err(DecodeError::InvalidField {
                field: "reminderHour",
                ..
            })
        ));

        let mut record = HabitRecord::from_habit(&sample_habit());
        record.reminder_minute = -1;
        assert!(matches!(
            record.to_habit(),
            Err(DecodeError::InvalidField {
                field: "reminderMinute",
                ..
            })
        ));

        let mut record = HabitRecord::from_habit(&sample_habit());
        record.color_hex = "purple".into();
        assert!(matches!(
            record.to_habit(),
            Err(DecodeError::InvalidField {
                field: "colorHex",
                ..
            })
        ));
    }

    #[test]
    fn decode_clamps_target() {
        let mut record = HabitRecord::from_habit(&sample_habit());
        record.target_per_day = 0;
        assert_eq!(record.to_habit().unwrap().target_per_day, 1);
    }

    #[test]
    fn export_file_name_is_dated() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 3).unwrap();
        assert_eq!(export_file_name(date), "HabitExport-2025-10-03.json");
    }
}
