use std::path::PathBuf;

use anyhow::{Context, Result};
use habit_domain::{service::DEFAULT_LEADERBOARD_SIZE, Calendar, HabitId, HabitService};
use tracing::{info, warn};

use crate::bridge::{FileReminderRegistry, FileWidgetPublisher, REMINDERS_FILE};
use crate::store::{JsonFileRepository, HABITS_FILE};

pub type AppService = HabitService<JsonFileRepository>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub utc_offset_minutes: Option<i32>,
    pub primary_habit: Option<HabitId>,
    pub leaderboard_size: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_vars(std::env::vars()))
    }

    /// Reads `HABIT_*` settings from `vars`; unparsable values keep their defaults.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut config = Self::default();
        for (key, value) in vars {
            let value = value.trim();
            match key.as_str() {
                "HABIT_DATA_DIR" if !value.is_empty() => {
                    config.data_dir = PathBuf::from(value);
                }
                "HABIT_UTC_OFFSET_MINUTES" => match value.parse::<i32>() {
                    Ok(minutes) if Calendar::from_offset_minutes(minutes).is_some() => {
                        config.utc_offset_minutes = Some(minutes);
                    }
                    _ => warn!(value, "ignoring invalid HABIT_UTC_OFFSET_MINUTES"),
                },
                "HABIT_PRIMARY_ID" => match value.parse::<HabitId>() {
                    Ok(id) => config.primary_habit = Some(id),
                    Err(err) => warn!(value, %err, "ignoring invalid HABIT_PRIMARY_ID"),
                },
                "HABIT_LEADERBOARD_SIZE" => {
                    if let Ok(size) = value.parse::<usize>() {
                        if size > 0 {
                            config.leaderboard_size = size;
                        }
                    }
                }
                _ => {}
            }
        }
        config
    }

    pub fn calendar(&self) -> Calendar {
        self.utc_offset_minutes
            .and_then(Calendar::from_offset_minutes)
            .unwrap_or_else(Calendar::local)
    }

    pub fn habits_path(&self) -> PathBuf {
        self.data_dir.join(HABITS_FILE)
    }

    pub fn build_service(&self) -> Result<AppService> {
        let repository = JsonFileRepository::open(self.habits_path())
            .with_context(|| format!("failed to load {}", self.habits_path().display()))?;
        info!(data_dir = %self.data_dir.display(), "habit store ready");
        Ok(HabitService::builder(repository)
            .with_calendar(self.calendar())
            .with_reminder_scheduler(Box::new(FileReminderRegistry::new(
                self.data_dir.join(REMINDERS_FILE),
            )))
            .with_widget_publisher(Box::new(FileWidgetPublisher::new(&self.data_dir)))
            .with_primary_habit(self.primary_habit)
            .build())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("habit-data"),
            utc_offset_minutes: None,
            primary_habit: None,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
        }
    }
}
