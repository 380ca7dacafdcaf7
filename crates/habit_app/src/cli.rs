use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};
use clap::{Parser, Subcommand, ValueEnum};
use habit_domain::{
    color::HexColor,
    habit::parse_tags,
    query::{HabitQuery, SortKey},
    snapshot::export_file_name,
    HabitEdit, HabitId, NewHabit, Reminder,
};

use crate::app::{AppConfig, AppService};

#[derive(Parser, Debug)]
#[command(name = "habit", version, about = "Track daily habits")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a habit
    Add {
        title: String,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long, value_parser = HexColor::parse)]
        color: Option<HexColor>,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long, default_value_t = 1)]
        target: u32,
        /// Comma separated
        #[arg(long, default_value = "")]
        tags: String,
        /// Daily reminder at HH:MM
        #[arg(long, value_parser = parse_time)]
        remind: Option<NaiveTime>,
    },
    /// List habits
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = SortArg::Newest)]
        sort: SortArg,
    },
    /// Record one completion
    Done {
        id: HabitId,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Remove one completion
    Undo {
        id: HabitId,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show streak, rates and recent history
    Stats {
        id: HabitId,
        #[arg(long, default_value_t = habit_domain::service::DEFAULT_CHART_DAYS)]
        days: usize,
    },
    /// Change habit fields
    Edit {
        id: HabitId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long, value_parser = HexColor::parse)]
        color: Option<HexColor>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        target: Option<u32>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long, value_parser = parse_time, conflicts_with = "no_remind")]
        remind: Option<NaiveTime>,
        #[arg(long)]
        no_remind: bool,
    },
    /// Delete a habit and its reminder
    Delete { id: HabitId },
    /// Longest current streaks
    Leaderboard {
        #[arg(long)]
        size: Option<usize>,
    },
    /// Write every habit to a snapshot file
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Merge a snapshot file into the collection
    Import { path: PathBuf },
    /// Republish the widget payload
    Widget { id: HabitId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Newest,
    Streak,
    Weekly,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Newest => SortKey::Newest,
            SortArg::Streak => SortKey::Streak,
            SortArg::Weekly => SortKey::Weekly,
        }
    }
}

fn parse_time(input: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|err| format!("expected HH:MM: {err}"))
}

fn reminder_at(time: NaiveTime) -> Result<Reminder> {
    match Reminder::daily_at(time.hour() as u8, time.minute() as u8) {
        Some(reminder) => Ok(reminder),
        None => bail!("invalid reminder time {time}"),
    }
}

pub fn execute(
    config: &AppConfig,
    service: &AppService,
    command: Command,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Add {
            title,
            icon,
            color,
            notes,
            target,
            tags,
            remind,
        } => {
            let mut draft = NewHabit {
                notes,
                target_per_day: target,
                tags: parse_tags(&tags),
                ..NewHabit::titled(title)
            };
            if let Some(icon) = icon {
                draft.icon = icon;
            }
            if let Some(color) = color {
                draft.color = color;
            }
            if let Some(time) = remind {
                draft.reminder = reminder_at(time)?;
            }
            let habit = service.create_habit(draft)?;
            writeln!(out, "{}\t{}", habit.id, habit.title)?;
        }
        Command::List { search, sort } => {
            let mut query = HabitQuery::new().sorted_by(sort.into());
            if let Some(needle) = search {
                query = query.search(needle);
            }
            let today = service.today();
            for habit in service.list(&query) {
                writeln!(
                    out,
                    "{}\t{}\t{}/{}\tstreak {}\t{}",
                    habit.id,
                    habit.title,
                    habit.count_on(today, service.calendar()),
                    habit.target_per_day,
                    habit.current_streak(today, service.calendar()),
                    habit.tags_display(),
                )?;
            }
        }
        Command::Done { id, date } => {
            let count = service.increment(&id, date)?;
            writeln!(out, "{count}")?;
        }
        Command::Undo { id, date } => {
            let count = service.decrement(&id, date)?;
            writeln!(out, "{count}")?;
        }
        Command::Stats { id, days } => {
            let habit = service.habit(&id)?;
            let stats = service.stats(&id)?;
            writeln!(out, "{}", habit.title)?;
            writeln!(out, "today: {}/{}", stats.today_count, stats.target_per_day)?;
            writeln!(out, "streak: {}", stats.current_streak)?;
            writeln!(out, "week: {:.0}%", stats.weekly_rate * 100.0)?;
            writeln!(out, "month: {:.0}%", stats.monthly_rate * 100.0)?;
            let week: String = stats
                .week
                .iter()
                .map(|day| if day.done { '#' } else { '.' })
                .collect();
            writeln!(out, "last 7 days: {week}")?;
            for (date, count) in service.daily_counts(&id, days)? {
                writeln!(out, "{date}\t{count}")?;
            }
        }
        Command::Edit {
            id,
            title,
            icon,
            color,
            notes,
            target,
            tags,
            remind,
            no_remind,
        } => {
            let reminder = match (remind, no_remind) {
                (Some(time), _) => Some(reminder_at(time)?),
                (None, true) => {
                    let current = service.habit(&id)?.reminder;
                    Some(Reminder {
                        enabled: false,
                        ..current
                    })
                }
                (None, false) => None,
            };
            let edit = HabitEdit {
                title,
                icon,
                color,
                notes,
                target_per_day: target,
                tags: tags.as_deref().map(parse_tags),
                reminder,
            };
            if edit.is_empty() {
                bail!("nothing to change");
            }
            let habit = service.edit_habit(&id, edit)?;
            writeln!(out, "{}\t{}", habit.id, habit.title)?;
        }
        Command::Delete { id } => {
            let habit = service.delete_habit(&id)?;
            writeln!(out, "deleted {}", habit.title)?;
        }
        Command::Leaderboard { size } => {
            let size = size.unwrap_or(config.leaderboard_size);
            for (rank, entry) in service.leaderboard(size).iter().enumerate() {
                writeln!(out, "{}. {}\t{}", rank + 1, entry.title, entry.streak)?;
            }
        }
        Command::Export { out: target } => {
            let path = target
                .unwrap_or_else(|| config.data_dir.join(export_file_name(service.today())));
            let bytes = service.export_json()?;
            crate::store::write_atomic(&path, &bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            writeln!(out, "{}", path.display())?;
        }
        Command::Import { path } => {
            let bytes =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let report = service.import_json(&bytes)?;
            writeln!(
                out,
                "imported {} (new {}, updated {})",
                report.total(),
                report.inserted.len(),
                report.updated.len()
            )?;
        }
        Command::Widget { id } => {
            service.refresh_widget(&id)?;
        }
    }
    Ok(())
}

pub fn run(config: AppConfig, command: Command, out: &mut dyn Write) -> Result<()> {
    let service = config.build_service()?;
    execute(&config, &service, command, out)
}
