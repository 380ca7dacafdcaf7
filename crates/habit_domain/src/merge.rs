//! Reconciles an imported snapshot with the current collection.
//!
//! Matching ids are overwritten wholesale, unknown ids are inserted with the
//! imported identity, and habits missing from the snapshot are left alone.
//! There is no field-level merge and no timestamp precedence.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DecodeError, HabitError};
use crate::habit::{Habit, HabitId};
use crate::notifications::{ReminderRequest, ReminderScheduler};
use crate::repository::HabitRepository;
use crate::snapshot::HabitSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: Vec<HabitId>,
    pub updated: Vec<HabitId>,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.inserted.len() + self.updated.len()
    }
}

/// A reminder side effect to run once the import is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderAction {
    Schedule(ReminderRequest),
    Cancel(HabitId),
}

impl ReminderAction {
    pub fn apply(self, scheduler: &dyn ReminderScheduler) {
        match self {
            Self::Schedule(request) => scheduler.schedule(request),
            Self::Cancel(id) => scheduler.cancel(&id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedImport {
    pub report: ImportReport,
    pub reminders: Vec<ReminderAction>,
}

/// Stages every record of `snapshot` into `repository` without committing.
///
/// All records are decoded before anything is written, so a `DecodeError`
/// leaves the repository untouched.
pub fn stage_snapshot<R>(
    repository: &mut R,
    snapshot: &HabitSnapshot,
) -> Result<StagedImport, DecodeError>
where
    R: HabitRepository + ?Sized,
{
    let incoming = snapshot.decode_habits()?;
    let mut known: HashSet<HabitId> = repository.all().iter().map(|habit| habit.id).collect();
    let mut staged = StagedImport::default();

    for record in incoming {
        let id = record.id;
        let existing = if known.contains(&id) {
            repository.get(&id)
        } else {
            None
        };
        let merged = match existing {
            Some(mut existing) => {
                existing.overwrite_from(record);
                staged.report.updated.push(id);
                staged.reminders.push(reminder_after_overwrite(&existing));
                existing
            }
            None => {
                known.insert(id);
                staged.report.inserted.push(id);
                if record.reminder.enabled {
                    staged
                        .reminders
                        .push(ReminderAction::Schedule(ReminderRequest::for_habit(&record)));
                }
                record
            }
        };
        debug!(habit_id = %id, "staged imported habit");
        repository.upsert(merged);
    }

    Ok(staged)
}

/// Stages, commits and then applies reminder side effects.
///
/// A failed commit rolls the repository back and no reminder is touched.
pub fn import_snapshot<R>(
    repository: &mut R,
    snapshot: &HabitSnapshot,
    scheduler: Option<&dyn ReminderScheduler>,
) -> Result<ImportReport, HabitError>
where
    R: HabitRepository + ?Sized,
{
    let staged = stage_snapshot(repository, snapshot)?;
    if let Err(err) = repository.commit() {
        warn!(%err, "import commit failed, rolling back");
        repository.rollback();
        return Err(err.into());
    }
    if let Some(scheduler) = scheduler {
        for action in staged.reminders {
            action.apply(scheduler);
        }
    }
    info!(
        inserted = staged.report.inserted.len(),
        updated = staged.report.updated.len(),
        "snapshot imported"
    );
    Ok(staged.report)
}

fn reminder_after_overwrite(habit: &Habit) -> ReminderAction {
    if habit.reminder.enabled {
        ReminderAction::Schedule(ReminderRequest::for_habit(habit))
    } else {
        ReminderAction::Cancel(habit.id)
    }
}
