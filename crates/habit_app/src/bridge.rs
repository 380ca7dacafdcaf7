//! File-backed stand-ins for the platform reminder and widget services.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use habit_domain::{
    notifications::{ReminderRequest, ReminderScheduler, WidgetPublisher, WidgetSnapshot},
    HabitId,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::store::write_atomic;

pub const REMINDERS_FILE: &str = "reminders.json";

/// Keeps one pending reminder per habit in a JSON registry keyed by reminder key.
pub struct FileReminderRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileReminderRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn pending(&self) -> io::Result<BTreeMap<String, ReminderRequest>> {
        let _guard = self.lock.lock();
        self.load()
    }

    fn load(&self) -> io::Result<BTreeMap<String, ReminderRequest>> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(io::Error::from),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err),
        }
    }

    fn update(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, ReminderRequest>),
    ) -> io::Result<()> {
        let _guard = self.lock.lock();
        let mut pending = self.load()?;
        change(&mut pending);
        let bytes = serde_json::to_vec_pretty(&pending)?;
        write_atomic(&self.path, &bytes)
    }
}

impl ReminderScheduler for FileReminderRegistry {
    fn schedule(&self, request: ReminderRequest) {
        let key = request.key.clone();
        debug!(%key, hour = request.hour, minute = request.minute, "scheduling reminder");
        if let Err(err) = self.update(|pending| {
            pending.insert(request.key.clone(), request);
        }) {
            warn!(%key, %err, "failed to schedule reminder");
        }
    }

    fn cancel(&self, habit_id: &HabitId) {
        let key = habit_id.reminder_key();
        if let Err(err) = self.update(|pending| {
            pending.remove(&key);
        }) {
            warn!(%key, %err, "failed to cancel reminder");
        }
    }
}

/// Writes the primary habit payload to `<dir>/widget.primaryHabit.json`.
pub struct FileWidgetPublisher {
    path: PathBuf,
}

impl FileWidgetPublisher {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{}.json", habit_domain::notifications::WIDGET_PRIMARY_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> io::Result<Option<WidgetSnapshot>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl WidgetPublisher for FileWidgetPublisher {
    fn publish(&self, snapshot: WidgetSnapshot) {
        let result = serde_json::to_vec_pretty(&snapshot)
            .map_err(io::Error::from)
            .and_then(|bytes| write_atomic(&self.path, &bytes));
        match result {
            Ok(()) => debug!(habit_id = %snapshot.id, "widget payload published"),
            Err(err) => warn!(%err, "failed to publish widget payload"),
        }
    }
}
