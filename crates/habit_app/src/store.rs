use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use habit_domain::{
    Habit, HabitId, HabitRepository, HabitResult, HabitSnapshot, InMemoryHabitRepository,
    PersistenceError,
};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

pub const HABITS_FILE: &str = "habits.json";

/// Habit collection persisted as a snapshot document in a single JSON file.
///
/// Pending changes live in memory until `commit`, which rewrites the file
/// atomically. A failed write keeps the previous file intact.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    inner: InMemoryHabitRepository,
}

impl JsonFileRepository {
    /// Loads `path`, or starts empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> HabitResult<Self> {
        let path = path.into();
        let inner = match fs::read(&path) {
            Ok(bytes) => {
                let habits = HabitSnapshot::parse(&bytes)?.decode_habits()?;
                info!(path = %path.display(), count = habits.len(), "loaded habits");
                InMemoryHabitRepository::with_habits(habits)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no habit file yet");
                InMemoryHabitRepository::new()
            }
            Err(err) => return Err(PersistenceError::Io(err).into()),
        };
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HabitRepository for JsonFileRepository {
    fn get(&self, id: &HabitId) -> Option<Habit> {
        self.inner.get(id)
    }

    fn all(&self) -> Vec<Habit> {
        self.inner.all()
    }

    fn upsert(&mut self, habit: Habit) {
        self.inner.upsert(habit)
    }

    fn delete(&mut self, id: &HabitId) -> Option<Habit> {
        self.inner.delete(id)
    }

    fn commit(&mut self) -> Result<(), PersistenceError> {
        if !self.inner.has_pending_changes() {
            return Ok(());
        }
        let snapshot = HabitSnapshot::from_habits(&self.inner.all(), Utc::now());
        let bytes = snapshot.to_json_pretty()?;
        write_atomic(&self.path, &bytes)?;
        self.inner.commit()
    }

    fn rollback(&mut self) {
        self.inner.rollback()
    }
}

/// Writes through a temporary file in the target directory, then renames it.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file.persist(path).map_err(|err| {
        error!(path = %path.display(), err = %err.error, "failed to persist file");
        err.error
    })?;
    Ok(())
}
