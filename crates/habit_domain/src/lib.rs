pub mod calendar;
pub mod color;
pub mod error;
pub mod habit;
pub mod merge;
pub mod notifications;
pub mod query;
pub mod repository;
pub mod service;
pub mod snapshot;

pub use crate::calendar::{Calendar, Clock, FixedClock, SystemClock};
pub use crate::error::{DecodeError, HabitError, HabitResult, PersistenceError};
pub use crate::habit::{Habit, HabitEdit, HabitId, NewHabit, Reminder};
pub use crate::repository::{HabitRepository, InMemoryHabitRepository};
pub use crate::service::{HabitService, HabitServiceBuilder, HabitStats};
pub use crate::snapshot::{HabitRecord, HabitSnapshot};
