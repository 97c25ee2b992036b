//! The per-day planner data (notes, tracker, prioritized tasks, timed appointments)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The priority of a [`Task`], as in the classic Franklin "ABC" method
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    A,
    B,
    C,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::A
    }
}

/// A prioritized task on a day page
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub description: String,
    /// The completion flag
    #[serde(default)]
    pub checked: bool,
}

impl Task {
    pub fn new<S: ToString>(priority: Priority, description: S, checked: bool) -> Self {
        Self {
            priority,
            description: description.to_string(),
            checked,
        }
    }

    /// A task the user has not touched at all.
    ///
    /// Depending on the [`BlankRowPolicy`](crate::rows::BlankRowPolicy), blank tasks may be
    /// omitted when the day is persisted.
    pub fn is_blank(&self) -> bool {
        self.description.is_empty() && self.checked == false
    }
}

/// A timed appointment on a day page.
///
/// `time` is kept as free text: servers and front ends disagree on its format (`HH:MM`, "noon", ...),
/// and this crate does not interpret it. Appointments keep their list position, some front ends
/// bind them to fixed display slots by index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub text: String,
}

impl Appointment {
    pub fn new<S: ToString, T: ToString>(time: S, text: T) -> Self {
        Self {
            time: time.to_string(),
            text: text.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.time.is_empty() && self.text.is_empty()
    }
}

/// One planner page: everything the server stores for a given (account, date) pair.
///
/// A `DayRecord` exists implicitly: a date that was never saved is a valid, empty day,
/// not missing data. There is no delete operation, saving is always a full replacement
/// of the page (every field is re-sent every time, records are small).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    /// The date of this page (ISO `YYYY-MM-DD` on the wire)
    pub date: NaiveDate,
    /// Free-form notes
    #[serde(default)]
    pub notes: String,
    /// A secondary notes-like field (habit tracker, gratitude line, whatever the user decides)
    #[serde(default)]
    pub tracker: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

impl DayRecord {
    /// The record for a day that has never been saved
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            notes: String::new(),
            tracker: String::new(),
            tasks: Vec::new(),
            appointments: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
            && self.tracker.is_empty()
            && self.tasks.is_empty()
            && self.appointments.is_empty()
    }
}
