//! The editable-row view-model of a day page
//!
//! This is a pure data-transformation layer between a [`DayRecord`] and whatever a front end
//! actually renders (DOM nodes, TUI widgets...). Keeping it free of any rendering technology
//! makes the round-trip testable without a rendering environment.
//!
//! [`project`] turns a record into rows (padding with blank starter rows so an empty day still
//! gives the user something to fill in), [`collect`] reads edited rows back into record lists.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::record::{Appointment, DayRecord, Priority, Task};

/// What to do with blank rows when a day is persisted.
///
/// Front ends of this planner historically disagreed on this, so it is an explicit,
/// configurable policy rather than a hardcoded behavior. It observably changes round-trip
/// semantics: under [`OmitBlank`](BlankRowPolicy::OmitBlank), an interior blank row is dropped
/// and re-appears as tail padding at the next [`project`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlankRowPolicy {
    /// Drop rows the user left blank (empty description and unchecked, for tasks;
    /// empty time and empty text, for appointments)
    OmitBlank,
    /// Persist every row, blank or not
    KeepAll,
}

/// An editable task row
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskRow {
    pub priority: Priority,
    pub description: String,
    pub checked: bool,
}

impl TaskRow {
    pub fn is_blank(&self) -> bool {
        self.description.is_empty() && self.checked == false
    }
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            priority: task.priority,
            description: task.description.clone(),
            checked: task.checked,
        }
    }
}

/// An editable appointment row
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppointmentRow {
    pub time: String,
    pub text: String,
}

impl AppointmentRow {
    pub fn is_blank(&self) -> bool {
        self.time.is_empty() && self.text.is_empty()
    }
}

impl From<&Appointment> for AppointmentRow {
    fn from(appointment: &Appointment) -> Self {
        Self {
            time: appointment.time.clone(),
            text: appointment.text.clone(),
        }
    }
}

/// Every editable row of a day page, in display order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DayRows {
    pub tasks: Vec<TaskRow>,
    pub appointments: Vec<AppointmentRow>,
}

/// Turn a record into editable rows, one row per task and per appointment, preserving order.
///
/// Short lists are padded with blank rows up to [`Config::starter_task_rows`] and
/// [`Config::starter_appointment_rows`]. The padding is a UX default (an empty page should show
/// empty lines, not nothing), it is not data: blank padding is not persisted back unless the
/// user actually edits it, see [`collect`].
pub fn project(record: &DayRecord, config: &Config) -> DayRows {
    let mut tasks: Vec<TaskRow> = record.tasks.iter().map(TaskRow::from).collect();
    while tasks.len() < config.starter_task_rows {
        tasks.push(TaskRow::default());
    }

    let mut appointments: Vec<AppointmentRow> =
        record.appointments.iter().map(AppointmentRow::from).collect();
    while appointments.len() < config.starter_appointment_rows {
        appointments.push(AppointmentRow::default());
    }

    DayRows { tasks, appointments }
}

/// Read edited rows back into record lists, applying the blank-row policy.
///
/// Whichever policy is used, `project(collect(rows))` keeps every row the user actually
/// filled in, in order. Only blank rows are affected.
pub fn collect(rows: &DayRows, policy: BlankRowPolicy) -> (Vec<Task>, Vec<Appointment>) {
    let tasks = rows
        .tasks
        .iter()
        .filter(|row| policy == BlankRowPolicy::KeepAll || row.is_blank() == false)
        .map(|row| Task {
            priority: row.priority,
            description: row.description.clone(),
            checked: row.checked,
        })
        .collect();

    let appointments = rows
        .appointments
        .iter()
        .filter(|row| policy == BlankRowPolicy::KeepAll || row.is_blank() == false)
        .map(|row| Appointment {
            time: row.time.clone(),
            text: row.text.clone(),
        })
        .collect();

    (tasks, appointments)
}
