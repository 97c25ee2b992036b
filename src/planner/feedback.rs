//! Utilities to surface the load/save status to the user
//!
//! Everything here is transient status ("Saving…", "Saved", "Error saving day"), meant for a
//! status line rather than a modal interruption. The two exceptions that must interrupt the
//! user (authentication failures, forced logout) are not events: they surface as errors and
//! as a [`View`](crate::session::View) transition.

use std::fmt::{Display, Error, Formatter};

use chrono::NaiveDate;

/// Something the planner did (or failed to do) in the background
#[derive(Clone, Debug, PartialEq)]
pub enum PlannerEvent {
    /// Nothing happened yet
    NotStarted,
    /// A day record is being fetched
    Loading { date: NaiveDate },
    /// A day record is displayed and up-to-date
    Loaded { date: NaiveDate },
    /// A day record could not be fetched; the previously displayed day is untouched
    LoadFailed { date: NaiveDate },
    /// An autosave (or explicit save) is in flight
    Saving { date: NaiveDate },
    /// The last save went through
    Saved { date: NaiveDate },
    /// The last save failed; the edits are still held in memory and the next
    /// edit-triggered save is the retry path
    SaveFailed { date: NaiveDate },
    /// A day operation came back with a 401; the user is back on the login view
    /// and unsaved edits are lost
    SessionExpired,
}

impl Display for PlannerEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            PlannerEvent::NotStarted => write!(f, "Not started"),
            PlannerEvent::Loading { date } => write!(f, "Loading {}...", date),
            PlannerEvent::Loaded { date } => write!(f, "Loaded {}", date),
            PlannerEvent::LoadFailed { date } => write!(f, "Error loading {}", date),
            PlannerEvent::Saving { .. } => write!(f, "Saving..."),
            PlannerEvent::Saved { .. } => write!(f, "Saved"),
            PlannerEvent::SaveFailed { .. } => write!(f, "Error saving day"),
            PlannerEvent::SessionExpired => write!(f, "Session expired, please log in again."),
        }
    }
}

impl Default for PlannerEvent {
    fn default() -> Self {
        Self::NotStarted
    }
}

/// See [`Planner::subscribe`](crate::Planner::subscribe)
pub type FeedbackReceiver = tokio::sync::watch::Receiver<PlannerEvent>;
pub(crate) type FeedbackSender = tokio::sync::watch::Sender<PlannerEvent>;
