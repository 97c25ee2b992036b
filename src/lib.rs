//! This crate provides a way to talk to Franklin-style day-planner servers.
//!
//! Such a server stores one [`DayRecord`] (notes, a tracker line, prioritized tasks and timed
//! appointments) per account and per date, behind a cookie session. \
//! The [`Planner`] is the heart of the crate: it tracks the active date, loads it on
//! navigation, and coalesces bursts of edit events into debounced autosaves, so a front end
//! can simply forward every keystroke. \
//! A [`SessionGate`](session::SessionGate) decides which view (login or planner) should be
//! displayed, including when the session expires mid-edit. \
//! The [`rows`] module maps a record to editable rows and back, without depending on any
//! rendering technology.

pub mod traits;

pub mod error;
pub use error::{PlannerError, SourceError};
mod record;
pub use record::{Appointment, DayRecord, Priority, Task};
pub mod rows;
pub mod session;
pub mod planner;
pub use planner::Planner;

pub mod client;
pub mod mock_behaviour;
pub mod mock_server;

pub mod config;
pub use config::Config;
