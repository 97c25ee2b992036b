//! Support for library configuration options

use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::rows::BlankRowPolicy;

/// The product name sent in the `User-Agent` header of every HTTP request.
/// Feel free to override it when initing this library.
pub static PRODUCT_NAME: Lazy<Arc<Mutex<String>>> =
    Lazy::new(|| Arc::new(Mutex::new("RingBinder".to_string())));

pub(crate) fn user_agent() -> String {
    let name = PRODUCT_NAME.lock().unwrap().clone();
    format!("{}/{}", name, env!("CARGO_PKG_VERSION"))
}

/// Tunables of a [`Planner`](crate::Planner).
///
/// These are UX defaults, not protocol requirements: servers do not care how long the client
/// waits before autosaving, nor how many empty lines an empty page shows.
#[derive(Clone, Debug)]
pub struct Config {
    /// How long the edit stream must stay quiet before an autosave fires.
    /// Every new edit re-arms the timer.
    pub quiet_period: Duration,
    /// How many blank task rows an empty (or short) day page shows
    pub starter_task_rows: usize,
    /// How many blank appointment slots an empty (or short) day page shows
    pub starter_appointment_rows: usize,
    /// What happens to blank rows when the day is persisted
    pub blank_row_policy: BlankRowPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(600),
            starter_task_rows: 6,
            starter_appointment_rows: 8,
            blank_row_policy: BlankRowPolicy::OmitBlank,
        }
    }
}
