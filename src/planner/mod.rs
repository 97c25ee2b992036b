//! This module owns the mapping from "what the user sees and edits" to "what the server stores"
//!
//! It is responsible for loading a day on navigation, coalescing bursts of edit events into a
//! single debounced save, and deciding what happens when either direction fails.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{PlannerError, SourceError};
use crate::record::DayRecord;
use crate::rows::{self, DayRows};
use crate::session::SessionGate;
use crate::traits::{Credentials, PlannerSource, UserId};

pub mod feedback;
use feedback::{FeedbackReceiver, FeedbackSender, PlannerEvent};

/// Where the active day stands with regard to persistence
#[derive(Clone, Copy, Debug, PartialEq)]
enum SaveState {
    /// Loaded, no pending edits
    Idle,
    /// Edited, the debounce timer is armed
    PendingSave,
    /// A save is in flight
    Saving,
}

/// The day currently displayed, with its in-memory working copy
struct ActiveDay {
    date: NaiveDate,
    record: DayRecord,
    /// True from the first unsaved edit until a save of the latest content succeeds.
    /// A failed save leaves it set: that is the persistent "unsaved changes" indicator
    dirty: bool,
    save_state: SaveState,
}

struct PlannerState {
    active: Option<ActiveDay>,
    /// Bumped whenever the active selection changes (navigation, logout, forced logout).
    /// Every in-flight operation carries the generation it was issued under, and its result
    /// is discarded if the generation moved on meanwhile. This is what prevents a slow
    /// response for a stale date from overwriting newer state
    generation: u64,
    /// Bumped on every edit, so that a completing save knows whether it covered
    /// the latest content
    edit_serial: u64,
    /// The armed debounce timer, if any. Cancellation-and-reschedule is its only primitive:
    /// there is never more than one timer pending
    debounce: Option<JoinHandle<()>>,
}

/// The day-record synchronizer: single source of truth for "what date is active" and
/// "is the active date's data persisted".
///
/// Edits are applied to an in-memory working copy and autosaved after a quiet period
/// (see [`Config::quiet_period`]); an explicit [`flush`](Self::flush) bypasses the timer.
/// Saves are full replacements of the day's record, so they are idempotent and the backend
/// applies last-write-wins per date.
///
/// Cloning a `Planner` is cheap and yields a handle to the same state, which is how the
/// debounce timer task keeps access to it.
pub struct Planner<S> {
    source: Arc<S>,
    gate: Arc<SessionGate<S>>,
    state: Arc<Mutex<PlannerState>>,
    events: Arc<FeedbackSender>,
    config: Config,
}

impl<S> Clone for Planner<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            gate: self.gate.clone(),
            state: self.state.clone(),
            events: self.events.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: PlannerSource + Send + Sync + 'static> Planner<S> {
    pub fn new(source: S, config: Config) -> Self {
        let source = Arc::new(source);
        let gate = Arc::new(SessionGate::new(source.clone()));
        let (events, _) = tokio::sync::watch::channel(PlannerEvent::default());
        Self {
            source,
            gate,
            state: Arc::new(Mutex::new(PlannerState {
                active: None,
                generation: 0,
                edit_serial: 0,
                debounce: None,
            })),
            events: Arc::new(events),
            config,
        }
    }

    /// The backend this planner talks to.
    ///
    /// Apart from tests, there are very few (if any) reasons to access it directly
    pub fn server(&self) -> &S {
        &self.source
    }

    /// The session gate, e.g. to subscribe to forced view transitions
    pub fn session(&self) -> &SessionGate<S> {
        &self.gate
    }

    /// Subscribe to transient status events ("Saving…", "Saved", ...)
    pub fn subscribe(&self) -> FeedbackReceiver {
        self.events.subscribe()
    }

    /// Log into an existing account and open `date` as the initial day
    pub async fn log_in(&self, credentials: &Credentials, date: NaiveDate) -> Result<(), PlannerError> {
        self.gate.log_in(credentials).await?;
        self.open_day(date).await
    }

    /// Create an account and open `date` as the initial day
    pub async fn sign_up(&self, credentials: &Credentials, date: NaiveDate) -> Result<UserId, PlannerError> {
        let user_id = self.gate.sign_up(credentials).await?;
        self.open_day(date).await?;
        Ok(user_id)
    }

    /// Log out, discarding any unsaved in-memory edits
    pub async fn log_out(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(timer) = state.debounce.take() {
                timer.abort();
            }
            state.active = None;
            state.generation += 1;
        }
        self.gate.log_out().await;
    }

    /// Make `date` the active day and fetch its record.
    ///
    /// A date that was never saved yields an empty record, not an error. On a 401 the
    /// session gate takes over (the user is back on the login view). On any other failure
    /// the previously displayed day stays untouched and a [`PlannerEvent::LoadFailed`]
    /// is published.
    ///
    /// If the previous day still has unsaved edits, its save is dispatched immediately and
    /// completes independently: the two dates are distinct records and do not conflict.
    pub async fn open_day(&self, date: NaiveDate) -> Result<(), PlannerError> {
        let generation = {
            let mut state = self.state.lock().unwrap();
            if let Some(timer) = state.debounce.take() {
                timer.abort();
            }

            // The previous day's pending edits must not be lost just because the user navigated
            if let Some(active) = &state.active {
                if active.dirty {
                    let this = self.clone();
                    let (old_date, old_record) = (active.date, active.record.clone());
                    log::debug!("Navigating away from {} with unsaved edits, saving it now", old_date);
                    tokio::spawn(async move {
                        this.push_record(old_date, old_record).await;
                    });
                }
            }

            state.generation += 1;
            state.generation
        };

        self.feedback(PlannerEvent::Loading { date });
        let fetched = match self.source.fetch_day(date).await {
            Ok(fetched) => fetched,
            Err(SourceError::Unauthorized) => {
                self.handle_unauthorized();
                return Err(SourceError::Unauthorized.into());
            }
            Err(err) => {
                log::warn!("Unable to load day {}: {}", date, err);
                self.feedback(PlannerEvent::LoadFailed { date });
                return Err(err.into());
            }
        };
        let record = fetched.unwrap_or_else(|| DayRecord::empty(date));

        {
            let mut state = self.state.lock().unwrap();
            if state.generation != generation {
                // The user has navigated elsewhere while this fetch was in flight
                log::debug!("Discarding a stale response for {}", date);
                return Ok(());
            }
            state.active = Some(ActiveDay {
                date,
                record,
                dirty: false,
                save_state: SaveState::Idle,
            });
        }
        self.feedback(PlannerEvent::Loaded { date });
        Ok(())
    }

    /// Apply one edit to the working copy and (re-)arm the autosave timer.
    ///
    /// Rapid-fire edits (keystrokes, checkbox toggles) each cancel and re-arm the timer, so a
    /// burst coalesces into a single save once the stream stays quiet for
    /// [`Config::quiet_period`]
    pub fn edit<F: FnOnce(&mut DayRecord)>(&self, apply: F) -> Result<(), PlannerError> {
        let (date, generation) = {
            let mut state = self.state.lock().unwrap();
            state.edit_serial += 1;
            let generation = state.generation;
            let active = state.active.as_mut().ok_or(PlannerError::NoActiveDay)?;
            apply(&mut active.record);
            active.dirty = true;
            active.save_state = SaveState::PendingSave;
            (active.date, generation)
        };
        self.arm_debounce(date, generation);
        Ok(())
    }

    /// Save the active day right now, bypassing the debounce timer
    pub async fn flush(&self) -> Result<(), PlannerError> {
        let (date, generation) = {
            let mut state = self.state.lock().unwrap();
            if let Some(timer) = state.debounce.take() {
                timer.abort();
            }
            let generation = state.generation;
            let active = state.active.as_ref().ok_or(PlannerError::NoActiveDay)?;
            (active.date, generation)
        };
        self.save_active(date, generation).await
    }

    /// The working copy of the active day
    pub fn record(&self) -> Option<DayRecord> {
        self.state
            .lock()
            .unwrap()
            .active
            .as_ref()
            .map(|active| active.record.clone())
    }

    pub fn active_date(&self) -> Option<NaiveDate> {
        self.state.lock().unwrap().active.as_ref().map(|active| active.date)
    }

    /// True from the first unsaved edit until a save of the latest content succeeds.
    /// A front end should keep some "unsaved changes" indicator visible while this holds
    pub fn has_unsaved_changes(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .active
            .as_ref()
            .map(|active| active.dirty)
            .unwrap_or(false)
    }

    /// The active day as editable rows (see [`rows::project`])
    pub fn rows(&self) -> Result<DayRows, PlannerError> {
        let record = self.record().ok_or(PlannerError::NoActiveDay)?;
        Ok(rows::project(&record, &self.config))
    }

    /// Read edited rows back into the working copy (see [`rows::collect`]) and arm the autosave
    pub fn apply_rows(&self, edited: &DayRows) -> Result<(), PlannerError> {
        let (tasks, appointments) = rows::collect(edited, self.config.blank_row_policy);
        self.edit(move |record| {
            record.tasks = tasks;
            record.appointments = appointments;
        })
    }

    fn arm_debounce(&self, date: NaiveDate, generation: u64) {
        let quiet_period = self.config.quiet_period;
        let this = self.clone();
        let mut state = self.state.lock().unwrap();
        if let Some(previous) = state.debounce.take() {
            previous.abort();
        }
        state.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            let _ = this.save_active(date, generation).await;
        }));
    }

    /// Save the active day, provided the user has not navigated away since `generation`
    async fn save_active(&self, date: NaiveDate, generation: u64) -> Result<(), PlannerError> {
        let (record, serial) = {
            let mut state = self.state.lock().unwrap();
            if state.generation != generation {
                return Ok(());
            }
            let serial = state.edit_serial;
            let active = match state.active.as_mut() {
                None => return Ok(()),
                Some(active) => active,
            };
            active.save_state = SaveState::Saving;
            (active.record.clone(), serial)
        };

        self.feedback(PlannerEvent::Saving { date });
        match self.source.save_day(date, &record).await {
            Ok(()) => {
                let mut state = self.state.lock().unwrap();
                if state.generation == generation {
                    let covered_latest_edit = state.edit_serial == serial;
                    if let Some(active) = state.active.as_mut() {
                        // An edit may have re-armed the timer while this save was in flight
                        if active.save_state == SaveState::Saving {
                            active.save_state = SaveState::Idle;
                        }
                        if covered_latest_edit {
                            active.dirty = false;
                        }
                    }
                }
                drop(state);
                self.feedback(PlannerEvent::Saved { date });
                Ok(())
            }
            Err(SourceError::Unauthorized) => {
                self.handle_unauthorized();
                Err(SourceError::Unauthorized.into())
            }
            Err(err) => {
                // No automatic retry: the next edit-triggered save is the retry path,
                // and `dirty` stays set until one succeeds
                log::warn!("Unable to save day {}: {}", date, err);
                let mut state = self.state.lock().unwrap();
                if state.generation == generation {
                    if let Some(active) = state.active.as_mut() {
                        if active.save_state == SaveState::Saving {
                            active.save_state = SaveState::Idle;
                        }
                    }
                }
                drop(state);
                self.feedback(PlannerEvent::SaveFailed { date });
                Err(err.into())
            }
        }
    }

    /// Save a record that is no longer the active day (the user navigated away while its
    /// edits were pending). It carries its own date and content, so it cannot touch the
    /// newly active day
    async fn push_record(&self, date: NaiveDate, record: DayRecord) {
        self.feedback(PlannerEvent::Saving { date });
        match self.source.save_day(date, &record).await {
            Ok(()) => self.feedback(PlannerEvent::Saved { date }),
            Err(SourceError::Unauthorized) => self.handle_unauthorized(),
            Err(err) => {
                log::warn!("Unable to save day {} after navigating away: {}", date, err);
                self.feedback(PlannerEvent::SaveFailed { date });
            }
        }
    }

    /// A day operation came back with a 401: drop everything and let the session gate
    /// force the login view. Unsaved edits are lost, visibly (see [`PlannerEvent::SessionExpired`])
    fn handle_unauthorized(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(timer) = state.debounce.take() {
                timer.abort();
            }
            state.active = None;
            state.generation += 1;
        }
        self.gate.on_unauthorized();
        self.feedback(PlannerEvent::SessionExpired);
    }

    fn feedback(&self, event: PlannerEvent) {
        log::debug!("{}", event);
        self.events.send_replace(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::mock_behaviour::MockBehaviour;
    use crate::mock_server::MockServer;
    use crate::record::{Appointment, Priority, Task};
    use crate::session::View;

    const EMAIL: &str = "andy@example.com";

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    /// A planner whose account is created and whose given day is open
    async fn planner_on(day: u32) -> Planner<MockServer> {
        let _ = env_logger::builder().is_test(true).try_init();
        let planner = Planner::new(MockServer::new(), Config::default());
        planner
            .sign_up(&Credentials::new(EMAIL, "hunter2"), date(day))
            .await
            .unwrap();
        planner
    }

    /// Let the quiet period elapse (and the armed save run)
    async fn let_autosave_fire(planner: &Planner<MockServer>) {
        tokio::time::sleep(planner.config.quiet_period + Duration::from_millis(100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn a_never_saved_day_is_empty_not_missing() {
        let planner = planner_on(15).await;

        let record = planner.record().unwrap();
        assert!(record.is_empty());
        assert_eq!(record.date, date(15));

        // The empty page still shows the starter rows
        let rows = planner.rows().unwrap();
        assert_eq!(rows.tasks.len(), 6);
        assert_eq!(rows.appointments.len(), 8);

        // Saving immediately with no edits persists an all-empty record
        planner.flush().await.unwrap();
        let stored = planner.server().stored_day(EMAIL, date(15)).unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn a_burst_of_edits_coalesces_into_one_save() {
        let planner = planner_on(15).await;

        for keystroke in ["B", "Bu", "Buy", "Buy milk"] {
            planner.edit(|record| record.notes = keystroke.to_string()).unwrap();
        }
        assert!(planner.has_unsaved_changes());
        assert_eq!(planner.server().save_count(), 0);

        let_autosave_fire(&planner).await;

        assert_eq!(planner.server().save_count(), 1);
        assert!(planner.has_unsaved_changes() == false);
        let stored = planner.server().stored_day(EMAIL, date(15)).unwrap();
        assert_eq!(stored.notes, "Buy milk");
        assert_eq!(*planner.subscribe().borrow(), PlannerEvent::Saved { date: date(15) });
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_edits_each_get_their_own_save() {
        let planner = planner_on(15).await;

        for edit_number in 0..3 {
            planner
                .edit(move |record| record.notes = format!("edit {}", edit_number))
                .unwrap();
            let_autosave_fire(&planner).await;
        }

        assert_eq!(planner.server().save_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_bypasses_the_timer() {
        let planner = planner_on(15).await;

        planner.edit(|record| record.tracker = "water: 6".to_string()).unwrap();
        planner.flush().await.unwrap();
        assert_eq!(planner.server().save_count(), 1);
        assert!(planner.has_unsaved_changes() == false);

        // The armed timer was cancelled: no second, redundant save later on
        let_autosave_fire(&planner).await;
        assert_eq!(planner.server().save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn saving_twice_is_idempotent() {
        let planner = planner_on(15).await;

        planner
            .edit(|record| {
                record.notes = "some notes".to_string();
                record.tasks.push(Task::new(Priority::A, "Water the plants", false));
            })
            .unwrap();

        planner.flush().await.unwrap();
        let first = planner.server().stored_day(EMAIL, date(15)).unwrap();
        planner.flush().await.unwrap();
        let second = planner.server().stored_day(EMAIL, date(15)).unwrap();

        assert_eq!(planner.server().save_count(), 2);
        assert_eq!(first, second);
        assert_eq!(first, planner.record().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn edited_rows_are_collected_into_the_save() {
        let planner = planner_on(15).await;

        // The user fills in the first task row and one appointment slot
        let mut rows = planner.rows().unwrap();
        rows.tasks[0].description = "Buy milk".to_string();
        rows.tasks[0].priority = Priority::B;
        rows.tasks[0].checked = true;
        rows.appointments[0] = crate::rows::AppointmentRow {
            time: "09:30".to_string(),
            text: "stand-up".to_string(),
        };
        planner.apply_rows(&rows).unwrap();

        let_autosave_fire(&planner).await;

        assert_eq!(planner.server().save_count(), 1);
        let stored = planner.server().stored_day(EMAIL, date(15)).unwrap();
        // Under the OmitBlank policy, the untouched starter rows are not persisted
        assert_eq!(stored.tasks, vec![Task::new(Priority::B, "Buy milk", true)]);
        assert_eq!(stored.appointments, vec![Appointment::new("09:30", "stand-up")]);
    }

    #[tokio::test(start_paused = true)]
    async fn a_slow_response_for_a_stale_date_is_discarded() {
        let planner = planner_on(1).await;
        let mut yesterday = DayRecord::empty(date(14));
        yesterday.notes = "older page".to_string();
        let mut today = DayRecord::empty(date(15));
        today.notes = "newer page".to_string();
        planner.server().seed_day(EMAIL, yesterday);
        planner.server().seed_day(EMAIL, today);

        // The fetch of the 14th hangs...
        planner.server().set_fetch_delay(Some(Duration::from_millis(500)));
        let slow_planner = planner.clone();
        let slow_load = tokio::spawn(async move { slow_planner.open_day(date(14)).await });
        tokio::task::yield_now().await;

        // ...and the user has already moved on to the 15th
        planner.server().set_fetch_delay(None);
        planner.open_day(date(15)).await.unwrap();
        assert_eq!(planner.record().unwrap().notes, "newer page");

        // The response for the 14th eventually lands, and must not overwrite the 15th
        tokio::time::sleep(Duration::from_millis(600)).await;
        slow_load.await.unwrap().unwrap();
        assert_eq!(planner.active_date(), Some(date(15)));
        assert_eq!(planner.record().unwrap().notes, "newer page");
    }

    #[tokio::test(start_paused = true)]
    async fn navigating_away_still_saves_the_pending_edits() {
        let planner = planner_on(15).await;

        planner.edit(|record| record.notes = "almost forgotten".to_string()).unwrap();
        // Navigate before the quiet period elapses
        planner.open_day(date(16)).await.unwrap();
        tokio::task::yield_now().await;

        let stored = planner.server().stored_day(EMAIL, date(15)).unwrap();
        assert_eq!(stored.notes, "almost forgotten");
        assert_eq!(planner.server().save_count(), 1);
        assert_eq!(planner.active_date(), Some(date(16)));

        // The old timer is gone: nothing fires later against the new day
        let_autosave_fire(&planner).await;
        assert_eq!(planner.server().save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn an_expired_session_forces_the_login_view() {
        let planner = planner_on(15).await;
        assert_eq!(planner.session().view(), View::Planner);

        planner.server().expire_session();
        planner.edit(|record| record.notes = "will be lost".to_string()).unwrap();
        let_autosave_fire(&planner).await;

        assert_eq!(planner.session().view(), View::Login);
        assert_eq!(*planner.subscribe().borrow(), PlannerEvent::SessionExpired);
        // The working copy is gone with the session
        assert_eq!(planner.record(), None);
        assert!(matches!(
            planner.edit(|_| {}),
            Err(PlannerError::NoActiveDay)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn a_401_on_load_forces_the_login_view_too() {
        let planner = planner_on(15).await;

        planner.server().expire_session();
        let err = planner.open_day(date(16)).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(planner.session().view(), View::Login);
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_load_keeps_the_previous_day_displayed() {
        let planner = planner_on(15).await;
        planner.edit(|record| record.notes = "current page".to_string()).unwrap();
        planner.flush().await.unwrap();

        planner.server().set_behaviour(MockBehaviour {
            fetch_day_behaviour: (0, 1),
            ..MockBehaviour::default()
        });

        let err = planner.open_day(date(16)).await.unwrap_err();
        assert!(matches!(err, PlannerError::Source(SourceError::Transport(_))));
        assert_eq!(planner.active_date(), Some(date(15)));
        assert_eq!(planner.record().unwrap().notes, "current page");
        assert_eq!(*planner.subscribe().borrow(), PlannerEvent::LoadFailed { date: date(16) });
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_save_is_retried_by_the_next_edit() {
        let planner = planner_on(15).await;
        planner.server().set_behaviour(MockBehaviour {
            save_day_behaviour: (0, 1),
            ..MockBehaviour::default()
        });

        planner.edit(|record| record.notes = "first try".to_string()).unwrap();
        let_autosave_fire(&planner).await;

        // The save was lost, but the edits were not
        assert!(planner.has_unsaved_changes());
        assert_eq!(*planner.subscribe().borrow(), PlannerEvent::SaveFailed { date: date(15) });
        assert_eq!(planner.server().stored_day(EMAIL, date(15)), None);

        // The next edit is the retry path
        planner.edit(|record| record.notes = "second try".to_string()).unwrap();
        let_autosave_fire(&planner).await;

        assert!(planner.has_unsaved_changes() == false);
        assert_eq!(
            planner.server().stored_day(EMAIL, date(15)).unwrap().notes,
            "second try"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn an_edit_during_a_save_keeps_the_day_dirty() {
        let planner = planner_on(15).await;

        planner.edit(|record| record.notes = "v1".to_string()).unwrap();
        let flushing = {
            let planner = planner.clone();
            tokio::spawn(async move { planner.flush().await })
        };
        tokio::task::yield_now().await;

        // This edit races with the in-flight save; whether it made it into the payload or
        // not, the day must stay dirty until a save covering it succeeds
        planner.edit(|record| record.notes = "v2".to_string()).unwrap();
        flushing.await.unwrap().unwrap();
        assert!(planner.has_unsaved_changes());

        let_autosave_fire(&planner).await;
        assert!(planner.has_unsaved_changes() == false);
        assert_eq!(planner.server().stored_day(EMAIL, date(15)).unwrap().notes, "v2");
    }

    #[tokio::test(start_paused = true)]
    async fn logging_out_discards_unsaved_edits() {
        let planner = planner_on(15).await;

        planner.edit(|record| record.notes = "discarded".to_string()).unwrap();
        planner.log_out().await;

        assert_eq!(planner.session().view(), View::Login);
        assert_eq!(planner.record(), None);
        let_autosave_fire(&planner).await;
        assert_eq!(planner.server().save_count(), 0);
        assert_eq!(planner.server().stored_day(EMAIL, date(15)), None);
    }
}
