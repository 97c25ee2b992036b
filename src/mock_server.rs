//! This module mocks a remote planner server by an in-memory one, for use in tests
#![cfg(any(test, feature = "mock_remote_server"))]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::SourceError;
use crate::mock_behaviour::MockBehaviour;
use crate::record::DayRecord;
use crate::traits::{Credentials, PlannerSource, UserId};

struct Account {
    user_id: i64,
    password: String,
}

#[derive(Default)]
struct MockState {
    accounts: HashMap<String, Account>,
    days: HashMap<(String, NaiveDate), DayRecord>,
    /// The email of the currently logged-in account, i.e. the "session cookie"
    session: Option<String>,
    next_user_id: i64,
    fetch_count: u32,
    save_count: u32,
}

/// A [`PlannerSource`] that holds everything in memory.
///
/// It applies the same rules a real server does (accounts, one session at a time,
/// one record per (account, date) pair, 401 when the session is gone), plus a few
/// test-only knobs: scripted failures via [`MockBehaviour`], an artificial fetch
/// latency, and a way to expire the session behind the client's back.
pub struct MockServer {
    state: Mutex<MockState>,
    behaviour: Mutex<MockBehaviour>,
    fetch_delay: Mutex<Option<Duration>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::with_behaviour(MockBehaviour::new())
    }

    pub fn with_behaviour(behaviour: MockBehaviour) -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            behaviour: Mutex::new(behaviour),
            fetch_delay: Mutex::new(None),
        }
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    /// Every subsequent `fetch_day` will take this long to answer
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    /// Drop the session behind the client's back, as a real server does when a cookie expires.
    /// The client will discover it on its next day operation, via a 401
    pub fn expire_session(&self) {
        self.state.lock().unwrap().session = None;
    }

    /// The email of the account currently holding a session
    pub fn logged_in(&self) -> Option<String> {
        self.state.lock().unwrap().session.clone()
    }

    /// What the server currently stores for this (account, date) pair
    pub fn stored_day(&self, email: &str, date: NaiveDate) -> Option<DayRecord> {
        self.state
            .lock()
            .unwrap()
            .days
            .get(&(email.to_string(), date))
            .cloned()
    }

    /// Pre-populate a record, bypassing the session check
    pub fn seed_day(&self, email: &str, record: DayRecord) {
        let mut state = self.state.lock().unwrap();
        state.days.insert((email.to_string(), record.date), record);
    }

    /// How many `fetch_day` calls actually reached this server
    pub fn fetch_count(&self) -> u32 {
        self.state.lock().unwrap().fetch_count
    }

    /// How many `save_day` calls actually reached this server
    pub fn save_count(&self) -> u32 {
        self.state.lock().unwrap().save_count
    }
}

#[async_trait]
impl PlannerSource for MockServer {
    async fn sign_up(&self, credentials: &Credentials) -> Result<UserId, SourceError> {
        self.behaviour.lock().unwrap().can_sign_up()?;

        let mut state = self.state.lock().unwrap();
        if credentials.email.is_empty() || credentials.password.is_empty() {
            return Err(SourceError::Auth("Email and password are required".into()));
        }
        if state.accounts.contains_key(&credentials.email) {
            return Err(SourceError::Auth("An account with this email already exists".into()));
        }

        state.next_user_id += 1;
        let user_id = state.next_user_id;
        state.accounts.insert(
            credentials.email.clone(),
            Account {
                user_id,
                password: credentials.password.clone(),
            },
        );
        state.session = Some(credentials.email.clone());
        Ok(UserId(user_id))
    }

    async fn log_in(&self, credentials: &Credentials) -> Result<(), SourceError> {
        self.behaviour.lock().unwrap().can_log_in()?;

        let mut state = self.state.lock().unwrap();
        match state.accounts.get(&credentials.email) {
            Some(account) if account.password == credentials.password => {
                state.session = Some(credentials.email.clone());
                Ok(())
            }
            _ => Err(SourceError::Auth("Invalid credentials".into())),
        }
    }

    async fn log_out(&self) -> Result<(), SourceError> {
        self.behaviour.lock().unwrap().can_log_out()?;
        self.state.lock().unwrap().session = None;
        Ok(())
    }

    async fn fetch_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, SourceError> {
        self.behaviour.lock().unwrap().can_fetch_day()?;

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.fetch_count += 1;
        let email = match &state.session {
            None => return Err(SourceError::Unauthorized),
            Some(email) => email.clone(),
        };
        Ok(state.days.get(&(email, date)).cloned())
    }

    async fn save_day(&self, date: NaiveDate, record: &DayRecord) -> Result<(), SourceError> {
        self.behaviour.lock().unwrap().can_save_day()?;

        let mut state = self.state.lock().unwrap();
        state.save_count += 1;
        let email = match &state.session {
            None => return Err(SourceError::Unauthorized),
            Some(email) => email.clone(),
        };

        // Full replacement, keyed by the path date
        let mut stored = record.clone();
        stored.date = date;
        state.days.insert((email, date), stored);
        Ok(())
    }
}
