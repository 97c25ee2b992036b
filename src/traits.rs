//! The seam between the synchronizer and an actual planner backend

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::record::DayRecord;

/// The credentials of a planner account
#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new<S: AsRef<str>, T: ToString>(email: S, password: T) -> Self {
        // Servers compare emails case-insensitively, normalize on our side as well
        Self {
            email: email.as_ref().trim().to_lowercase(),
            password: password.to_string(),
        }
    }
}

/// The server-side identifier of an account, returned on signup
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A backend that stores one [`DayRecord`] per (account, date) pair, behind a cookie session.
///
/// The real implementation is [`RemoteServer`](crate::client::RemoteServer). Integration tests
/// mock it with a [`MockServer`](crate::mock_server::MockServer).
///
/// Sessions are opaque to this crate: an implementation either currently holds a valid session
/// (and day operations succeed), or it does not (and they return [`SourceError::Unauthorized`]).
#[async_trait]
pub trait PlannerSource {
    /// Create an account and open a session for it
    async fn sign_up(&self, credentials: &Credentials) -> Result<UserId, SourceError>;

    /// Open a session for an existing account
    async fn log_in(&self, credentials: &Credentials) -> Result<(), SourceError>;

    /// Close the current session
    async fn log_out(&self) -> Result<(), SourceError>;

    /// Fetch the record for a date.
    ///
    /// `Ok(None)` means this date was never saved, which is a valid state, not an error:
    /// the caller synthesizes an empty record for it.
    async fn fetch_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, SourceError>;

    /// Store `record` as the full replacement of that date's record.
    ///
    /// This must be idempotent: saving the same record twice leaves the backend holding
    /// exactly that record both times.
    async fn save_day(&self, date: NaiveDate, record: &DayRecord) -> Result<(), SourceError>;
}
