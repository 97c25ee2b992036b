//! The error taxonomy of this crate
//!
//! Failures of a [`PlannerSource`](crate::traits::PlannerSource) fall into exactly three buckets,
//! because they call for three different reactions:
//! * [`SourceError::Auth`]: the server refused the credentials themselves. Terminal for that attempt,
//!   the caller should let the user correct the form and re-submit.
//! * [`SourceError::Unauthorized`]: the session cookie is missing or has expired.
//!   The [`SessionGate`](crate::session::SessionGate) must take over and force the login view.
//! * [`SourceError::Transport`]: anything else (network failure, 5xx, malformed reply).
//!   Non-fatal: the previously displayed data stays on screen.

use thiserror::Error;

/// An error reported by a [`PlannerSource`](crate::traits::PlannerSource)
#[derive(Debug, Error)]
pub enum SourceError {
    /// The server rejected the credentials (bad login, duplicate signup, missing fields).
    /// The embedded message is the server-provided, user-displayable reason.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The session cookie is absent or no longer valid (an HTTP 401)
    #[error("session is missing or has expired")]
    Unauthorized,

    /// A network or server failure that is neither an auth rejection nor a 401
    #[error("transport or server error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// An error reported by the [`Planner`](crate::Planner) or the [`SessionGate`](crate::session::SessionGate)
#[derive(Debug, Error)]
pub enum PlannerError {
    /// An operation that requires an open day was called before any successful
    /// [`open_day`](crate::Planner::open_day)
    #[error("no day is currently open")]
    NoActiveDay,

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl PlannerError {
    /// Whether this error means the session is gone and the user has been sent back to the login view
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, PlannerError::Source(SourceError::Unauthorized))
    }
}
