//! The session gate: nothing day-related happens before authentication
//!
//! The gate holds the only session knowledge this crate keeps: "currently believed
//! authenticated: yes/no", expressed as the [`View`] a front end should display.
//! The actual session credential lives in the [`PlannerSource`] (a cookie store, for
//! the real client).

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::PlannerError;
use crate::traits::{Credentials, PlannerSource, UserId};

/// Which screen the front end should display
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    /// The authentication screen
    Login,
    /// The day-planner screen
    Planner,
}

/// Gates all day-record operations behind authentication, and recovers when a call
/// is rejected for lack of a session
pub struct SessionGate<S> {
    source: Arc<S>,
    view: Arc<watch::Sender<View>>,
}

impl<S: PlannerSource> SessionGate<S> {
    pub fn new(source: Arc<S>) -> Self {
        let (view, _) = watch::channel(View::Login);
        Self {
            source,
            view: Arc::new(view),
        }
    }

    /// Create an account and open a session for it.
    ///
    /// On failure (duplicate account, missing fields...) the error is reported and nothing
    /// else happens: the view does not change, already-displayed data is not cleared, and
    /// the attempt is terminal (the user corrects the form and re-submits).
    pub async fn sign_up(&self, credentials: &Credentials) -> Result<UserId, PlannerError> {
        let user_id = self.source.sign_up(credentials).await?;
        self.view.send_replace(View::Planner);
        Ok(user_id)
    }

    /// Open a session for an existing account. Same failure semantics as [`Self::sign_up`]
    pub async fn log_in(&self, credentials: &Credentials) -> Result<(), PlannerError> {
        self.source.log_in(credentials).await?;
        self.view.send_replace(View::Planner);
        Ok(())
    }

    /// Invalidate the session and return to the login view.
    ///
    /// The server-side logout is best-effort: not being able to reach the server must not
    /// keep the user logged in on this end.
    pub async fn log_out(&self) {
        if let Err(err) = self.source.log_out().await {
            log::warn!("Unable to log out from the server: {}. Dropping the session locally anyway.", err);
        }
        self.view.send_replace(View::Login);
    }

    /// Called whenever any day operation reports a 401 (e.g. the session expired mid-edit).
    ///
    /// Idempotent: a burst of rejected calls all land on the same login view.
    pub fn on_unauthorized(&self) {
        if *self.view.borrow() == View::Planner {
            log::info!("Session expired, returning to the login view");
        }
        self.view.send_replace(View::Login);
    }

    pub fn view(&self) -> View {
        *self.view.borrow()
    }

    pub fn is_authenticated(&self) -> bool {
        self.view() == View::Planner
    }

    /// Subscribe to view transitions, including forced ones (session expiry)
    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.subscribe()
    }
}
